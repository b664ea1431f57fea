//! Repository for the `patients` table.

use pulsewatch_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use pulsewatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::patient::{CreatePatient, Patient, PatientStats, UpdatePatient};
use crate::models::LabelCount;

const COLUMNS: &str = "id, first_name, last_name, date_of_birth, gender, email, phone, address, \
    emergency_contact_name, emergency_contact_phone, medical_history, current_medications, \
    allergies, primary_physician_id, is_active, created_at, updated_at";

/// Provides CRUD operations for patients.
pub struct PatientRepo;

impl PatientRepo {
    /// Insert a new patient, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreatePatient) -> Result<Patient, sqlx::Error> {
        let query = format!(
            "INSERT INTO patients (first_name, last_name, date_of_birth, gender, email, phone, \
                address, emergency_contact_name, emergency_contact_phone, medical_history, \
                current_medications, allergies, primary_physician_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Patient>(&query)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.date_of_birth)
            .bind(&input.gender)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(&input.emergency_contact_name)
            .bind(&input.emergency_contact_phone)
            .bind(&input.medical_history)
            .bind(&input.current_medications)
            .bind(&input.allergies)
            .bind(input.primary_physician_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Patient>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM patients WHERE id = $1");
        sqlx::query_as::<_, Patient>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List patients by last name, optionally filtered by `is_active`.
    pub async fn list(
        pool: &PgPool,
        is_active: Option<bool>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Patient>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM patients
             WHERE ($1::BOOLEAN IS NULL OR is_active = $1)
             ORDER BY last_name, first_name, id
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Patient>(&query)
            .bind(is_active)
            .bind(clamp_limit(limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT))
            .bind(clamp_offset(offset))
            .fetch_all(pool)
            .await
    }

    /// Update a patient. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePatient,
    ) -> Result<Option<Patient>, sqlx::Error> {
        let query = format!(
            "UPDATE patients SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                date_of_birth = COALESCE($4, date_of_birth),
                gender = COALESCE($5, gender),
                email = COALESCE($6, email),
                phone = COALESCE($7, phone),
                address = COALESCE($8, address),
                emergency_contact_name = COALESCE($9, emergency_contact_name),
                emergency_contact_phone = COALESCE($10, emergency_contact_phone),
                medical_history = COALESCE($11, medical_history),
                current_medications = COALESCE($12, current_medications),
                allergies = COALESCE($13, allergies),
                primary_physician_id = COALESCE($14, primary_physician_id),
                is_active = COALESCE($15, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Patient>(&query)
            .bind(id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.date_of_birth)
            .bind(&input.gender)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.address)
            .bind(&input.emergency_contact_name)
            .bind(&input.emergency_contact_phone)
            .bind(&input.medical_history)
            .bind(&input.current_medications)
            .bind(&input.allergies)
            .bind(input.primary_physician_id)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Mark a patient inactive. Patients are never hard-deleted so their
    /// alert history stays intact.
    ///
    /// Returns `true` if the row existed.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE patients SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Patient totals with a per-gender breakdown.
    pub async fn stats(pool: &PgPool) -> Result<PatientStats, sqlx::Error> {
        let (total, active): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM patients",
        )
        .fetch_one(pool)
        .await?;
        let by_gender: Vec<LabelCount> = sqlx::query_as(
            "SELECT gender AS label, COUNT(*) AS count FROM patients
             GROUP BY gender
             ORDER BY count DESC, label",
        )
        .fetch_all(pool)
        .await?;

        Ok(PatientStats {
            total,
            active,
            by_gender,
        })
    }
}
