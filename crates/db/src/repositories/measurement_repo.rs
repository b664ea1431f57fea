//! Repository for the `measurements` table (append-only).

use pulsewatch_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use pulsewatch_core::types::{DbId, Timestamp};
use sqlx::{PgExecutor, PgPool};

use crate::models::measurement::{CreateMeasurement, Measurement, MeasurementFilter, ParameterStats};

const COLUMNS: &str = "id, patient_id, device_id, heart_rate, systolic_bp, diastolic_bp, \
    blood_oxygen, temperature, respiratory_rate, blood_glucose, fall_detected, weight_kg, steps, \
    latitude, longitude, data_source, notes, measurement_time, created_at, updated_at";

/// Provides insert and read access to measurements.
pub struct MeasurementRepo;

impl MeasurementRepo {
    /// Insert one measurement for an already-resolved device.
    ///
    /// `measurement_time` defaults to `NOW()` when the input omits it.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        device_id: DbId,
        input: &CreateMeasurement,
    ) -> Result<Measurement, sqlx::Error> {
        let query = format!(
            "INSERT INTO measurements (patient_id, device_id, heart_rate, systolic_bp, \
                diastolic_bp, blood_oxygen, temperature, respiratory_rate, blood_glucose, \
                fall_detected, weight_kg, steps, latitude, longitude, data_source, notes, \
                measurement_time)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                     COALESCE($17, NOW()))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Measurement>(&query)
            .bind(input.patient_id)
            .bind(device_id)
            .bind(input.heart_rate)
            .bind(input.systolic_bp)
            .bind(input.diastolic_bp)
            .bind(input.blood_oxygen)
            .bind(input.temperature)
            .bind(input.respiratory_rate)
            .bind(input.blood_glucose)
            .bind(input.fall_detected)
            .bind(input.weight_kg)
            .bind(input.steps)
            .bind(input.latitude)
            .bind(input.longitude)
            .bind(&input.data_source)
            .bind(&input.notes)
            .bind(input.measurement_time)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<Measurement>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM measurements WHERE id = $1");
        sqlx::query_as::<_, Measurement>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List measurements newest first, applying every filter that is set.
    pub async fn list(
        pool: &PgPool,
        filter: &MeasurementFilter,
    ) -> Result<Vec<Measurement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM measurements
             WHERE ($1::BIGINT IS NULL OR patient_id = $1)
               AND ($2::BIGINT IS NULL OR device_id = $2)
               AND ($3::TIMESTAMPTZ IS NULL OR measurement_time >= $3)
               AND ($4::TIMESTAMPTZ IS NULL OR measurement_time <= $4)
             ORDER BY measurement_time DESC, id DESC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, Measurement>(&query)
            .bind(filter.patient_id)
            .bind(filter.device_id)
            .bind(filter.start)
            .bind(filter.end)
            .bind(clamp_limit(filter.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT))
            .bind(clamp_offset(filter.offset))
            .fetch_all(pool)
            .await
    }

    /// A patient's measurements captured in `[since, until)`, oldest first.
    ///
    /// Feeds sustained-rule evaluation. Runs inside the ingest transaction,
    /// so it sees the measurement being recorded.
    pub async fn history<'e>(
        executor: impl PgExecutor<'e>,
        patient_id: DbId,
        since: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<Measurement>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM measurements
             WHERE patient_id = $1 AND measurement_time >= $2 AND measurement_time < $3
             ORDER BY measurement_time, id"
        );
        sqlx::query_as::<_, Measurement>(&query)
            .bind(patient_id)
            .bind(since)
            .bind(until)
            .fetch_all(executor)
            .await
    }

    /// Count, average, min, max and latest value of one numeric field for a
    /// patient since `since`.
    ///
    /// `parameter` is interpolated as a column name and must come from
    /// `registry::validate_stats_parameter`.
    pub async fn parameter_stats(
        pool: &PgPool,
        patient_id: DbId,
        parameter: &'static str,
        since: Timestamp,
    ) -> Result<ParameterStats, sqlx::Error> {
        let query = format!(
            "SELECT $3::TEXT AS parameter,
                    COUNT({parameter}) AS count,
                    AVG({parameter})::DOUBLE PRECISION AS average,
                    MIN({parameter})::DOUBLE PRECISION AS min,
                    MAX({parameter})::DOUBLE PRECISION AS max,
                    (SELECT {parameter}::DOUBLE PRECISION FROM measurements
                      WHERE patient_id = $1 AND measurement_time >= $2 AND {parameter} IS NOT NULL
                      ORDER BY measurement_time DESC, id DESC
                      LIMIT 1) AS latest
             FROM measurements
             WHERE patient_id = $1 AND measurement_time >= $2"
        );
        sqlx::query_as::<_, ParameterStats>(&query)
            .bind(patient_id)
            .bind(since)
            .bind(parameter)
            .fetch_one(pool)
            .await
    }
}
