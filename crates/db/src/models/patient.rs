//! Patient entity model and DTOs.

use chrono::NaiveDate;
use pulsewatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::LabelCount;

/// A row from the `patients` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Patient {
    pub id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    pub primary_physician_id: Option<DbId>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering a patient.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePatient {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// One of `male`, `female`, `other`.
    pub gender: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub emergency_contact_name: Option<String>,
    #[validate(length(max = 20))]
    pub emergency_contact_phone: Option<String>,
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    pub primary_physician_id: Option<DbId>,
}

/// DTO for updating a patient. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePatient {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub emergency_contact_name: Option<String>,
    #[validate(length(max = 20))]
    pub emergency_contact_phone: Option<String>,
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    pub primary_physician_id: Option<DbId>,
    pub is_active: Option<bool>,
}

/// Registry-wide patient counts.
#[derive(Debug, Clone, Serialize)]
pub struct PatientStats {
    pub total: i64,
    pub active: i64,
    pub by_gender: Vec<LabelCount>,
}
