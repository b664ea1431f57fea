//! Measurement model and DTOs.
//!
//! Measurements are immutable once recorded; there is no update DTO.

use pulsewatch_core::measurement::MeasurementSnapshot;
use pulsewatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `measurements` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Measurement {
    pub id: DbId,
    pub patient_id: DbId,
    pub device_id: DbId,
    pub heart_rate: Option<f64>,
    pub systolic_bp: Option<f64>,
    pub diastolic_bp: Option<f64>,
    pub blood_oxygen: Option<f64>,
    pub temperature: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub blood_glucose: Option<f64>,
    pub fall_detected: Option<bool>,
    pub weight_kg: Option<f64>,
    pub steps: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub data_source: Option<String>,
    pub notes: Option<String>,
    pub measurement_time: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Measurement {
    /// The readings the rule evaluator looks at.
    pub fn to_snapshot(&self) -> MeasurementSnapshot {
        MeasurementSnapshot {
            measurement_id: self.id,
            patient_id: self.patient_id,
            device_id: self.device_id,
            measurement_time: self.measurement_time,
            heart_rate: self.heart_rate,
            systolic_bp: self.systolic_bp,
            diastolic_bp: self.diastolic_bp,
            blood_oxygen: self.blood_oxygen,
            temperature: self.temperature,
            blood_glucose: self.blood_glucose,
            respiratory_rate: self.respiratory_rate,
            fall_detected: self.fall_detected,
        }
    }
}

/// How a measurement names its device: internal id or vendor identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceRef {
    Id(DbId),
    Identifier(String),
}

/// DTO for recording a measurement.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMeasurement {
    pub patient_id: DbId,
    pub device_id: DeviceRef,
    #[validate(range(min = 0.0, max = 300.0))]
    pub heart_rate: Option<f64>,
    #[validate(range(min = 0.0, max = 300.0))]
    pub systolic_bp: Option<f64>,
    #[validate(range(min = 0.0, max = 200.0))]
    pub diastolic_bp: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub blood_oxygen: Option<f64>,
    #[validate(range(min = 20.0, max = 50.0))]
    pub temperature: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub respiratory_rate: Option<f64>,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub blood_glucose: Option<f64>,
    pub fall_detected: Option<bool>,
    #[validate(range(min = 0.0, max = 500.0))]
    pub weight_kg: Option<f64>,
    #[validate(range(min = 0))]
    pub steps: Option<i32>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(length(max = 50))]
    pub data_source: Option<String>,
    pub notes: Option<String>,
    /// Defaults to the time of receipt.
    pub measurement_time: Option<Timestamp>,
}

/// DTO for recording several measurements in one request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMeasurementBatch {
    #[validate(length(min = 1, max = 1000), nested)]
    pub measurements: Vec<CreateMeasurement>,
}

/// Filters for `GET /measurements` and `GET /patients/{id}/measurements`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasurementFilter {
    pub patient_id: Option<DbId>,
    pub device_id: Option<DbId>,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Summary of one numeric field over a window. The aggregates are `None`
/// when no reading in the window carries the field.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ParameterStats {
    pub parameter: String,
    pub count: i64,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Most recent value inside the window.
    pub latest: Option<f64>,
}

/// Response body of `GET /patients/{id}/measurements/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct PatientMeasurementStats {
    pub patient_id: DbId,
    pub days: i64,
    pub since: Timestamp,
    pub parameters: Vec<ParameterStats>,
}
