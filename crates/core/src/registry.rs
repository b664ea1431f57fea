//! Patient and device vocabularies with their validators.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Patients
// ---------------------------------------------------------------------------

pub const VALID_GENDERS: &[&str] = &["male", "female", "other"];

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

pub const VALID_DEVICE_TYPES: &[&str] = &[
    "smartwatch",
    "blood_pressure_monitor",
    "glucose_meter",
    "pulse_oximeter",
    "ecg_monitor",
    "temperature_sensor",
    "activity_tracker",
];

pub const DEVICE_STATUS_ACTIVE: &str = "active";
pub const DEVICE_STATUS_INACTIVE: &str = "inactive";
pub const DEVICE_STATUS_MAINTENANCE: &str = "maintenance";
/// Set when a device is deleted; retired devices keep their measurements.
pub const DEVICE_STATUS_RETIRED: &str = "retired";

pub const VALID_DEVICE_STATUSES: &[&str] = &[
    DEVICE_STATUS_ACTIVE,
    DEVICE_STATUS_INACTIVE,
    DEVICE_STATUS_MAINTENANCE,
    DEVICE_STATUS_RETIRED,
];

// ---------------------------------------------------------------------------
// Measurement statistics
// ---------------------------------------------------------------------------

/// Numeric measurement fields that can be summarised, in report order.
pub const STATS_PARAMETERS: &[&str] = &[
    "heart_rate",
    "systolic_bp",
    "diastolic_bp",
    "blood_oxygen",
    "temperature",
    "respiratory_rate",
    "blood_glucose",
    "weight_kg",
    "steps",
];

fn one_of(value: &str, valid: &[&str], label: &str) -> Result<(), CoreError> {
    if valid.contains(&value) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown {label} '{value}'. Valid: {valid:?}"
        )))
    }
}

pub fn validate_gender(gender: &str) -> Result<(), CoreError> {
    one_of(gender, VALID_GENDERS, "gender")
}

pub fn validate_device_type(device_type: &str) -> Result<(), CoreError> {
    one_of(device_type, VALID_DEVICE_TYPES, "device type")
}

pub fn validate_device_status(status: &str) -> Result<(), CoreError> {
    one_of(status, VALID_DEVICE_STATUSES, "device status")
}

/// Resolve a requested statistics field to its canonical name.
pub fn validate_stats_parameter(parameter: &str) -> Result<&'static str, CoreError> {
    STATS_PARAMETERS
        .iter()
        .find(|p| **p == parameter)
        .copied()
        .ok_or_else(|| {
            CoreError::Validation(format!(
                "Unknown statistics parameter '{parameter}'. Valid: {STATS_PARAMETERS:?}"
            ))
        })
}

/// Measurements may only be recorded from devices that are still in service.
pub fn device_accepts_measurements(status: &str) -> bool {
    status != DEVICE_STATUS_RETIRED
}
