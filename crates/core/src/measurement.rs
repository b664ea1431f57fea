//! Measurement snapshot consumed by the rule evaluator.
//!
//! The database row carries many more columns (activity, location, notes);
//! only the readings a rule can reference are copied into the snapshot.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Whether a parameter is a numeric reading or a boolean flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Numeric,
    Flag,
}

/// A measurement field that an alert rule may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalParameter {
    HeartRate,
    #[serde(alias = "systolic_bp")]
    BloodPressureSystolic,
    #[serde(alias = "diastolic_bp")]
    BloodPressureDiastolic,
    BloodOxygen,
    Temperature,
    #[serde(alias = "blood_glucose")]
    Glucose,
    RespiratoryRate,
    FallDetected,
}

impl VitalParameter {
    pub const ALL: &'static [VitalParameter] = &[
        VitalParameter::HeartRate,
        VitalParameter::BloodPressureSystolic,
        VitalParameter::BloodPressureDiastolic,
        VitalParameter::BloodOxygen,
        VitalParameter::Temperature,
        VitalParameter::Glucose,
        VitalParameter::RespiratoryRate,
        VitalParameter::FallDetected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VitalParameter::HeartRate => "heart_rate",
            VitalParameter::BloodPressureSystolic => "blood_pressure_systolic",
            VitalParameter::BloodPressureDiastolic => "blood_pressure_diastolic",
            VitalParameter::BloodOxygen => "blood_oxygen",
            VitalParameter::Temperature => "temperature",
            VitalParameter::Glucose => "glucose",
            VitalParameter::RespiratoryRate => "respiratory_rate",
            VitalParameter::FallDetected => "fall_detected",
        }
    }

    pub fn kind(&self) -> ParameterKind {
        match self {
            VitalParameter::FallDetected => ParameterKind::Flag,
            _ => ParameterKind::Numeric,
        }
    }

    /// Display unit used in generated alert titles.
    pub fn unit(&self) -> &'static str {
        match self {
            VitalParameter::HeartRate => "BPM",
            VitalParameter::BloodPressureSystolic | VitalParameter::BloodPressureDiastolic => {
                "mmHg"
            }
            VitalParameter::BloodOxygen => "%",
            VitalParameter::Temperature => "°C",
            VitalParameter::Glucose => "mg/dL",
            VitalParameter::RespiratoryRate => "breaths/min",
            VitalParameter::FallDetected => "",
        }
    }
}

impl fmt::Display for VitalParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VitalParameter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heart_rate" => Ok(VitalParameter::HeartRate),
            "blood_pressure_systolic" | "systolic_bp" => Ok(VitalParameter::BloodPressureSystolic),
            "blood_pressure_diastolic" | "diastolic_bp" => {
                Ok(VitalParameter::BloodPressureDiastolic)
            }
            "blood_oxygen" => Ok(VitalParameter::BloodOxygen),
            "temperature" => Ok(VitalParameter::Temperature),
            "glucose" | "blood_glucose" => Ok(VitalParameter::Glucose),
            "respiratory_rate" => Ok(VitalParameter::RespiratoryRate),
            "fall_detected" => Ok(VitalParameter::FallDetected),
            other => Err(CoreError::Validation(format!(
                "Unknown measurement parameter '{other}'"
            ))),
        }
    }
}

/// A single observed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    Number(f64),
    Flag(bool),
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Number(n) => write!(f, "{n}"),
            Reading::Flag(b) => write!(f, "{b}"),
        }
    }
}

/// The readings of one measurement, as seen by the evaluator.
///
/// `None` means the device did not capture that reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSnapshot {
    pub measurement_id: DbId,
    pub patient_id: DbId,
    pub device_id: DbId,
    pub measurement_time: Timestamp,
    pub heart_rate: Option<f64>,
    pub systolic_bp: Option<f64>,
    pub diastolic_bp: Option<f64>,
    pub blood_oxygen: Option<f64>,
    pub temperature: Option<f64>,
    pub blood_glucose: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub fall_detected: Option<bool>,
}

impl MeasurementSnapshot {
    /// Look up the reading for `parameter`, if it was captured.
    pub fn reading(&self, parameter: VitalParameter) -> Option<Reading> {
        let number = |v: Option<f64>| v.map(Reading::Number);
        match parameter {
            VitalParameter::HeartRate => number(self.heart_rate),
            VitalParameter::BloodPressureSystolic => number(self.systolic_bp),
            VitalParameter::BloodPressureDiastolic => number(self.diastolic_bp),
            VitalParameter::BloodOxygen => number(self.blood_oxygen),
            VitalParameter::Temperature => number(self.temperature),
            VitalParameter::Glucose => number(self.blood_glucose),
            VitalParameter::RespiratoryRate => number(self.respiratory_rate),
            VitalParameter::FallDetected => self.fall_detected.map(Reading::Flag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_parse_to_canonical_parameter() {
        assert_eq!(
            "systolic_bp".parse::<VitalParameter>().unwrap(),
            VitalParameter::BloodPressureSystolic
        );
        assert_eq!(
            "blood_glucose".parse::<VitalParameter>().unwrap(),
            VitalParameter::Glucose
        );
        let from_json: VitalParameter = serde_json::from_str("\"diastolic_bp\"").unwrap();
        assert_eq!(from_json, VitalParameter::BloodPressureDiastolic);
    }

    #[test]
    fn canonical_names_round_trip() {
        for p in VitalParameter::ALL {
            assert_eq!(p.as_str().parse::<VitalParameter>().unwrap(), *p);
        }
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        assert!("shoe_size".parse::<VitalParameter>().is_err());
    }

    #[test]
    fn reading_lookup_respects_missing_fields() {
        let snap = MeasurementSnapshot {
            heart_rate: Some(72.0),
            fall_detected: Some(false),
            ..Default::default()
        };
        assert_eq!(
            snap.reading(VitalParameter::HeartRate),
            Some(Reading::Number(72.0))
        );
        assert_eq!(
            snap.reading(VitalParameter::FallDetected),
            Some(Reading::Flag(false))
        );
        assert_eq!(snap.reading(VitalParameter::BloodOxygen), None);
    }
}
