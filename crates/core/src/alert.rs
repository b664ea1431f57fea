//! Alert vocabulary: types, severities, statuses, lifecycle actions and the
//! unsaved [`AlertDraft`] produced by the rule evaluator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Implements `as_str`, `Display` and `FromStr` for a unit-only enum whose
/// serde representation is the same snake_case string.
macro_rules! string_enum {
    ($ty:ident, $label:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $s),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($ty::$variant),)+
                    other => Err(CoreError::Validation(format!(
                        "Invalid {} '{}'. Must be one of: {:?}",
                        $label,
                        other,
                        [$($s),+]
                    ))),
                }
            }
        }
    };
}

/// What kind of clinical event an alert describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    HeartRateHigh,
    HeartRateLow,
    BloodPressureHigh,
    BloodOxygenLow,
    TemperatureHigh,
    GlucoseHigh,
    GlucoseLow,
    FallDetected,
    DeviceOffline,
    MedicationReminder,
    AppointmentReminder,
}

string_enum!(AlertType, "alert type", {
    HeartRateHigh => "heart_rate_high",
    HeartRateLow => "heart_rate_low",
    BloodPressureHigh => "blood_pressure_high",
    BloodOxygenLow => "blood_oxygen_low",
    TemperatureHigh => "temperature_high",
    GlucoseHigh => "glucose_high",
    GlucoseLow => "glucose_low",
    FallDetected => "fall_detected",
    DeviceOffline => "device_offline",
    MedicationReminder => "medication_reminder",
    AppointmentReminder => "appointment_reminder",
});

/// Alert severity. Ordered so that `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

string_enum!(AlertSeverity, "alert severity", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

/// Lifecycle status of a persisted alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Dismissed,
}

string_enum!(AlertStatus, "alert status", {
    Active => "active",
    Acknowledged => "acknowledged",
    Resolved => "resolved",
    Dismissed => "dismissed",
});

impl AlertStatus {
    /// Resolved and dismissed alerts accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Dismissed)
    }

    /// Statuses that still need clinician attention.
    pub const OPEN: &'static [AlertStatus] = &[AlertStatus::Active, AlertStatus::Acknowledged];
}

/// A lifecycle operation requested on an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertAction {
    Acknowledge,
    Resolve,
    Dismiss,
}

string_enum!(AlertAction, "alert action", {
    Acknowledge => "acknowledge",
    Resolve => "resolve",
    Dismiss => "dismiss",
});

/// An unsaved alert produced by the rule evaluator or the device-offline
/// check, awaiting persistence.
///
/// Drafts always start life as `active` alerts once stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertDraft {
    pub patient_id: DbId,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: Option<String>,
    /// Structured payload: observed value, threshold, rule and measurement references.
    pub alert_data: serde_json::Value,
    /// The rule that produced this draft. `None` for built-in fallback rules.
    pub rule_id: Option<DbId>,
    /// `None` for alerts not caused by a reading, such as a device going offline.
    pub triggered_by_measurement_id: Option<DbId>,
    /// When the triggering condition was observed.
    pub observed_at: Timestamp,
}

/// Reject a manual alert title that is only whitespace. Length is checked
/// by the request's `validator` derive.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("title must not be blank".to_string()));
    }
    Ok(())
}
