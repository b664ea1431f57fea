//! Typed rule conditions.
//!
//! Rules are stored with a JSON `condition` column. [`Condition::parse`] is
//! the only place a stored condition is interpreted: once parsed and
//! validated, every variant carries exactly the fields its operator needs.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::CoreError;
use crate::measurement::{ParameterKind, Reading, VitalParameter};

/// Value compared by the `equals` operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpectedValue {
    Flag(bool),
    Number(f64),
}

/// A threshold condition over one measurement parameter.
///
/// JSON form, e.g.:
///
/// ```json
/// {"operator": "greater_than", "parameter": "heart_rate", "threshold": 100}
/// {"operator": "range", "parameter": "temperature", "low": 35.5, "high": 38.0}
/// {"operator": "equals", "parameter": "fall_detected", "value": true}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "snake_case")]
pub enum Condition {
    /// Matches when the reading is strictly above `threshold`.
    GreaterThan {
        parameter: VitalParameter,
        threshold: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_minutes: Option<u32>,
    },
    /// Matches when the reading is strictly below `threshold`.
    LessThan {
        parameter: VitalParameter,
        threshold: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_minutes: Option<u32>,
    },
    /// Matches when the reading equals `value` exactly.
    Equals {
        parameter: VitalParameter,
        #[serde(alias = "threshold")]
        value: ExpectedValue,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_minutes: Option<u32>,
    },
    /// Matches when the reading falls outside `[low, high]`. Both bounds
    /// count as inside.
    Range {
        parameter: VitalParameter,
        #[serde(alias = "min")]
        low: f64,
        #[serde(alias = "max")]
        high: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_minutes: Option<u32>,
    },
}

impl Condition {
    /// Parse and validate a stored JSON condition.
    pub fn parse(raw: &Value, max_duration_minutes: u32) -> Result<Self, CoreError> {
        let condition: Condition = serde_json::from_value(raw.clone())
            .map_err(|e| CoreError::Validation(format!("Malformed rule condition: {e}")))?;
        condition.validate(max_duration_minutes)?;
        Ok(condition)
    }

    /// Check the semantic constraints serde cannot express.
    pub fn validate(&self, max_duration_minutes: u32) -> Result<(), CoreError> {
        let parameter = self.parameter();

        match self {
            Condition::GreaterThan { threshold, .. } | Condition::LessThan { threshold, .. } => {
                require_numeric(parameter, self.operator())?;
                require_finite(*threshold, "threshold")?;
            }
            Condition::Range { low, high, .. } => {
                require_numeric(parameter, self.operator())?;
                require_finite(*low, "low")?;
                require_finite(*high, "high")?;
                if low >= high {
                    return Err(CoreError::Validation(format!(
                        "range low ({low}) must be less than high ({high})"
                    )));
                }
            }
            Condition::Equals { value, .. } => match (parameter.kind(), value) {
                (ParameterKind::Flag, ExpectedValue::Flag(_)) => {}
                (ParameterKind::Numeric, ExpectedValue::Number(n)) => require_finite(*n, "value")?,
                (ParameterKind::Flag, ExpectedValue::Number(_)) => {
                    return Err(CoreError::Validation(format!(
                        "{parameter} is a flag; equals requires a boolean value"
                    )));
                }
                (ParameterKind::Numeric, ExpectedValue::Flag(_)) => {
                    return Err(CoreError::Validation(format!(
                        "{parameter} is numeric; equals requires a numeric value"
                    )));
                }
            },
        }

        if let Some(minutes) = self.duration_minutes() {
            if minutes > max_duration_minutes {
                return Err(CoreError::Validation(format!(
                    "duration_minutes must be at most {max_duration_minutes}, got {minutes}"
                )));
            }
        }
        Ok(())
    }

    pub fn parameter(&self) -> VitalParameter {
        match self {
            Condition::GreaterThan { parameter, .. }
            | Condition::LessThan { parameter, .. }
            | Condition::Equals { parameter, .. }
            | Condition::Range { parameter, .. } => *parameter,
        }
    }

    pub fn operator(&self) -> &'static str {
        match self {
            Condition::GreaterThan { .. } => "greater_than",
            Condition::LessThan { .. } => "less_than",
            Condition::Equals { .. } => "equals",
            Condition::Range { .. } => "range",
        }
    }

    /// Sustained-violation window. `None` (or zero) means the condition is
    /// evaluated on the instantaneous reading only.
    pub fn duration_minutes(&self) -> Option<u32> {
        let minutes = match self {
            Condition::GreaterThan {
                duration_minutes, ..
            }
            | Condition::LessThan {
                duration_minutes, ..
            }
            | Condition::Equals {
                duration_minutes, ..
            }
            | Condition::Range {
                duration_minutes, ..
            } => *duration_minutes,
        };
        minutes.filter(|m| *m > 0)
    }

    /// Whether `reading` satisfies the condition.
    ///
    /// A reading of the wrong kind never matches.
    pub fn matches(&self, reading: Reading) -> bool {
        match (self, reading) {
            (Condition::GreaterThan { threshold, .. }, Reading::Number(v)) => v > *threshold,
            (Condition::LessThan { threshold, .. }, Reading::Number(v)) => v < *threshold,
            (Condition::Range { low, high, .. }, Reading::Number(v)) => v < *low || v > *high,
            (
                Condition::Equals {
                    value: ExpectedValue::Number(expected),
                    ..
                },
                Reading::Number(v),
            ) => v == *expected,
            (
                Condition::Equals {
                    value: ExpectedValue::Flag(expected),
                    ..
                },
                Reading::Flag(v),
            ) => v == *expected,
            _ => false,
        }
    }

    /// The threshold as recorded in an alert payload.
    pub fn threshold_json(&self) -> Value {
        match self {
            Condition::GreaterThan { threshold, .. } | Condition::LessThan { threshold, .. } => {
                json!(threshold)
            }
            Condition::Equals { value, .. } => match value {
                ExpectedValue::Flag(b) => json!(b),
                ExpectedValue::Number(n) => json!(n),
            },
            Condition::Range { low, high, .. } => json!({ "low": low, "high": high }),
        }
    }

    /// Human-readable comparison, e.g. `above 100` or `outside 60 to 100`.
    pub fn describe(&self) -> String {
        match self {
            Condition::GreaterThan { threshold, .. } => format!("above {threshold}"),
            Condition::LessThan { threshold, .. } => format!("below {threshold}"),
            Condition::Equals { value, .. } => match value {
                ExpectedValue::Flag(b) => format!("equal to {b}"),
                ExpectedValue::Number(n) => format!("equal to {n}"),
            },
            Condition::Range { low, high, .. } => format!("outside {low} to {high}"),
        }
    }
}

fn require_numeric(parameter: VitalParameter, operator: &str) -> Result<(), CoreError> {
    if parameter.kind() == ParameterKind::Numeric {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "operator {operator} is not applicable to flag parameter {parameter}"
        )))
    }
}

fn require_finite(value: f64, field: &str) -> Result<(), CoreError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{field} must be a finite number, got {value}"
        )))
    }
}
