//! Evaluator configuration and the built-in default rule set.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::alert::{AlertSeverity, AlertType};

use super::rule::AlertRule;

/// Upper bound on a rule's sustained-violation window (one day).
pub const DEFAULT_MAX_DURATION_MINUTES: u32 = 1440;

/// Clinical thresholds behind the default rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalThresholds {
    pub heart_rate_low: f64,
    pub heart_rate_high: f64,
    pub systolic_high: f64,
    pub diastolic_high: f64,
    pub blood_oxygen_low: f64,
    pub temperature_high: f64,
    pub glucose_low: f64,
    pub glucose_high: f64,
}

impl Default for VitalThresholds {
    fn default() -> Self {
        Self {
            heart_rate_low: 40.0,
            heart_rate_high: 120.0,
            systolic_high: 140.0,
            diastolic_high: 90.0,
            blood_oxygen_low: 92.0,
            temperature_high: 38.0,
            glucose_low: 70.0,
            glucose_high: 180.0,
        }
    }
}

impl VitalThresholds {
    /// The default rule set derived from these thresholds.
    ///
    /// Used when the rule store is empty (if fallback is enabled) and
    /// to seed the `alert_rules` table on first start.
    pub fn default_rules(&self) -> Vec<AlertRule> {
        let rule = |name: &str,
                    alert_type: AlertType,
                    severity: AlertSeverity,
                    condition: serde_json::Value| AlertRule {
            id: None,
            name: name.to_string(),
            alert_type,
            severity,
            condition,
            is_active: true,
        };

        vec![
            rule(
                "High heart rate",
                AlertType::HeartRateHigh,
                AlertSeverity::High,
                json!({"operator": "greater_than", "parameter": "heart_rate", "threshold": self.heart_rate_high}),
            ),
            rule(
                "Low heart rate",
                AlertType::HeartRateLow,
                AlertSeverity::High,
                json!({"operator": "less_than", "parameter": "heart_rate", "threshold": self.heart_rate_low}),
            ),
            rule(
                "High systolic blood pressure",
                AlertType::BloodPressureHigh,
                AlertSeverity::Medium,
                json!({"operator": "greater_than", "parameter": "blood_pressure_systolic", "threshold": self.systolic_high}),
            ),
            rule(
                "High diastolic blood pressure",
                AlertType::BloodPressureHigh,
                AlertSeverity::Medium,
                json!({"operator": "greater_than", "parameter": "blood_pressure_diastolic", "threshold": self.diastolic_high}),
            ),
            rule(
                "Low blood oxygen",
                AlertType::BloodOxygenLow,
                AlertSeverity::Critical,
                json!({"operator": "less_than", "parameter": "blood_oxygen", "threshold": self.blood_oxygen_low}),
            ),
            rule(
                "High temperature",
                AlertType::TemperatureHigh,
                AlertSeverity::Medium,
                json!({"operator": "greater_than", "parameter": "temperature", "threshold": self.temperature_high}),
            ),
            rule(
                "High glucose",
                AlertType::GlucoseHigh,
                AlertSeverity::Medium,
                json!({"operator": "greater_than", "parameter": "glucose", "threshold": self.glucose_high}),
            ),
            rule(
                "Low glucose",
                AlertType::GlucoseLow,
                AlertSeverity::High,
                json!({"operator": "less_than", "parameter": "glucose", "threshold": self.glucose_low}),
            ),
            rule(
                "Fall detected",
                AlertType::FallDetected,
                AlertSeverity::Critical,
                json!({"operator": "equals", "parameter": "fall_detected", "value": true}),
            ),
        ]
    }
}

/// Runtime configuration for [`super::RuleEvaluator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    pub thresholds: VitalThresholds,
    /// Evaluate the default rules when the supplied rule set is empty. An
    /// all-inactive rule set never falls back.
    pub fallback_to_defaults: bool,
    /// Longest accepted `duration_minutes` on a rule condition.
    pub max_duration_minutes: u32,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            thresholds: VitalThresholds::default(),
            fallback_to_defaults: true,
            max_duration_minutes: DEFAULT_MAX_DURATION_MINUTES,
        }
    }
}
