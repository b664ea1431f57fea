//! Alert rule model and DTOs.

use pulsewatch_core::alert::{AlertSeverity, AlertType};
use pulsewatch_core::alerting;
use pulsewatch_core::error::CoreError;
use pulsewatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

/// A row from the `alert_rules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AlertRule {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub alert_type: String,
    pub severity: String,
    pub condition: Json<serde_json::Value>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AlertRule {
    /// Convert into the evaluator's rule type.
    ///
    /// The condition is left unparsed; the evaluator reports malformed
    /// conditions itself. An unknown stored type or severity is corrupt
    /// data and surfaces as [`CoreError::Internal`].
    pub fn to_rule(&self) -> Result<alerting::AlertRule, CoreError> {
        let corrupt = |column: &str, value: &str| {
            CoreError::Internal(format!(
                "Alert rule {} has unrecognised stored {column} '{value}'",
                self.id
            ))
        };
        Ok(alerting::AlertRule {
            id: Some(self.id),
            name: self.name.clone(),
            alert_type: self
                .alert_type
                .parse::<AlertType>()
                .map_err(|_| corrupt("alert_type", &self.alert_type))?,
            severity: self
                .severity
                .parse::<AlertSeverity>()
                .map_err(|_| corrupt("severity", &self.severity))?,
            condition: self.condition.0.clone(),
            is_active: self.is_active,
        })
    }
}

/// DTO for creating a rule.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAlertRule {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub condition: serde_json::Value,
    /// Defaults to `true`.
    pub is_active: Option<bool>,
}

/// DTO for updating a rule. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAlertRule {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub alert_type: Option<AlertType>,
    pub severity: Option<AlertSeverity>,
    pub condition: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}
