use serde::Serialize;

use crate::alert::{AlertSeverity, AlertType};
use crate::error::CoreError;
use crate::types::DbId;

/// An alert rule as handed to the evaluator.
///
/// `condition` is kept as raw JSON; it is parsed per evaluation so that one
/// malformed stored rule never prevents the others from firing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRule {
    /// `None` for built-in default rules that have no database row.
    pub id: Option<DbId>,
    pub name: String,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub condition: serde_json::Value,
    pub is_active: bool,
}

/// A rule skipped during evaluation because it could not be interpreted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleRejection {
    pub rule_id: Option<DbId>,
    pub rule_name: String,
    pub reason: String,
}

impl RuleRejection {
    pub fn new(rule_id: Option<DbId>, rule_name: impl Into<String>, error: &CoreError) -> Self {
        let reason = match error {
            CoreError::Validation(msg) | CoreError::Internal(msg) => msg.clone(),
            other => other.to_string(),
        };
        Self {
            rule_id,
            rule_name: rule_name.into(),
            reason,
        }
    }
}
