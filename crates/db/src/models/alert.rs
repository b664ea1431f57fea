//! Alert model, DTOs and aggregate views.

use pulsewatch_core::alert::{AlertSeverity, AlertStatus, AlertType};
use pulsewatch_core::alert_lifecycle::{ActionStamp, AlertLifecycle};
use pulsewatch_core::error::CoreError;
use pulsewatch_core::types::{ActorId, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

use super::LabelCount;

/// A row from the `alerts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Alert {
    pub id: DbId,
    pub patient_id: DbId,
    pub alert_type: String,
    pub severity: String,
    pub title: String,
    pub description: Option<String>,
    pub alert_data: Option<Json<serde_json::Value>>,
    pub status: String,
    pub rule_id: Option<DbId>,
    pub triggered_by_measurement_id: Option<DbId>,
    pub acknowledged_by: Option<ActorId>,
    pub acknowledged_at: Option<Timestamp>,
    pub acknowledgment_notes: Option<String>,
    pub resolved_by: Option<ActorId>,
    pub resolved_at: Option<Timestamp>,
    pub resolution_notes: Option<String>,
    pub dismissed_by: Option<ActorId>,
    pub dismissed_at: Option<Timestamp>,
    pub dismissal_notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn stamp(
    actor: Option<ActorId>,
    at: Option<Timestamp>,
    notes: &Option<String>,
) -> Option<ActionStamp> {
    match (actor, at) {
        (Some(actor), Some(at)) => Some(ActionStamp {
            actor,
            at,
            notes: notes.clone(),
        }),
        _ => None,
    }
}

impl Alert {
    /// The stored status. A value outside the vocabulary is corrupt data,
    /// not a client error.
    pub fn status(&self) -> Result<AlertStatus, CoreError> {
        self.status.parse().map_err(|_| {
            CoreError::Internal(format!(
                "Alert {} has unrecognised stored status '{}'",
                self.id, self.status
            ))
        })
    }

    /// Rebuild the lifecycle state machine from the stored columns.
    pub fn lifecycle(&self) -> Result<AlertLifecycle, CoreError> {
        Ok(AlertLifecycle {
            status: self.status()?,
            acknowledged: stamp(
                self.acknowledged_by,
                self.acknowledged_at,
                &self.acknowledgment_notes,
            ),
            resolved: stamp(self.resolved_by, self.resolved_at, &self.resolution_notes),
            dismissed: stamp(self.dismissed_by, self.dismissed_at, &self.dismissal_notes),
        })
    }
}

/// DTO for an operator-created alert. Never carries a triggering measurement.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAlert {
    pub patient_id: DbId,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    pub alert_data: Option<serde_json::Value>,
}

/// Body of the acknowledge / resolve / dismiss endpoints.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AlertActionRequest {
    pub actor_id: ActorId,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Filters for `GET /alerts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilter {
    pub patient_id: Option<DbId>,
    pub alert_type: Option<AlertType>,
    pub severity: Option<AlertSeverity>,
    pub status: Option<AlertStatus>,
    /// Include resolved and dismissed alerts. Implied by an explicit `status`.
    #[serde(default)]
    pub include_resolved: bool,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Aggregate alert counts over a time window.
#[derive(Debug, Clone, Serialize)]
pub struct AlertStats {
    pub since: Timestamp,
    pub total: i64,
    pub active: i64,
    pub by_type: Vec<LabelCount>,
    pub by_status: Vec<LabelCount>,
    pub by_severity: Vec<LabelCount>,
}
