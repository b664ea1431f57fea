//! Alert lifecycle state machine.
//!
//! ```text
//! active ──acknowledge──▶ acknowledged ──resolve──▶ resolved
//!   │                          │
//!   ├────────resolve───────────┼──────────────────▶ resolved
//!   └────────dismiss───────────┴──dismiss─────────▶ dismissed
//! ```
//!
//! Resolved and dismissed are terminal. Pure logic: the caller persists the
//! returned [`AlertTransition`] with a guard on the `from` status so that two
//! concurrent transitions on the same alert cannot both succeed.

use serde::Serialize;

use crate::alert::{AlertAction, AlertStatus};
use crate::error::CoreError;
use crate::types::{ActorId, Timestamp};

/// Who performed a lifecycle action, when, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionStamp {
    pub actor: ActorId,
    pub at: Timestamp,
    pub notes: Option<String>,
}

/// A validated status change, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertTransition {
    pub action: AlertAction,
    pub from: AlertStatus,
    pub to: AlertStatus,
    pub stamp: ActionStamp,
}

/// Compute the status reached by applying `action` to an alert in `current`.
///
/// - acknowledge is only valid from `active`; anything else is
///   [`CoreError::InvalidTransition`].
/// - resolve and dismiss are valid from `active` or `acknowledged`; on a
///   terminal alert they fail with [`CoreError::AlreadyTerminal`].
pub fn next_status(current: AlertStatus, action: AlertAction) -> Result<AlertStatus, CoreError> {
    match (action, current) {
        (AlertAction::Acknowledge, AlertStatus::Active) => Ok(AlertStatus::Acknowledged),
        (AlertAction::Acknowledge, from) => Err(CoreError::InvalidTransition { from, action }),
        (_, status) if status.is_terminal() => Err(CoreError::AlreadyTerminal { status }),
        (AlertAction::Resolve, _) => Ok(AlertStatus::Resolved),
        (AlertAction::Dismiss, _) => Ok(AlertStatus::Dismissed),
    }
}

/// In-memory view of an alert's lifecycle columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertLifecycle {
    pub status: AlertStatus,
    pub acknowledged: Option<ActionStamp>,
    pub resolved: Option<ActionStamp>,
    pub dismissed: Option<ActionStamp>,
}

impl AlertLifecycle {
    /// Lifecycle of a freshly created alert.
    pub fn new() -> Self {
        Self {
            status: AlertStatus::Active,
            acknowledged: None,
            resolved: None,
            dismissed: None,
        }
    }

    /// Apply `action`, recording the stamp on success.
    ///
    /// On error the lifecycle is left untouched.
    pub fn apply(
        &mut self,
        action: AlertAction,
        actor: ActorId,
        notes: Option<String>,
        at: Timestamp,
    ) -> Result<AlertTransition, CoreError> {
        let from = self.status;
        let to = next_status(from, action)?;
        let stamp = ActionStamp { actor, at, notes };

        match action {
            AlertAction::Acknowledge => self.acknowledged = Some(stamp.clone()),
            AlertAction::Resolve => self.resolved = Some(stamp.clone()),
            AlertAction::Dismiss => self.dismissed = Some(stamp.clone()),
        }
        self.status = to;

        Ok(AlertTransition {
            action,
            from,
            to,
            stamp,
        })
    }

    pub fn acknowledge(
        &mut self,
        actor: ActorId,
        notes: Option<String>,
        at: Timestamp,
    ) -> Result<AlertTransition, CoreError> {
        self.apply(AlertAction::Acknowledge, actor, notes, at)
    }

    pub fn resolve(
        &mut self,
        actor: ActorId,
        notes: Option<String>,
        at: Timestamp,
    ) -> Result<AlertTransition, CoreError> {
        self.apply(AlertAction::Resolve, actor, notes, at)
    }

    pub fn dismiss(
        &mut self,
        actor: ActorId,
        notes: Option<String>,
        at: Timestamp,
    ) -> Result<AlertTransition, CoreError> {
        self.apply(AlertAction::Dismiss, actor, notes, at)
    }
}

impl Default for AlertLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
