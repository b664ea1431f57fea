use crate::alert::{AlertAction, AlertStatus};
use crate::types::DbId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Cannot {action} an alert that is {from}")]
    InvalidTransition {
        from: AlertStatus,
        action: AlertAction,
    },

    #[error("Alert is already {status}; no further transitions are allowed")]
    AlreadyTerminal { status: AlertStatus },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
