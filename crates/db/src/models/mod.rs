//! Row models and request DTOs.
//!
//! Row structs derive `FromRow`; create/update DTOs derive `Validate` and are
//! checked by the API before they reach a repository.

pub mod alert;
pub mod alert_rule;
pub mod device;
pub mod measurement;
pub mod patient;

use serde::Serialize;
use sqlx::FromRow;

/// A `(label, count)` pair from a grouped count.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}
