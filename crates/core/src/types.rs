//! Primitive aliases shared by every crate in the workspace.

/// Primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Identifier of the clinician or operator performing an action.
///
/// There is no users table yet, so this is a bare id rather than a foreign key.
pub type ActorId = DbId;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
