pub mod alert;
pub mod alert_lifecycle;
pub mod alerting;
pub mod error;
pub mod measurement;
pub mod pagination;
pub mod registry;
pub mod types;
