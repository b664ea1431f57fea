//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or any executor, for transactional helpers) first.

pub mod alert_repo;
pub mod alert_rule_repo;
pub mod device_repo;
pub mod measurement_repo;
pub mod patient_repo;

pub use alert_repo::AlertRepo;
pub use alert_rule_repo::AlertRuleRepo;
pub use device_repo::DeviceRepo;
pub use measurement_repo::MeasurementRepo;
pub use patient_repo::PatientRepo;
