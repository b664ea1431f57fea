//! Threshold rules over patient measurements.
//!
//! - [`condition`]: the typed condition language stored on each rule
//! - [`config`]: clinical default thresholds and evaluator settings
//! - [`evaluator`]: turns one measurement plus a rule set into alert drafts
//! - [`offline`]: drafts `device_offline` alerts for devices that stopped syncing

pub mod condition;
pub mod config;
pub mod evaluator;
pub mod offline;
pub mod rule;

pub use condition::{Condition, ExpectedValue};
pub use config::{EvaluatorConfig, VitalThresholds, DEFAULT_MAX_DURATION_MINUTES};
pub use evaluator::{Evaluation, RuleEvaluator};
pub use offline::{offline_draft, DeviceSyncState, DEFAULT_OFFLINE_AFTER_HOURS};
pub use rule::{AlertRule, RuleRejection};
