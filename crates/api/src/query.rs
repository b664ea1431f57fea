//! Query parameter types shared by several handler modules.

use pulsewatch_core::types::DbId;
use serde::Deserialize;

/// Generic pagination parameters (`?limit=&offset=`).
///
/// Values are clamped in the repository layer via `clamp_limit` /
/// `clamp_offset`.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /patients?is_active=&limit=&offset=`
#[derive(Debug, Default, Deserialize)]
pub struct PatientListParams {
    pub is_active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /devices?patient_id=&status=&limit=&offset=`
#[derive(Debug, Default, Deserialize)]
pub struct DeviceListParams {
    pub patient_id: Option<DbId>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /alert-rules?is_active=`
#[derive(Debug, Default, Deserialize)]
pub struct RuleListParams {
    pub is_active: Option<bool>,
}

/// `GET /alerts/active/count?patient_id=`
#[derive(Debug, Default, Deserialize)]
pub struct PatientScope {
    pub patient_id: Option<DbId>,
}

pub const DEFAULT_STATS_DAYS: i64 = 7;
pub const MAX_STATS_DAYS: i64 = 365;

/// Look-back window in days, defaulted and clamped to `1..=365`.
pub fn stats_days(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_STATS_DAYS).clamp(1, MAX_STATS_DAYS)
}

/// `GET /alerts/stats?days=`
#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    pub days: Option<i64>,
}

/// `GET /patients/{id}/measurements/stats?days=&parameter=`
#[derive(Debug, Default, Deserialize)]
pub struct MeasurementStatsParams {
    pub days: Option<i64>,
    /// Restrict the report to one field; every numeric field otherwise.
    pub parameter: Option<String>,
}

pub const DEFAULT_RECENT_HOURS: i64 = 24;
pub const MAX_RECENT_HOURS: i64 = 168;
pub const DEFAULT_RECENT_LIMIT: i64 = 50;
pub const MAX_RECENT_LIMIT: i64 = 500;

/// `GET /measurements/recent/patient/{id}?hours=&limit=`
#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    pub hours: Option<i64>,
    pub limit: Option<i64>,
}

impl RecentParams {
    pub fn hours(&self) -> i64 {
        self.hours
            .unwrap_or(DEFAULT_RECENT_HOURS)
            .clamp(1, MAX_RECENT_HOURS)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, MAX_RECENT_LIMIT)
    }
}
