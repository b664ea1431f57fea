//! Device-offline detection.
//!
//! A device that has not synced for longer than the configured window gets a
//! `device_offline` alert. Unlike threshold rules, nothing here depends on a
//! measurement.

use chrono::Duration;
use serde_json::json;

use crate::alert::{AlertDraft, AlertSeverity, AlertType};
use crate::types::{DbId, Timestamp};

/// Hours without a sync before a device counts as offline.
pub const DEFAULT_OFFLINE_AFTER_HOURS: u32 = 24;

/// What the offline check needs to know about one device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSyncState {
    pub device_id: DbId,
    pub device_identifier: String,
    pub patient_id: DbId,
    pub last_sync_time: Option<Timestamp>,
    /// Stands in for `last_sync_time` on a device that never synced.
    pub registered_at: Timestamp,
}

impl DeviceSyncState {
    fn silent_since(&self) -> Timestamp {
        self.last_sync_time.unwrap_or(self.registered_at)
    }
}

/// Draft a `device_offline` alert when `device` has been silent for longer
/// than `offline_after` at `now`. Returns `None` for a device still in touch.
pub fn offline_draft(
    device: &DeviceSyncState,
    now: Timestamp,
    offline_after: Duration,
) -> Option<AlertDraft> {
    let silent_for = now - device.silent_since();
    if silent_for <= offline_after {
        return None;
    }
    let hours = silent_for.num_hours();

    let description = match device.last_sync_time {
        Some(_) => format!("Device has not synced data for {hours} hours"),
        None => format!("Device has never synced since it was registered {hours} hours ago"),
    };

    Some(AlertDraft {
        patient_id: device.patient_id,
        alert_type: AlertType::DeviceOffline,
        severity: AlertSeverity::Medium,
        title: format!("Device offline: {}", device.device_identifier),
        description: Some(description),
        alert_data: json!({
            "device_id": device.device_id,
            "device_identifier": device.device_identifier,
            "last_sync_time": device.last_sync_time,
            "hours_offline": hours,
        }),
        rule_id: None,
        triggered_by_measurement_id: None,
        observed_at: now,
    })
}
