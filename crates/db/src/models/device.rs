//! Wearable device model and DTOs.

use pulsewatch_core::alerting::DeviceSyncState;
use pulsewatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::LabelCount;

/// A row from the `devices` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Device {
    pub id: DbId,
    /// Vendor-assigned identifier; measurements may reference the device by it.
    pub device_identifier: String,
    pub patient_id: DbId,
    pub device_type: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub firmware_version: Option<String>,
    pub battery_level: Option<i32>,
    pub status: String,
    pub last_sync_time: Option<Timestamp>,
    pub calibration_date: Option<Timestamp>,
    pub calibration_due_date: Option<Timestamp>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Device {
    /// The fields the offline check looks at.
    pub fn sync_state(&self) -> DeviceSyncState {
        DeviceSyncState {
            device_id: self.id,
            device_identifier: self.device_identifier.clone(),
            patient_id: self.patient_id,
            last_sync_time: self.last_sync_time,
            registered_at: self.created_at,
        }
    }
}

/// DTO for registering a device to a patient.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDevice {
    #[validate(length(min = 1, max = 100))]
    pub device_identifier: String,
    pub patient_id: DbId,
    pub device_type: String,
    #[validate(length(max = 100))]
    pub manufacturer: Option<String>,
    #[validate(length(max = 100))]
    pub model: Option<String>,
    #[validate(length(max = 100))]
    pub serial_number: Option<String>,
    #[validate(length(max = 50))]
    pub firmware_version: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub battery_level: Option<i32>,
    pub calibration_date: Option<Timestamp>,
    pub calibration_due_date: Option<Timestamp>,
    pub notes: Option<String>,
}

/// DTO for updating a device. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDevice {
    pub device_type: Option<String>,
    #[validate(length(max = 100))]
    pub manufacturer: Option<String>,
    #[validate(length(max = 100))]
    pub model: Option<String>,
    #[validate(length(max = 50))]
    pub firmware_version: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub battery_level: Option<i32>,
    pub status: Option<String>,
    pub calibration_date: Option<Timestamp>,
    pub calibration_due_date: Option<Timestamp>,
    pub notes: Option<String>,
}

/// Body of `POST /devices/{id}/sync`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SyncDevice {
    #[validate(range(min = 0, max = 100))]
    pub battery_level: Option<i32>,
    #[validate(length(max = 50))]
    pub firmware_version: Option<String>,
}

/// Fleet-wide device counts.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStats {
    pub total: i64,
    pub active: i64,
    pub by_type: Vec<LabelCount>,
    pub by_status: Vec<LabelCount>,
}
