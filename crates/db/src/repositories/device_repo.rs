//! Repository for the `devices` table.

use pulsewatch_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use pulsewatch_core::alert::AlertType;
use pulsewatch_core::registry::{DEVICE_STATUS_ACTIVE, DEVICE_STATUS_RETIRED};
use pulsewatch_core::types::{DbId, Timestamp};
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::device::{CreateDevice, Device, DeviceStats, SyncDevice, UpdateDevice};
use crate::models::LabelCount;
use crate::repositories::alert_repo::open_statuses;

/// Advisory lock key held while an offline check runs.
const OFFLINE_CHECK_LOCK: i64 = 0x5057_4f46_464c;

const COLUMNS: &str = "id, device_identifier, patient_id, device_type, manufacturer, model, \
    serial_number, firmware_version, battery_level, status, last_sync_time, calibration_date, \
    calibration_due_date, notes, created_at, updated_at";

/// Provides CRUD operations for devices.
pub struct DeviceRepo;

impl DeviceRepo {
    pub async fn create(pool: &PgPool, input: &CreateDevice) -> Result<Device, sqlx::Error> {
        let query = format!(
            "INSERT INTO devices (device_identifier, patient_id, device_type, manufacturer, \
                model, serial_number, firmware_version, battery_level, calibration_date, \
                calibration_due_date, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(&input.device_identifier)
            .bind(input.patient_id)
            .bind(&input.device_type)
            .bind(&input.manufacturer)
            .bind(&input.model)
            .bind(&input.serial_number)
            .bind(&input.firmware_version)
            .bind(input.battery_level)
            .bind(input.calibration_date)
            .bind(input.calibration_due_date)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Device>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM devices WHERE id = $1");
        sqlx::query_as::<_, Device>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Look a device up by its vendor identifier.
    pub async fn find_by_identifier(
        pool: &PgPool,
        device_identifier: &str,
    ) -> Result<Option<Device>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM devices WHERE device_identifier = $1");
        sqlx::query_as::<_, Device>(&query)
            .bind(device_identifier)
            .fetch_optional(pool)
            .await
    }

    /// List devices, optionally filtered by owning patient and/or status.
    pub async fn list(
        pool: &PgPool,
        patient_id: Option<DbId>,
        status: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Device>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM devices
             WHERE ($1::BIGINT IS NULL OR patient_id = $1)
               AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY id
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(patient_id)
            .bind(status)
            .bind(clamp_limit(limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT))
            .bind(clamp_offset(offset))
            .fetch_all(pool)
            .await
    }

    /// Update a device. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateDevice,
    ) -> Result<Option<Device>, sqlx::Error> {
        let query = format!(
            "UPDATE devices SET
                device_type = COALESCE($2, device_type),
                manufacturer = COALESCE($3, manufacturer),
                model = COALESCE($4, model),
                firmware_version = COALESCE($5, firmware_version),
                battery_level = COALESCE($6, battery_level),
                status = COALESCE($7, status),
                calibration_date = COALESCE($8, calibration_date),
                calibration_due_date = COALESCE($9, calibration_due_date),
                notes = COALESCE($10, notes)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(id)
            .bind(&input.device_type)
            .bind(&input.manufacturer)
            .bind(&input.model)
            .bind(&input.firmware_version)
            .bind(input.battery_level)
            .bind(&input.status)
            .bind(input.calibration_date)
            .bind(input.calibration_due_date)
            .bind(&input.notes)
            .fetch_optional(pool)
            .await
    }

    /// Stamp `last_sync_time` and apply any reported battery/firmware state.
    pub async fn record_sync(
        pool: &PgPool,
        id: DbId,
        input: &SyncDevice,
    ) -> Result<Option<Device>, sqlx::Error> {
        let query = format!(
            "UPDATE devices SET
                last_sync_time = NOW(),
                battery_level = COALESCE($2, battery_level),
                firmware_version = COALESCE($3, firmware_version)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(id)
            .bind(input.battery_level)
            .bind(&input.firmware_version)
            .fetch_optional(pool)
            .await
    }

    /// Retire a device. Measurements keep referencing it.
    ///
    /// Returns `true` if the row existed.
    pub async fn retire(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE devices SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(DEVICE_STATUS_RETIRED)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Hold the offline-check lock until the surrounding transaction ends, so
    /// concurrent checks cannot both alert on one device.
    pub async fn lock_offline_check(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(OFFLINE_CHECK_LOCK)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Active devices silent since before `cutoff` that have no open
    /// `device_offline` alert yet. A device that never synced counts from
    /// its registration.
    pub async fn list_stale<'e>(
        executor: impl PgExecutor<'e>,
        cutoff: Timestamp,
    ) -> Result<Vec<Device>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM devices d
             WHERE d.status = $1
               AND COALESCE(d.last_sync_time, d.created_at) < $2
               AND NOT EXISTS (
                   SELECT 1 FROM alerts a
                   WHERE a.alert_type = $3
                     AND a.status = ANY($4)
                     AND a.alert_data->>'device_id' = d.id::TEXT
               )
             ORDER BY d.id"
        );
        sqlx::query_as::<_, Device>(&query)
            .bind(DEVICE_STATUS_ACTIVE)
            .bind(cutoff)
            .bind(AlertType::DeviceOffline.as_str())
            .bind(open_statuses())
            .fetch_all(executor)
            .await
    }

    /// Device totals grouped by type and status.
    pub async fn stats(pool: &PgPool) -> Result<DeviceStats, sqlx::Error> {
        let grouped = |column: &str| {
            format!(
                "SELECT {column} AS label, COUNT(*) AS count FROM devices
                 GROUP BY {column}
                 ORDER BY count DESC, label"
            )
        };

        let by_type: Vec<LabelCount> = sqlx::query_as(&grouped("device_type"))
            .fetch_all(pool)
            .await?;
        let by_status: Vec<LabelCount> = sqlx::query_as(&grouped("status"))
            .fetch_all(pool)
            .await?;

        let total = by_status.iter().map(|c| c.count).sum();
        let active = by_status
            .iter()
            .filter(|c| c.label == DEVICE_STATUS_ACTIVE)
            .map(|c| c.count)
            .sum();

        Ok(DeviceStats {
            total,
            active,
            by_type,
            by_status,
        })
    }
}
