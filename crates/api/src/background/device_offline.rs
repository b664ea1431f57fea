//! Periodic detection of devices that stopped syncing.
//!
//! Each pass raises one `device_offline` alert per active device that has
//! been silent longer than `DEVICE_OFFLINE_HOURS` and has no open offline
//! alert. The same pass backs `POST /devices/offline-check`.

use std::time::Duration;

use chrono::Utc;
use pulsewatch_core::alert::AlertDraft;
use pulsewatch_core::alerting::offline_draft;
use pulsewatch_core::types::Timestamp;
use pulsewatch_db::models::alert::Alert;
use pulsewatch_db::repositories::{AlertRepo, DeviceRepo};
use tokio_util::sync::CancellationToken;

use crate::error::AppResult;
use crate::state::AppState;

/// Run one offline check as of `now`, returning the alerts it raised.
pub async fn check(state: &AppState, now: Timestamp) -> AppResult<Vec<Alert>> {
    let offline_after = chrono::Duration::hours(i64::from(state.config.device_offline_after_hours));

    let mut tx = state.pool.begin().await?;
    DeviceRepo::lock_offline_check(&mut *tx).await?;

    let stale = DeviceRepo::list_stale(&mut *tx, now - offline_after).await?;
    let drafts: Vec<AlertDraft> = stale
        .iter()
        .filter_map(|device| offline_draft(&device.sync_state(), now, offline_after))
        .collect();
    let alerts = AlertRepo::create_from_drafts(&mut *tx, &drafts).await?;
    tx.commit().await?;

    for alert in &alerts {
        tracing::info!(
            alert_id = alert.id,
            patient_id = alert.patient_id,
            title = %alert.title,
            "Device offline alert raised",
        );
    }
    Ok(alerts)
}

/// Run the offline check every `period` until `cancel` is triggered.
pub async fn run(state: AppState, period: Duration, cancel: CancellationToken) {
    tracing::info!(
        offline_after_hours = state.config.device_offline_after_hours,
        interval_secs = period.as_secs(),
        "Device offline check started"
    );

    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Device offline check stopping");
                break;
            }
            _ = interval.tick() => {
                match check(&state, Utc::now()).await {
                    Ok(alerts) if !alerts.is_empty() => {
                        tracing::info!(raised = alerts.len(), "Device offline check: alerts raised");
                    }
                    Ok(_) => {
                        tracing::debug!("Device offline check: all devices in touch");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Device offline check failed");
                    }
                }
            }
        }
    }
}
