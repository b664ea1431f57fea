//! Handlers for the `/devices` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use pulsewatch_core::error::CoreError;
use pulsewatch_core::registry::{validate_device_status, validate_device_type};
use pulsewatch_core::types::DbId;
use pulsewatch_db::models::alert::Alert;
use pulsewatch_db::models::device::{CreateDevice, Device, DeviceStats, SyncDevice, UpdateDevice};
use pulsewatch_db::models::measurement::{Measurement, MeasurementFilter};
use pulsewatch_db::repositories::{DeviceRepo, MeasurementRepo};
use validator::Validate;

use crate::background::device_offline;
use crate::error::{AppError, AppResult};
use crate::handlers::patient::find_patient;
use crate::query::{DeviceListParams, PaginationParams};
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Device",
        id,
    })
}

/// POST /api/v1/devices
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateDevice>,
) -> AppResult<(StatusCode, Json<DataResponse<Device>>)> {
    input.validate()?;
    validate_device_type(&input.device_type)?;
    find_patient(&state, input.patient_id).await?;

    let device = DeviceRepo::create(&state.pool, &input).await?;
    tracing::info!(
        device_id = device.id,
        patient_id = device.patient_id,
        device_identifier = %device.device_identifier,
        "Device registered",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: device })))
}

/// GET /api/v1/devices
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<DeviceListParams>,
) -> AppResult<Json<DataResponse<Vec<Device>>>> {
    if let Some(status) = &params.status {
        validate_device_status(status)?;
    }
    let devices = DeviceRepo::list(
        &state.pool,
        params.patient_id,
        params.status.as_deref(),
        params.limit,
        params.offset,
    )
    .await?;
    Ok(Json(DataResponse { data: devices }))
}

async fn find_device(state: &AppState, id: DbId) -> AppResult<Device> {
    DeviceRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))
}

/// GET /api/v1/devices/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Device>>> {
    let device = find_device(&state, id).await?;
    Ok(Json(DataResponse { data: device }))
}

/// GET /api/v1/devices/{id}/measurements
pub async fn list_measurements(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Measurement>>>> {
    find_device(&state, id).await?;
    let filter = MeasurementFilter {
        device_id: Some(id),
        limit: page.limit,
        offset: page.offset,
        ..Default::default()
    };
    let measurements = MeasurementRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: measurements }))
}

/// GET /api/v1/devices/stats
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<DataResponse<DeviceStats>>> {
    let stats = DeviceRepo::stats(&state.pool).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// POST /api/v1/devices/offline-check
///
/// Runs the offline check now; returns the alerts it raised.
pub async fn offline_check(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Alert>>>> {
    let alerts = device_offline::check(&state, Utc::now()).await?;
    Ok(Json(DataResponse { data: alerts }))
}

/// PUT /api/v1/devices/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateDevice>,
) -> AppResult<Json<DataResponse<Device>>> {
    input.validate()?;
    if let Some(device_type) = &input.device_type {
        validate_device_type(device_type)?;
    }
    if let Some(status) = &input.status {
        validate_device_status(status)?;
    }

    let device = DeviceRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: device }))
}

/// POST /api/v1/devices/{id}/sync
pub async fn sync(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<SyncDevice>,
) -> AppResult<Json<DataResponse<Device>>> {
    input.validate()?;
    let device = DeviceRepo::record_sync(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::debug!(device_id = id, battery_level = ?device.battery_level, "Device synced");
    Ok(Json(DataResponse { data: device }))
}

/// DELETE /api/v1/devices/{id}
///
/// Marks the device retired; its measurements are kept.
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if DeviceRepo::retire(&state.pool, id).await? {
        tracing::info!(device_id = id, "Device retired");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}
