//! Handlers for the `/measurements` resource.
//!
//! Recording a measurement evaluates it against the alert rules and commits
//! the measurement together with any resulting alerts before responding.

use std::collections::HashSet;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use pulsewatch_core::alerting::Evaluation;
use pulsewatch_core::error::CoreError;
use pulsewatch_core::registry::device_accepts_measurements;
use pulsewatch_core::types::DbId;
use pulsewatch_db::models::device::Device;
use pulsewatch_db::models::measurement::{
    CreateMeasurement, CreateMeasurementBatch, DeviceRef, Measurement, MeasurementFilter,
};
use pulsewatch_db::repositories::{DeviceRepo, MeasurementRepo};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::patient::find_patient;
use crate::ingest::{self, IngestOutcome};
use crate::query::RecentParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Resolve the device a measurement names and check it may record for the
/// measurement's patient.
async fn resolve_device(state: &AppState, input: &CreateMeasurement) -> AppResult<Device> {
    let device = match &input.device_id {
        DeviceRef::Id(id) => DeviceRepo::find_by_id(&state.pool, *id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Device",
                id: *id,
            }))?,
        DeviceRef::Identifier(identifier) => {
            DeviceRepo::find_by_identifier(&state.pool, identifier)
                .await?
                .ok_or_else(|| {
                    AppError::Core(CoreError::Validation(format!(
                        "Unknown device identifier '{identifier}'"
                    )))
                })?
        }
    };

    if device.patient_id != input.patient_id {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Device {} is not assigned to patient {}",
            device.device_identifier, input.patient_id
        ))));
    }
    if !device_accepts_measurements(&device.status) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Device {} is {} and cannot record measurements",
            device.device_identifier, device.status
        ))));
    }
    Ok(device)
}

/// POST /api/v1/measurements
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateMeasurement>,
) -> AppResult<(StatusCode, Json<DataResponse<IngestOutcome>>)> {
    input.validate()?;
    find_patient(&state, input.patient_id).await?;
    let device = resolve_device(&state, &input).await?;

    let outcome = ingest::record(&state, device.id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// POST /api/v1/measurements/batch
///
/// Every item is checked before anything is stored. Items are then stored
/// and evaluated in order inside one transaction.
pub async fn create_batch(
    State(state): State<AppState>,
    Json(input): Json<CreateMeasurementBatch>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<IngestOutcome>>>)> {
    input.validate()?;

    let mut known_patients = HashSet::new();
    let mut resolved = Vec::with_capacity(input.measurements.len());
    for item in &input.measurements {
        if known_patients.insert(item.patient_id) {
            find_patient(&state, item.patient_id).await?;
        }
        let device = resolve_device(&state, item).await?;
        resolved.push((device.id, item));
    }

    let outcomes = ingest::record_batch(&state, &resolved).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: outcomes })))
}

/// GET /api/v1/measurements
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<MeasurementFilter>,
) -> AppResult<Json<DataResponse<Vec<Measurement>>>> {
    let measurements = MeasurementRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: measurements }))
}

/// GET /api/v1/measurements/recent/patient/{patient_id}
///
/// A patient's readings from the last `hours` (default 24, at most 168),
/// newest first, capped at `limit` (default 50, at most 500).
pub async fn recent(
    State(state): State<AppState>,
    Path(patient_id): Path<DbId>,
    Query(params): Query<RecentParams>,
) -> AppResult<Json<DataResponse<Vec<Measurement>>>> {
    find_patient(&state, patient_id).await?;
    let filter = MeasurementFilter {
        patient_id: Some(patient_id),
        start: Some(Utc::now() - Duration::hours(params.hours())),
        limit: Some(params.limit()),
        ..Default::default()
    };
    let measurements = MeasurementRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: measurements }))
}

async fn find_measurement(state: &AppState, id: DbId) -> AppResult<Measurement> {
    MeasurementRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Measurement",
            id,
        }))
}

/// GET /api/v1/measurements/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Measurement>>> {
    let measurement = find_measurement(&state, id).await?;
    Ok(Json(DataResponse { data: measurement }))
}

/// POST /api/v1/measurements/{id}/evaluate
///
/// Dry run against the current rule set; nothing is persisted.
pub async fn evaluate(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Evaluation>>> {
    let measurement = find_measurement(&state, id).await?;
    let evaluation = ingest::evaluate(&state, &measurement).await?;
    Ok(Json(DataResponse { data: evaluation }))
}
