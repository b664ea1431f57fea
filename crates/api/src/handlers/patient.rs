//! Handlers for the `/patients` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use pulsewatch_core::error::CoreError;
use pulsewatch_core::registry::{validate_gender, validate_stats_parameter, STATS_PARAMETERS};
use pulsewatch_core::types::DbId;
use pulsewatch_db::models::alert::{Alert, AlertFilter};
use pulsewatch_db::models::device::Device;
use pulsewatch_db::models::measurement::{Measurement, MeasurementFilter, PatientMeasurementStats};
use pulsewatch_db::models::patient::{CreatePatient, Patient, PatientStats, UpdatePatient};
use pulsewatch_db::repositories::{AlertRepo, DeviceRepo, MeasurementRepo, PatientRepo};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::query::{stats_days, MeasurementStatsParams, PaginationParams, PatientListParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// Load a patient or fail with 404. Shared by the device, measurement and
/// alert handlers.
pub(crate) async fn find_patient(state: &AppState, id: DbId) -> AppResult<Patient> {
    PatientRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Patient",
            id,
        }))
}

/// POST /api/v1/patients
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreatePatient>,
) -> AppResult<(StatusCode, Json<DataResponse<Patient>>)> {
    input.validate()?;
    validate_gender(&input.gender)?;

    let patient = PatientRepo::create(&state.pool, &input).await?;
    tracing::info!(patient_id = patient.id, "Patient registered");
    Ok((StatusCode::CREATED, Json(DataResponse { data: patient })))
}

/// GET /api/v1/patients
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PatientListParams>,
) -> AppResult<Json<DataResponse<Vec<Patient>>>> {
    let patients =
        PatientRepo::list(&state.pool, params.is_active, params.limit, params.offset).await?;
    Ok(Json(DataResponse { data: patients }))
}

/// GET /api/v1/patients/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Patient>>> {
    let patient = find_patient(&state, id).await?;
    Ok(Json(DataResponse { data: patient }))
}

/// PUT /api/v1/patients/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePatient>,
) -> AppResult<Json<DataResponse<Patient>>> {
    input.validate()?;
    if let Some(gender) = &input.gender {
        validate_gender(gender)?;
    }

    let patient = PatientRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Patient",
            id,
        }))?;
    Ok(Json(DataResponse { data: patient }))
}

/// DELETE /api/v1/patients/{id}
///
/// Deactivates the patient; the record and its alert history are kept.
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if PatientRepo::deactivate(&state.pool, id).await? {
        tracing::info!(patient_id = id, "Patient deactivated");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Patient",
            id,
        }))
    }
}

/// GET /api/v1/patients/{id}/devices
pub async fn list_devices(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Device>>>> {
    find_patient(&state, id).await?;
    let devices = DeviceRepo::list(&state.pool, Some(id), None, page.limit, page.offset).await?;
    Ok(Json(DataResponse { data: devices }))
}

/// GET /api/v1/patients/{id}/measurements
pub async fn list_measurements(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(mut filter): Query<MeasurementFilter>,
) -> AppResult<Json<DataResponse<Vec<Measurement>>>> {
    find_patient(&state, id).await?;
    filter.patient_id = Some(id);
    let measurements = MeasurementRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: measurements }))
}

/// GET /api/v1/patients/{id}/measurements/stats
///
/// Count, average, min, max and latest value per numeric field over the
/// last `days` (default 7, at most 365).
pub async fn measurement_stats(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(params): Query<MeasurementStatsParams>,
) -> AppResult<Json<DataResponse<PatientMeasurementStats>>> {
    let fields: Vec<&'static str> = match &params.parameter {
        Some(parameter) => vec![validate_stats_parameter(parameter)?],
        None => STATS_PARAMETERS.to_vec(),
    };
    find_patient(&state, id).await?;

    let days = stats_days(params.days);
    let since = Utc::now() - Duration::days(days);
    let mut parameters = Vec::with_capacity(fields.len());
    for field in fields {
        parameters.push(MeasurementRepo::parameter_stats(&state.pool, id, field, since).await?);
    }

    Ok(Json(DataResponse {
        data: PatientMeasurementStats {
            patient_id: id,
            days,
            since,
            parameters,
        },
    }))
}

/// GET /api/v1/patients/stats
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<DataResponse<PatientStats>>> {
    let stats = PatientRepo::stats(&state.pool).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/patients/{id}/alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(mut filter): Query<AlertFilter>,
) -> AppResult<Json<DataResponse<Vec<Alert>>>> {
    find_patient(&state, id).await?;
    filter.patient_id = Some(id);
    let alerts = AlertRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: alerts }))
}
