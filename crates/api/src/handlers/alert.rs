//! Handlers for the `/alerts` resource and its lifecycle actions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, Utc};
use pulsewatch_core::alert::{validate_title, AlertAction};
use pulsewatch_core::error::CoreError;
use pulsewatch_core::types::DbId;
use pulsewatch_db::models::alert::{
    Alert, AlertActionRequest, AlertFilter, AlertStats, CreateAlert,
};
use pulsewatch_db::repositories::AlertRepo;
use serde::Serialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::patient::find_patient;
use crate::query::{stats_days, PatientScope, StatsParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// Attempts at a guarded transition before reporting a conflict.
const MAX_TRANSITION_ATTEMPTS: usize = 3;

async fn find_alert(state: &AppState, id: DbId) -> AppResult<Alert> {
    AlertRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Alert",
            id,
        }))
}

/// POST /api/v1/alerts
///
/// Manual alert raised by an operator.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateAlert>,
) -> AppResult<(StatusCode, Json<DataResponse<Alert>>)> {
    input.validate()?;
    validate_title(&input.title)?;
    find_patient(&state, input.patient_id).await?;

    let alert = AlertRepo::create_manual(&state.pool, &input).await?;
    tracing::info!(
        alert_id = alert.id,
        patient_id = alert.patient_id,
        alert_type = %alert.alert_type,
        "Manual alert created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: alert })))
}

/// GET /api/v1/alerts
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
) -> AppResult<Json<DataResponse<Vec<Alert>>>> {
    let alerts = AlertRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: alerts }))
}

/// GET /api/v1/alerts/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let alert = find_alert(&state, id).await?;
    Ok(Json(DataResponse { data: alert }))
}

#[derive(Debug, Serialize)]
pub struct OpenCount {
    pub patient_id: Option<DbId>,
    pub count: i64,
}

/// GET /api/v1/alerts/active/count
///
/// Counts alerts that are active or acknowledged.
pub async fn active_count(
    State(state): State<AppState>,
    Query(scope): Query<PatientScope>,
) -> AppResult<Json<DataResponse<OpenCount>>> {
    let count = AlertRepo::count_open(&state.pool, scope.patient_id).await?;
    Ok(Json(DataResponse {
        data: OpenCount {
            patient_id: scope.patient_id,
            count,
        },
    }))
}

/// GET /api/v1/alerts/stats
pub async fn stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> AppResult<Json<DataResponse<AlertStats>>> {
    let days = stats_days(params.days);
    let since = Utc::now() - Duration::days(days);
    let stats = AlertRepo::stats(&state.pool, since).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// Validate and persist a lifecycle action.
///
/// The transition is computed from the alert as read, then stored with a
/// guard on that status. If another request changed the alert in between,
/// the alert is re-read and the action re-validated against its new status,
/// which surfaces `InvalidTransition` / `AlreadyTerminal` to the loser.
async fn transition(
    state: &AppState,
    id: DbId,
    action: AlertAction,
    request: AlertActionRequest,
) -> AppResult<Alert> {
    request.validate()?;

    for _ in 0..MAX_TRANSITION_ATTEMPTS {
        let alert = find_alert(state, id).await?;
        let mut lifecycle = alert.lifecycle()?;
        let transition =
            lifecycle.apply(action, request.actor_id, request.notes.clone(), Utc::now())?;

        if let Some(updated) = AlertRepo::apply_transition(&state.pool, id, &transition).await? {
            tracing::info!(
                alert_id = id,
                actor_id = request.actor_id,
                %action,
                from = %transition.from,
                to = %transition.to,
                "Alert status changed",
            );
            return Ok(updated);
        }
        tracing::debug!(alert_id = id, %action, "Alert changed concurrently, re-reading");
    }

    Err(AppError::Core(CoreError::Conflict(format!(
        "Alert {id} is being modified concurrently; retry the {action}"
    ))))
}

/// POST /api/v1/alerts/{id}/acknowledge
pub async fn acknowledge(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<AlertActionRequest>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let alert = transition(&state, id, AlertAction::Acknowledge, request).await?;
    Ok(Json(DataResponse { data: alert }))
}

/// POST /api/v1/alerts/{id}/resolve
pub async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<AlertActionRequest>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let alert = transition(&state, id, AlertAction::Resolve, request).await?;
    Ok(Json(DataResponse { data: alert }))
}

/// POST /api/v1/alerts/{id}/dismiss
pub async fn dismiss(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(request): Json<AlertActionRequest>,
) -> AppResult<Json<DataResponse<Alert>>> {
    let alert = transition(&state, id, AlertAction::Dismiss, request).await?;
    Ok(Json(DataResponse { data: alert }))
}
