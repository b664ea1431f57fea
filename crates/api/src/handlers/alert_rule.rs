//! Handlers for the `/alert-rules` resource.
//!
//! Conditions are parsed on write so that a malformed rule is rejected with
//! a 400 instead of being silently skipped at evaluation time.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use pulsewatch_core::alerting::Condition;
use pulsewatch_core::error::CoreError;
use pulsewatch_core::types::DbId;
use pulsewatch_db::models::alert_rule::{AlertRule, CreateAlertRule, UpdateAlertRule};
use pulsewatch_db::repositories::AlertRuleRepo;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::query::RuleListParams;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "AlertRule",
        id,
    })
}

/// POST /api/v1/alert-rules
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateAlertRule>,
) -> AppResult<(StatusCode, Json<DataResponse<AlertRule>>)> {
    input.validate()?;
    let condition = Condition::parse(
        &input.condition,
        state.evaluator.config().max_duration_minutes,
    )?;

    let rule = AlertRuleRepo::create(&state.pool, &input).await?;
    tracing::info!(
        rule_id = rule.id,
        name = %rule.name,
        condition = %condition.describe(),
        "Alert rule created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: rule })))
}

/// GET /api/v1/alert-rules
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<RuleListParams>,
) -> AppResult<Json<DataResponse<Vec<AlertRule>>>> {
    let rules = AlertRuleRepo::list(&state.pool, params.is_active).await?;
    Ok(Json(DataResponse { data: rules }))
}

/// GET /api/v1/alert-rules/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AlertRule>>> {
    let rule = AlertRuleRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: rule }))
}

/// PUT /api/v1/alert-rules/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAlertRule>,
) -> AppResult<Json<DataResponse<AlertRule>>> {
    input.validate()?;
    if let Some(condition) = &input.condition {
        Condition::parse(condition, state.evaluator.config().max_duration_minutes)?;
    }

    let rule = AlertRuleRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(rule_id = id, is_active = rule.is_active, "Alert rule updated");
    Ok(Json(DataResponse { data: rule }))
}

/// DELETE /api/v1/alert-rules/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if AlertRuleRepo::delete(&state.pool, id).await? {
        tracing::info!(rule_id = id, "Alert rule deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}
