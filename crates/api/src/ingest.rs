//! Glue between stored measurements and the rule evaluator.
//!
//! Recording a measurement stores the row, loads the rule set and history
//! window, runs the evaluator and stores the resulting alerts inside one
//! transaction. A failure at any step leaves nothing behind.

use pulsewatch_core::alerting::{AlertRule, Evaluation, RuleRejection};
use pulsewatch_core::measurement::MeasurementSnapshot;
use pulsewatch_core::types::DbId;
use pulsewatch_db::models::alert::Alert;
use pulsewatch_db::models::measurement::{CreateMeasurement, Measurement};
use pulsewatch_db::repositories::{AlertRepo, AlertRuleRepo, MeasurementRepo};
use serde::Serialize;
use sqlx::PgConnection;

use crate::error::AppResult;
use crate::state::AppState;

/// Outcome of recording one measurement.
#[derive(Debug, Serialize)]
pub struct IngestOutcome {
    pub measurement: Measurement,
    pub alert_ids: Vec<DbId>,
    /// Rules skipped because they could not be interpreted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected_rules: Vec<RuleRejection>,
}

/// The rule table as read for one evaluation.
struct RuleSet {
    rules: Vec<AlertRule>,
    rejected: Vec<RuleRejection>,
    /// No rows at all, as opposed to rows that are inactive or unreadable.
    store_is_empty: bool,
}

/// Read every rule row, splitting off active rows that cannot be converted.
async fn load_rules(conn: &mut PgConnection) -> AppResult<RuleSet> {
    let rows = AlertRuleRepo::list(&mut *conn, None).await?;
    let mut rules = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();

    for row in &rows {
        match row.to_rule() {
            Ok(rule) => rules.push(rule),
            Err(e) if row.is_active => {
                tracing::warn!(rule_id = row.id, error = %e, "Skipping unreadable alert rule");
                rejected.push(RuleRejection::new(Some(row.id), &row.name, &e));
            }
            Err(e) => {
                tracing::debug!(rule_id = row.id, error = %e, "Inactive alert rule is unreadable");
            }
        }
    }

    Ok(RuleSet {
        rules,
        rejected,
        store_is_empty: rows.is_empty(),
    })
}

async fn evaluate_in(
    state: &AppState,
    conn: &mut PgConnection,
    rule_set: &RuleSet,
    measurement: &Measurement,
) -> AppResult<Evaluation> {
    let mut rejected = rule_set.rejected.clone();

    // Rows exist but none converted: the built-in rules must not stand in.
    if rule_set.rules.is_empty() && !rule_set.store_is_empty {
        return Ok(Evaluation {
            drafts: Vec::new(),
            rejected,
        });
    }

    let history: Vec<MeasurementSnapshot> = match state.evaluator.history_window(&rule_set.rules) {
        Some(window) => MeasurementRepo::history(
            &mut *conn,
            measurement.patient_id,
            measurement.measurement_time - window,
            measurement.measurement_time,
        )
        .await?
        .iter()
        .map(Measurement::to_snapshot)
        .collect(),
        None => Vec::new(),
    };

    let mut evaluation = state.evaluator.evaluate_with_history(
        &measurement.to_snapshot(),
        &rule_set.rules,
        &history,
    );
    rejected.append(&mut evaluation.rejected);
    evaluation.rejected = rejected;
    Ok(evaluation)
}

/// Evaluate a stored measurement without persisting anything.
pub async fn evaluate(state: &AppState, measurement: &Measurement) -> AppResult<Evaluation> {
    let mut conn = state.pool.acquire().await?;
    let rule_set = load_rules(&mut *conn).await?;
    evaluate_in(state, &mut *conn, &rule_set, measurement).await
}

async fn record_in(
    state: &AppState,
    conn: &mut PgConnection,
    rule_set: &RuleSet,
    device_id: DbId,
    input: &CreateMeasurement,
) -> AppResult<(IngestOutcome, Vec<Alert>)> {
    let measurement = MeasurementRepo::create(&mut *conn, device_id, input).await?;
    tracing::debug!(
        measurement_id = measurement.id,
        patient_id = measurement.patient_id,
        device_id,
        "Measurement stored",
    );

    let evaluation = evaluate_in(state, conn, rule_set, &measurement).await?;
    let alerts = AlertRepo::create_from_drafts(conn, &evaluation.drafts).await?;

    let outcome = IngestOutcome {
        alert_ids: alerts.iter().map(|a| a.id).collect(),
        measurement,
        rejected_rules: evaluation.rejected,
    };
    Ok((outcome, alerts))
}

fn log_raised(alerts: &[Alert]) {
    for alert in alerts {
        tracing::info!(
            alert_id = alert.id,
            patient_id = alert.patient_id,
            measurement_id = ?alert.triggered_by_measurement_id,
            alert_type = %alert.alert_type,
            severity = %alert.severity,
            "Alert raised",
        );
    }
}

/// Store one measurement and the alerts it raises, atomically.
pub async fn record(
    state: &AppState,
    device_id: DbId,
    input: &CreateMeasurement,
) -> AppResult<IngestOutcome> {
    let mut tx = state.pool.begin().await?;
    let rule_set = load_rules(&mut *tx).await?;
    let (outcome, alerts) = record_in(state, &mut *tx, &rule_set, device_id, input).await?;
    tx.commit().await?;

    log_raised(&alerts);
    Ok(outcome)
}

/// Store a batch of measurements and their alerts in one transaction.
///
/// Items are stored and evaluated in order, so a later item's sustained
/// rules see the earlier items as history.
pub async fn record_batch(
    state: &AppState,
    items: &[(DbId, &CreateMeasurement)],
) -> AppResult<Vec<IngestOutcome>> {
    let mut tx = state.pool.begin().await?;
    let rule_set = load_rules(&mut *tx).await?;

    let mut outcomes = Vec::with_capacity(items.len());
    let mut raised = Vec::new();
    for (device_id, input) in items {
        let (outcome, mut alerts) = record_in(state, &mut *tx, &rule_set, *device_id, input).await?;
        outcomes.push(outcome);
        raised.append(&mut alerts);
    }
    tx.commit().await?;

    tracing::info!(
        count = outcomes.len(),
        alerts = raised.len(),
        "Measurement batch recorded",
    );
    log_raised(&raised);
    Ok(outcomes)
}
