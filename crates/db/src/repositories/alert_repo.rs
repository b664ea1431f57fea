//! Repository for the `alerts` table.
//!
//! Alerts are never deleted. Status changes go through
//! [`AlertRepo::apply_transition`], which only succeeds while the row is
//! still in the status the transition was computed from.

use pulsewatch_core::alert::{AlertAction, AlertDraft, AlertStatus};
use pulsewatch_core::alert_lifecycle::AlertTransition;
use pulsewatch_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use pulsewatch_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::alert::{Alert, AlertFilter, AlertStats, CreateAlert};
use crate::models::LabelCount;

const COLUMNS: &str = "id, patient_id, alert_type, severity, title, description, alert_data, \
    status, rule_id, triggered_by_measurement_id, acknowledged_by, acknowledged_at, \
    acknowledgment_notes, resolved_by, resolved_at, resolution_notes, dismissed_by, dismissed_at, \
    dismissal_notes, created_at, updated_at";

/// Status values that count as "open" in listings and counters.
pub(crate) fn open_statuses() -> Vec<&'static str> {
    AlertStatus::OPEN.iter().map(|s| s.as_str()).collect()
}

/// Provides persistence for alerts.
pub struct AlertRepo;

impl AlertRepo {
    /// Persist an evaluator draft as a new `active` alert.
    pub async fn create_from_draft<'e>(
        executor: impl PgExecutor<'e>,
        draft: &AlertDraft,
    ) -> Result<Alert, sqlx::Error> {
        let query = format!(
            "INSERT INTO alerts (patient_id, alert_type, severity, title, description, \
                alert_data, rule_id, triggered_by_measurement_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(draft.patient_id)
            .bind(draft.alert_type.as_str())
            .bind(draft.severity.as_str())
            .bind(&draft.title)
            .bind(&draft.description)
            .bind(Json(&draft.alert_data))
            .bind(draft.rule_id)
            .bind(draft.triggered_by_measurement_id)
            .fetch_one(executor)
            .await
    }

    /// Persist several drafts on one connection, in order.
    ///
    /// Callers pass a transaction so the alerts commit together with
    /// whatever produced them.
    pub async fn create_from_drafts(
        conn: &mut PgConnection,
        drafts: &[AlertDraft],
    ) -> Result<Vec<Alert>, sqlx::Error> {
        let mut results = Vec::with_capacity(drafts.len());
        for draft in drafts {
            results.push(Self::create_from_draft(&mut *conn, draft).await?);
        }
        Ok(results)
    }

    /// Persist an operator-created alert. It has no triggering measurement.
    pub async fn create_manual(pool: &PgPool, input: &CreateAlert) -> Result<Alert, sqlx::Error> {
        let query = format!(
            "INSERT INTO alerts (patient_id, alert_type, severity, title, description, alert_data)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(input.patient_id)
            .bind(input.alert_type.as_str())
            .bind(input.severity.as_str())
            .bind(input.title.trim())
            .bind(&input.description)
            .bind(input.alert_data.as_ref().map(Json))
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alerts WHERE id = $1");
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List alerts newest first.
    ///
    /// Resolved and dismissed alerts are hidden unless the filter sets
    /// `include_resolved` or asks for a specific status.
    pub async fn list(pool: &PgPool, filter: &AlertFilter) -> Result<Vec<Alert>, sqlx::Error> {
        let open_only = filter.status.is_none() && !filter.include_resolved;
        let query = format!(
            "SELECT {COLUMNS} FROM alerts
             WHERE ($1::BIGINT IS NULL OR patient_id = $1)
               AND ($2::TEXT IS NULL OR alert_type = $2)
               AND ($3::TEXT IS NULL OR severity = $3)
               AND ($4::TEXT IS NULL OR status = $4)
               AND (NOT $5 OR status = ANY($6))
               AND ($7::TIMESTAMPTZ IS NULL OR created_at >= $7)
               AND ($8::TIMESTAMPTZ IS NULL OR created_at <= $8)
             ORDER BY created_at DESC, id DESC
             LIMIT $9 OFFSET $10"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(filter.patient_id)
            .bind(filter.alert_type.map(|t| t.as_str()))
            .bind(filter.severity.map(|s| s.as_str()))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(open_only)
            .bind(open_statuses())
            .bind(filter.start)
            .bind(filter.end)
            .bind(clamp_limit(filter.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT))
            .bind(clamp_offset(filter.offset))
            .fetch_all(pool)
            .await
    }

    /// Number of alerts still needing attention (active or acknowledged).
    pub async fn count_open(pool: &PgPool, patient_id: Option<DbId>) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM alerts
             WHERE status = ANY($1) AND ($2::BIGINT IS NULL OR patient_id = $2)",
        )
        .bind(open_statuses())
        .bind(patient_id)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// Alert totals grouped by type, status and severity since `since`.
    pub async fn stats(pool: &PgPool, since: Timestamp) -> Result<AlertStats, sqlx::Error> {
        let grouped = |column: &str| {
            format!(
                "SELECT {column} AS label, COUNT(*) AS count FROM alerts
                 WHERE created_at >= $1
                 GROUP BY {column}
                 ORDER BY count DESC, label"
            )
        };

        let by_type: Vec<LabelCount> = sqlx::query_as(&grouped("alert_type"))
            .bind(since)
            .fetch_all(pool)
            .await?;
        let by_status: Vec<LabelCount> = sqlx::query_as(&grouped("status"))
            .bind(since)
            .fetch_all(pool)
            .await?;
        let by_severity: Vec<LabelCount> = sqlx::query_as(&grouped("severity"))
            .bind(since)
            .fetch_all(pool)
            .await?;

        let total: i64 = by_status.iter().map(|c| c.count).sum();
        let active: i64 = by_status
            .iter()
            .filter(|c| c.label == AlertStatus::Active.as_str())
            .map(|c| c.count)
            .sum();

        Ok(AlertStats {
            since,
            total,
            active,
            by_type,
            by_status,
            by_severity,
        })
    }

    /// Persist a lifecycle transition, guarded on `transition.from`.
    ///
    /// Returns `None` when the row no longer has the expected status (or no
    /// longer exists); the caller re-reads and re-validates.
    pub async fn apply_transition(
        pool: &PgPool,
        id: DbId,
        transition: &AlertTransition,
    ) -> Result<Option<Alert>, sqlx::Error> {
        let (by, at, notes) = match transition.action {
            AlertAction::Acknowledge => ("acknowledged_by", "acknowledged_at", "acknowledgment_notes"),
            AlertAction::Resolve => ("resolved_by", "resolved_at", "resolution_notes"),
            AlertAction::Dismiss => ("dismissed_by", "dismissed_at", "dismissal_notes"),
        };
        let query = format!(
            "UPDATE alerts SET
                status = $3,
                {by} = $4,
                {at} = $5,
                {notes} = $6
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .bind(transition.from.as_str())
            .bind(transition.to.as_str())
            .bind(transition.stamp.actor)
            .bind(transition.stamp.at)
            .bind(&transition.stamp.notes)
            .fetch_optional(pool)
            .await
    }
}
