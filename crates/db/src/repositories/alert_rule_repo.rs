//! Repository for the `alert_rules` table.

use pulsewatch_core::alerting;
use pulsewatch_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};

use crate::models::alert_rule::{AlertRule, CreateAlertRule, UpdateAlertRule};

const COLUMNS: &str =
    "id, name, description, alert_type, severity, condition, is_active, created_at, updated_at";

/// Provides CRUD operations for alert rules.
pub struct AlertRuleRepo;

impl AlertRuleRepo {
    /// Insert a rule. The caller validates the condition first.
    pub async fn create(pool: &PgPool, input: &CreateAlertRule) -> Result<AlertRule, sqlx::Error> {
        let query = format!(
            "INSERT INTO alert_rules (name, description, alert_type, severity, condition, is_active)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, TRUE))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRule>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.alert_type.as_str())
            .bind(input.severity.as_str())
            .bind(Json(&input.condition))
            .bind(input.is_active)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AlertRule>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alert_rules WHERE id = $1");
        sqlx::query_as::<_, AlertRule>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List rules by id, optionally filtered by `is_active`.
    ///
    /// Ingest reads the whole table in one query so an evaluation sees a
    /// consistent snapshot, and can tell an empty store from an inactive one.
    pub async fn list<'e>(
        executor: impl PgExecutor<'e>,
        is_active: Option<bool>,
    ) -> Result<Vec<AlertRule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alert_rules
             WHERE ($1::BOOLEAN IS NULL OR is_active = $1)
             ORDER BY id"
        );
        sqlx::query_as::<_, AlertRule>(&query)
            .bind(is_active)
            .fetch_all(executor)
            .await
    }

    /// Update a rule. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAlertRule,
    ) -> Result<Option<AlertRule>, sqlx::Error> {
        let query = format!(
            "UPDATE alert_rules SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                alert_type = COALESCE($4, alert_type),
                severity = COALESCE($5, severity),
                condition = COALESCE($6, condition),
                is_active = COALESCE($7, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlertRule>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.alert_type.map(|t| t.as_str()))
            .bind(input.severity.map(|s| s.as_str()))
            .bind(input.condition.as_ref().map(Json))
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a rule. Alerts it produced keep their payload and
    /// lose the `rule_id` link.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM alert_rules WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM alert_rules")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Insert built-in rules, skipping any whose name already exists.
    ///
    /// Returns the number of rows inserted.
    pub async fn seed(pool: &PgPool, rules: &[alerting::AlertRule]) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut inserted = 0;

        for rule in rules {
            let result = sqlx::query(
                "INSERT INTO alert_rules (name, alert_type, severity, condition, is_active)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (name) DO NOTHING",
            )
            .bind(&rule.name)
            .bind(rule.alert_type.as_str())
            .bind(rule.severity.as_str())
            .bind(Json(&rule.condition))
            .bind(rule.is_active)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                tracing::debug!(name = %rule.name, "Default rule already present, skipped");
            }
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }
}
