//! Rule evaluation engine.
//!
//! Pure logic, no database access. The caller loads the active rules (and,
//! for sustained rules, the patient's recent measurements) and persists the
//! returned drafts.

use serde::Serialize;
use serde_json::json;

use crate::alert::AlertDraft;
use crate::measurement::{MeasurementSnapshot, Reading, VitalParameter};

use super::condition::Condition;
use super::config::EvaluatorConfig;
use super::rule::{AlertRule, RuleRejection};

/// Result of evaluating one measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    /// One draft per matching rule, in rule order.
    pub drafts: Vec<AlertDraft>,
    /// Rules that were skipped because their condition is malformed.
    pub rejected: Vec<RuleRejection>,
}

impl Evaluation {
    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    config: EvaluatorConfig,
    fallback_rules: Vec<AlertRule>,
}

impl RuleEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        let fallback_rules = config.thresholds.default_rules();
        Self {
            config,
            fallback_rules,
        }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate `measurement` against `rules` using the instantaneous reading
    /// only. Sustained rules never fire without history.
    pub fn evaluate(&self, measurement: &MeasurementSnapshot, rules: &[AlertRule]) -> Evaluation {
        self.evaluate_with_history(measurement, rules, &[])
    }

    /// Evaluate `measurement` against `rules`, consulting `history` for rules
    /// that declare a `duration_minutes` window.
    ///
    /// `history` may contain the measurement itself and readings of other
    /// patients; both are ignored.
    pub fn evaluate_with_history(
        &self,
        measurement: &MeasurementSnapshot,
        rules: &[AlertRule],
        history: &[MeasurementSnapshot],
    ) -> Evaluation {
        let mut evaluation = Evaluation::default();

        for rule in self.effective_rules(rules) {
            let condition = match Condition::parse(&rule.condition, self.config.max_duration_minutes)
            {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(
                        rule_id = ?rule.id,
                        rule_name = %rule.name,
                        error = %e,
                        "Skipping malformed alert rule",
                    );
                    evaluation
                        .rejected
                        .push(RuleRejection::new(rule.id, &rule.name, &e));
                    continue;
                }
            };

            let parameter = condition.parameter();
            let Some(reading) = measurement.reading(parameter) else {
                continue;
            };
            if !condition.matches(reading) {
                continue;
            }
            if let Some(minutes) = condition.duration_minutes() {
                if !sustained(&condition, measurement, history, minutes) {
                    continue;
                }
            }

            evaluation
                .drafts
                .push(build_draft(rule, &condition, measurement, reading));
        }

        evaluation
    }

    /// Longest sustained window among the active, well-formed rules, i.e.
    /// how far back the caller must load history. `None` when no rule needs
    /// history.
    pub fn history_window(&self, rules: &[AlertRule]) -> Option<chrono::Duration> {
        self.effective_rules(rules)
            .filter_map(|r| Condition::parse(&r.condition, self.config.max_duration_minutes).ok())
            .filter_map(|c| c.duration_minutes())
            .max()
            .map(|m| chrono::Duration::minutes(i64::from(m)))
    }

    /// The built-in rules stand in only for an empty rule store. A store
    /// whose rules are all inactive evaluates to nothing.
    fn effective_rules<'a>(&'a self, rules: &'a [AlertRule]) -> impl Iterator<Item = &'a AlertRule> {
        let source = if rules.is_empty() && self.config.fallback_to_defaults {
            self.fallback_rules.as_slice()
        } else {
            rules
        };
        source.iter().filter(|r| r.is_active)
    }
}

/// True when every earlier reading of the same patient and parameter inside
/// `[t - minutes, t)` also matches, and there is at least one such reading.
fn sustained(
    condition: &Condition,
    measurement: &MeasurementSnapshot,
    history: &[MeasurementSnapshot],
    minutes: u32,
) -> bool {
    let parameter = condition.parameter();
    let end = measurement.measurement_time;
    let start = end - chrono::Duration::minutes(i64::from(minutes));

    let mut prior = history
        .iter()
        .filter(|h| h.patient_id == measurement.patient_id)
        .filter(|h| h.measurement_id != measurement.measurement_id)
        .filter(|h| h.measurement_time >= start && h.measurement_time < end)
        .filter_map(|h| h.reading(parameter))
        .peekable();

    if prior.peek().is_none() {
        return false;
    }
    prior.all(|r| condition.matches(r))
}

fn with_unit(parameter: VitalParameter, reading: Reading) -> String {
    match (reading, parameter.unit()) {
        (Reading::Flag(b), _) => b.to_string(),
        (Reading::Number(n), "") => n.to_string(),
        (Reading::Number(n), "%") => format!("{n}%"),
        (Reading::Number(n), unit) => format!("{n} {unit}"),
    }
}

fn build_draft(
    rule: &AlertRule,
    condition: &Condition,
    measurement: &MeasurementSnapshot,
    reading: Reading,
) -> AlertDraft {
    let parameter = condition.parameter();
    let duration = condition.duration_minutes();

    let title = match reading {
        Reading::Flag(_) => rule.name.clone(),
        Reading::Number(_) => format!("{}: {}", rule.name, with_unit(parameter, reading)),
    };

    let mut description = format!(
        "{parameter} reading of {} is {}",
        with_unit(parameter, reading),
        condition.describe()
    );
    if let Some(minutes) = duration {
        description.push_str(&format!(" for at least {minutes} minutes"));
    }

    let mut alert_data = json!({
        "measurement_id": measurement.measurement_id,
        "measurement_time": measurement.measurement_time,
        "parameter": parameter,
        "operator": condition.operator(),
        "observed": reading,
        "threshold": condition.threshold_json(),
        "rule_id": rule.id,
        "rule_name": rule.name,
    });
    if let Some(minutes) = duration {
        alert_data["duration_minutes"] = json!(minutes);
    }

    AlertDraft {
        patient_id: measurement.patient_id,
        alert_type: rule.alert_type,
        severity: rule.severity,
        title,
        description: Some(description),
        alert_data,
        rule_id: rule.id,
        triggered_by_measurement_id: Some(measurement.measurement_id),
        observed_at: measurement.measurement_time,
    }
}
