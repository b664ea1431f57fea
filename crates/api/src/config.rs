use std::str::FromStr;

use pulsewatch_core::alerting::{
    EvaluatorConfig, VitalThresholds, DEFAULT_MAX_DURATION_MINUTES, DEFAULT_OFFLINE_AFTER_HOURS,
};

/// A configuration variable that is set but cannot be parsed.
#[derive(Debug, thiserror::Error)]
#[error("{key} must be a valid {expected}, got '{value}'")]
pub struct ConfigError {
    pub key: &'static str,
    pub expected: &'static str,
    pub value: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Grace period for in-flight requests on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Insert the built-in rules when `alert_rules` is empty at startup.
    pub seed_default_rules: bool,
    /// Rule evaluator settings and clinical default thresholds.
    pub evaluator: EvaluatorConfig,
    /// Hours without a sync before a device is reported offline.
    pub device_offline_after_hours: u32,
    /// Period of the background offline check; `0` disables it.
    pub device_offline_check_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                            | Default                 |
    /// |------------------------------------|-------------------------|
    /// | `HOST`                             | `0.0.0.0`               |
    /// | `PORT`                             | `3000`                  |
    /// | `CORS_ORIGINS`                     | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`             | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`            | `30`                    |
    /// | `SEED_DEFAULT_RULES`               | `true`                  |
    /// | `ALERT_FALLBACK_TO_DEFAULTS`       | `true`                  |
    /// | `MAX_RULE_DURATION_MINUTES`        | `1440`                  |
    /// | `HEART_RATE_ALERT_THRESHOLD_LOW`   | `40`                    |
    /// | `HEART_RATE_ALERT_THRESHOLD_HIGH`  | `120`                   |
    /// | `BLOOD_PRESSURE_SYSTOLIC_HIGH`     | `140`                   |
    /// | `BLOOD_PRESSURE_DIASTOLIC_HIGH`    | `90`                    |
    /// | `BLOOD_OXYGEN_LOW`                 | `92`                    |
    /// | `TEMPERATURE_HIGH`                 | `38.0`                  |
    /// | `GLUCOSE_LOW`                      | `70`                    |
    /// | `GLUCOSE_HIGH`                     | `180`                   |
    /// | `DEVICE_OFFLINE_HOURS`             | `24`                    |
    /// | `DEVICE_OFFLINE_CHECK_INTERVAL_SECS` | `900` (`0` disables)  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup: &lookup };
        let defaults = VitalThresholds::default();

        let thresholds = VitalThresholds {
            heart_rate_low: env.parse_or(
                "HEART_RATE_ALERT_THRESHOLD_LOW",
                "number",
                defaults.heart_rate_low,
            )?,
            heart_rate_high: env.parse_or(
                "HEART_RATE_ALERT_THRESHOLD_HIGH",
                "number",
                defaults.heart_rate_high,
            )?,
            systolic_high: env.parse_or(
                "BLOOD_PRESSURE_SYSTOLIC_HIGH",
                "number",
                defaults.systolic_high,
            )?,
            diastolic_high: env.parse_or(
                "BLOOD_PRESSURE_DIASTOLIC_HIGH",
                "number",
                defaults.diastolic_high,
            )?,
            blood_oxygen_low: env.parse_or("BLOOD_OXYGEN_LOW", "number", defaults.blood_oxygen_low)?,
            temperature_high: env.parse_or("TEMPERATURE_HIGH", "number", defaults.temperature_high)?,
            glucose_low: env.parse_or("GLUCOSE_LOW", "number", defaults.glucose_low)?,
            glucose_high: env.parse_or("GLUCOSE_HIGH", "number", defaults.glucose_high)?,
        };

        let evaluator = EvaluatorConfig {
            thresholds,
            fallback_to_defaults: env.parse_or("ALERT_FALLBACK_TO_DEFAULTS", "bool", true)?,
            max_duration_minutes: env.parse_or(
                "MAX_RULE_DURATION_MINUTES",
                "u32",
                DEFAULT_MAX_DURATION_MINUTES,
            )?,
        };

        let cors_origins = env
            .get("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: env.get("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: env.parse_or("PORT", "u16", 3000)?,
            cors_origins,
            request_timeout_secs: env.parse_or("REQUEST_TIMEOUT_SECS", "u64", 30)?,
            shutdown_timeout_secs: env.parse_or("SHUTDOWN_TIMEOUT_SECS", "u64", 30)?,
            seed_default_rules: env.parse_or("SEED_DEFAULT_RULES", "bool", true)?,
            evaluator,
            device_offline_after_hours: env.parse_or(
                "DEVICE_OFFLINE_HOURS",
                "u32",
                DEFAULT_OFFLINE_AFTER_HOURS,
            )?,
            device_offline_check_interval_secs: env.parse_or(
                "DEVICE_OFFLINE_CHECK_INTERVAL_SECS",
                "u64",
                900,
            )?,
        })
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse_or<T: FromStr>(
        &self,
        key: &'static str,
        expected: &'static str,
        default: T,
    ) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|_| ConfigError {
                key,
                expected,
                value,
            }),
        }
    }
}
