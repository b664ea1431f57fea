use std::sync::Arc;

use pulsewatch_core::alerting::RuleEvaluator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is a pool handle.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: pulsewatch_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Stateless rule evaluator shared across requests.
    pub evaluator: Arc<RuleEvaluator>,
}

impl AppState {
    pub fn new(pool: pulsewatch_db::DbPool, config: ServerConfig) -> Self {
        let evaluator = Arc::new(RuleEvaluator::new(config.evaluator.clone()));
        Self {
            pool,
            config: Arc::new(config),
            evaluator,
        }
    }
}
