use std::net::SocketAddr;
use std::time::Duration;

use pulsewatch_api::app::build_app;
use pulsewatch_api::background;
use pulsewatch_api::config::ServerConfig;
use pulsewatch_api::state::AppState;
use pulsewatch_db::repositories::AlertRuleRepo;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulsewatch_api=debug,pulsewatch_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid configuration");
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = pulsewatch_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    pulsewatch_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    pulsewatch_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Default rules ---
    if config.seed_default_rules {
        let existing = AlertRuleRepo::count(&pool)
            .await
            .expect("Failed to count alert rules");
        if existing == 0 {
            let defaults = config.evaluator.thresholds.default_rules();
            let inserted = AlertRuleRepo::seed(&pool, &defaults)
                .await
                .expect("Failed to seed default alert rules");
            tracing::info!(inserted, "Seeded default alert rules");
        }
    }

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let offline_check_period = Duration::from_secs(config.device_offline_check_interval_secs);

    // --- Router ---
    let state = AppState::new(pool.clone(), config);
    let app = build_app(state.clone()).expect("Invalid CORS origin");

    // --- Background jobs ---
    let background_cancel = CancellationToken::new();
    let offline_handle = if offline_check_period.is_zero() {
        tracing::info!("Device offline check disabled");
        None
    } else {
        Some(tokio::spawn(background::device_offline::run(
            state,
            offline_check_period,
            background_cancel.clone(),
        )))
    };

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    background_cancel.cancel();
    if let Some(handle) = offline_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        tracing::info!("Device offline check stopped");
    }

    tracing::info!("Server stopped accepting connections, closing database pool");
    if tokio::time::timeout(shutdown_timeout, pool.close()).await.is_err() {
        tracing::warn!(
            timeout_secs = shutdown_timeout.as_secs(),
            "Database pool did not close within the shutdown timeout"
        );
    }
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
