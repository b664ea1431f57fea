//! Route definitions for the `/alerts` resource.
//!
//! Alerts are never deleted; they leave the open set through the lifecycle
//! actions.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::alert;
use crate::state::AppState;

/// Routes mounted at `/alerts`.
///
/// ```text
/// GET    /                   -> list
/// POST   /                   -> create (manual)
/// GET    /active/count       -> active_count
/// GET    /stats              -> stats
/// GET    /{id}               -> get_by_id
/// POST   /{id}/acknowledge   -> acknowledge
/// POST   /{id}/resolve       -> resolve
/// POST   /{id}/dismiss       -> dismiss
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(alert::list).post(alert::create))
        .route("/active/count", get(alert::active_count))
        .route("/stats", get(alert::stats))
        .route("/{id}", get(alert::get_by_id))
        .route("/{id}/acknowledge", post(alert::acknowledge))
        .route("/{id}/resolve", post(alert::resolve))
        .route("/{id}/dismiss", post(alert::dismiss))
}
