//! Route definitions for the `/devices` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::device;
use crate::state::AppState;

/// Routes mounted at `/devices`.
///
/// ```text
/// GET    /                    -> list
/// POST   /                    -> create
/// GET    /stats               -> stats
/// POST   /offline-check       -> offline_check
/// GET    /{id}                -> get_by_id
/// PUT    /{id}                -> update
/// DELETE /{id}                -> delete (retire)
/// POST   /{id}/sync           -> sync
/// GET    /{id}/measurements   -> list_measurements
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(device::list).post(device::create))
        .route("/stats", get(device::stats))
        .route("/offline-check", post(device::offline_check))
        .route(
            "/{id}",
            get(device::get_by_id)
                .put(device::update)
                .delete(device::delete),
        )
        .route("/{id}/sync", post(device::sync))
        .route("/{id}/measurements", get(device::list_measurements))
}
