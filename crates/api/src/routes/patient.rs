//! Route definitions for the `/patients` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::patient;
use crate::state::AppState;

/// Routes mounted at `/patients`.
///
/// ```text
/// GET    /                          -> list
/// POST   /                          -> create
/// GET    /stats                     -> stats
/// GET    /{id}                      -> get_by_id
/// PUT    /{id}                      -> update
/// DELETE /{id}                      -> delete (deactivate)
/// GET    /{id}/devices              -> list_devices
/// GET    /{id}/measurements         -> list_measurements
/// GET    /{id}/measurements/stats   -> measurement_stats
/// GET    /{id}/alerts               -> list_alerts
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(patient::list).post(patient::create))
        .route("/stats", get(patient::stats))
        .route(
            "/{id}",
            get(patient::get_by_id)
                .put(patient::update)
                .delete(patient::delete),
        )
        .route("/{id}/devices", get(patient::list_devices))
        .route("/{id}/measurements", get(patient::list_measurements))
        .route("/{id}/measurements/stats", get(patient::measurement_stats))
        .route("/{id}/alerts", get(patient::list_alerts))
}
