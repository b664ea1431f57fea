use axum::routing::{get, post};
use axum::Router;

use crate::handlers::measurement;
use crate::state::AppState;

/// Routes mounted at `/measurements`.
///
/// ```text
/// GET    /                          -> list
/// POST   /                          -> create (evaluates rules)
/// POST   /batch                     -> create_batch
/// GET    /recent/patient/{patient_id} -> recent
/// GET    /{id}                      -> get_by_id
/// POST   /{id}/evaluate             -> evaluate (dry run)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(measurement::list).post(measurement::create))
        .route("/batch", post(measurement::create_batch))
        .route("/recent/patient/{patient_id}", get(measurement::recent))
        .route("/{id}", get(measurement::get_by_id))
        .route("/{id}/evaluate", post(measurement::evaluate))
}
