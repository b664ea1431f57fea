use axum::routing::get;
use axum::Router;

use crate::handlers::alert_rule;
use crate::state::AppState;

/// Routes mounted at `/alert-rules`.
///
/// ```text
/// GET    /       -> list
/// POST   /       -> create
/// GET    /{id}   -> get_by_id
/// PUT    /{id}   -> update
/// DELETE /{id}   -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(alert_rule::list).post(alert_rule::create))
        .route(
            "/{id}",
            get(alert_rule::get_by_id)
                .put(alert_rule::update)
                .delete(alert_rule::delete),
        )
}
