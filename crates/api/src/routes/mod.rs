pub mod alert;
pub mod alert_rule;
pub mod device;
pub mod health;
pub mod measurement;
pub mod patient;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /patients                              list, create
/// /patients/{id}                         get, update, deactivate
/// /patients/{id}/devices                 devices of a patient
/// /patients/{id}/measurements            measurements of a patient
/// /patients/{id}/alerts                  alerts of a patient
///
/// /devices                               list, register
/// /devices/{id}                          get, update, retire
/// /devices/{id}/sync                     record a sync (POST)
///
/// /measurements                          list, record (evaluates rules)
/// /measurements/batch                    record many (POST)
/// /measurements/{id}                     get
/// /measurements/{id}/evaluate            dry-run evaluation (POST)
///
/// /alerts                                list, create manual alert
/// /alerts/active/count                   open alert count
/// /alerts/stats                          aggregate counts
/// /alerts/{id}                           get
/// /alerts/{id}/acknowledge               acknowledge (POST)
/// /alerts/{id}/resolve                   resolve (POST)
/// /alerts/{id}/dismiss                   dismiss (POST)
///
/// /alert-rules                           list, create
/// /alert-rules/{id}                      get, update, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/patients", patient::router())
        .nest("/devices", device::router())
        .nest("/measurements", measurement::router())
        .nest("/alerts", alert::router())
        .nest("/alert-rules", alert_rule::router())
}
