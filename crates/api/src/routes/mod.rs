pub mod entries;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /entries                     list (gallery), create
/// /entries/{id}/status         reconcile and report
/// /entries/{id}/images         start both image stages
/// /entries/{id}/video          start the video stage
/// /entries/{id}/publish        start the publish stage
/// /entries/{id}/featured       feature (POST), unfeature (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/entries", entries::router())
}
