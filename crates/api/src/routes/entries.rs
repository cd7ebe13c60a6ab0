//! Route definitions for entries, mounted at `/entries`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::entries;
use crate::state::AppState;

/// ```text
/// GET    /                  -> list_entries
/// POST   /                  -> create_entry
/// GET    /{id}/status       -> entry_status
/// POST   /{id}/images       -> start_images
/// POST   /{id}/video        -> start_video
/// POST   /{id}/publish      -> start_publish
/// POST   /{id}/featured     -> feature_entry
/// DELETE /{id}/featured     -> unfeature_entry
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(entries::list_entries).post(entries::create_entry))
        .route("/{id}/status", get(entries::entry_status))
        .route("/{id}/images", post(entries::start_images))
        .route("/{id}/video", post(entries::start_video))
        .route("/{id}/publish", post(entries::start_publish))
        .route(
            "/{id}/featured",
            post(entries::feature_entry).delete(entries::unfeature_entry),
        )
}
