//! Handlers for entries: creation, the Status Endpoint, the explicit stage
//! initiators and the gallery.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use dreamreel_core::entry::{Entry, Stage};
use dreamreel_core::error::CoreError;
use dreamreel_core::types::{EntryId, Timestamp};
use dreamreel_db::models::entry::EntryListQuery;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Request body for `POST /api/v1/entries`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    pub first_image_prompt: String,
    pub last_image_prompt: String,
    /// May be blank; a default transition prompt is used for the video.
    #[serde(default)]
    pub video_prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEntry {
    pub entry_id: EntryId,
}

/// One entry as shown in the gallery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: EntryId,
    pub first_image_prompt: String,
    pub last_image_prompt: String,
    pub video_prompt: String,
    pub first_image_url: Option<String>,
    pub last_image_url: Option<String>,
    pub playback_id: Option<String>,
    pub playback_url: Option<String>,
    pub featured: bool,
    pub created_at: Timestamp,
}

impl From<Entry> for GalleryItem {
    fn from(entry: Entry) -> Self {
        let first_image_url = entry.url(Stage::FirstImage).map(str::to_string);
        let last_image_url = entry.url(Stage::LastImage).map(str::to_string);
        let (playback_id, playback_url) = match entry.playback() {
            Some(p) => (Some(p.playback_id.clone()), Some(p.playback_url.clone())),
            None => (None, None),
        };
        Self {
            id: entry.id,
            first_image_prompt: entry.prompts.first_image,
            last_image_prompt: entry.prompts.last_image,
            video_prompt: entry.prompts.video,
            first_image_url,
            last_image_url,
            playback_id,
            playback_url,
            featured: entry.featured,
            created_at: entry.created_at,
        }
    }
}

fn entry_not_found(id: EntryId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "entry",
        id: id.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// POST /api/v1/entries
///
/// Store a new entry. No stage is started.
pub async fn create_entry(
    State(state): State<AppState>,
    Json(input): Json<CreateEntryRequest>,
) -> AppResult<impl IntoResponse> {
    let entry = state
        .pipeline
        .create_entry(
            &input.first_image_prompt,
            &input.last_image_prompt,
            &input.video_prompt,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedEntry { entry_id: entry.id },
        }),
    ))
}

/// GET /api/v1/entries/{id}/status
///
/// Runs one reconciliation pass and returns the resulting snapshot.
pub async fn entry_status(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> AppResult<impl IntoResponse> {
    let snapshot = state.pipeline.reconcile(id).await?;
    Ok(Json(DataResponse { data: snapshot }))
}

/// POST /api/v1/entries/{id}/images
pub async fn start_images(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> AppResult<impl IntoResponse> {
    let snapshot = state.pipeline.start_images(id).await?;
    Ok(Json(DataResponse { data: snapshot }))
}

/// POST /api/v1/entries/{id}/video
///
/// 409 until both images have URLs.
pub async fn start_video(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> AppResult<impl IntoResponse> {
    let snapshot = state.pipeline.start_video(id).await?;
    Ok(Json(DataResponse { data: snapshot }))
}

/// POST /api/v1/entries/{id}/publish
///
/// 409 until the video has a URL.
pub async fn start_publish(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> AppResult<impl IntoResponse> {
    let snapshot = state.pipeline.start_publish(id).await?;
    Ok(Json(DataResponse { data: snapshot }))
}

// ---------------------------------------------------------------------------
// Gallery
// ---------------------------------------------------------------------------

/// GET /api/v1/entries
///
/// Newest first. Supports `featured`, `ready`, `limit` and `offset`.
pub async fn list_entries(
    State(state): State<AppState>,
    Query(params): Query<EntryListQuery>,
) -> AppResult<impl IntoResponse> {
    let entries = state.store().list(&params).await?;
    let items: Vec<GalleryItem> = entries.into_iter().map(GalleryItem::from).collect();
    Ok(Json(DataResponse { data: items }))
}

/// POST /api/v1/entries/{id}/featured
///
/// Only entries with a playback reference can be featured.
pub async fn feature_entry(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> AppResult<impl IntoResponse> {
    let entry = state
        .store()
        .find(id)
        .await?
        .ok_or_else(|| entry_not_found(id))?;

    if entry.playback().is_none() {
        return Err(AppError::Core(CoreError::Conflict(
            "only ready entries can be featured".into(),
        )));
    }

    let entry = state
        .store()
        .set_featured(id, true)
        .await?
        .ok_or_else(|| entry_not_found(id))?;

    tracing::info!(entry_id = %id, "Entry featured");

    Ok(Json(DataResponse {
        data: GalleryItem::from(entry),
    }))
}

/// DELETE /api/v1/entries/{id}/featured
pub async fn unfeature_entry(
    State(state): State<AppState>,
    Path(id): Path<EntryId>,
) -> AppResult<impl IntoResponse> {
    let entry = state
        .store()
        .set_featured(id, false)
        .await?
        .ok_or_else(|| entry_not_found(id))?;

    tracing::info!(entry_id = %id, "Entry unfeatured");

    Ok(Json(DataResponse {
        data: GalleryItem::from(entry),
    }))
}
