//! Repository for the `entries` table.
//!
//! Every stage transition is one conditional `UPDATE ... WHERE <col> IS NULL
//! RETURNING ...` statement, so concurrent callers cannot both win a claim
//! and a slot can never be written twice.

use dreamreel_core::entry::{Prompts, Resolution, Stage};
use dreamreel_core::error::CoreError;
use dreamreel_core::types::{new_entry_id, EntryId, Timestamp};
use sqlx::PgPool;

use crate::models::entry::{EntryListQuery, EntryRow};
use crate::store::StoreError;

/// Column list for `entries` queries.
const COLUMNS: &str = "\
    id, first_image_prompt, last_image_prompt, video_prompt, \
    first_image_claimed_at, first_image_handle, first_image_url, first_image_error, first_image_resolved_at, \
    last_image_claimed_at, last_image_handle, last_image_url, last_image_error, last_image_resolved_at, \
    video_claimed_at, video_handle, video_url, video_error, video_resolved_at, \
    publish_claimed_at, publish_handle, playback_id, playback_url, publish_error, publish_resolved_at, \
    featured, created_at, updated_at";

/// Provides the conditional writes behind [`PgEntryStore`](crate::PgEntryStore).
pub struct EntryRepo;

impl EntryRepo {
    /// Insert a new entry with every stage unstarted.
    pub async fn insert(pool: &PgPool, prompts: &Prompts) -> Result<EntryRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO entries (id, first_image_prompt, last_image_prompt, video_prompt) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EntryRow>(&query)
            .bind(new_entry_id())
            .bind(&prompts.first_image)
            .bind(&prompts.last_image)
            .bind(&prompts.video)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: EntryId) -> Result<Option<EntryRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM entries WHERE id = $1");
        sqlx::query_as::<_, EntryRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List entries newest first, optionally filtered by `featured` and by
    /// whether a playback reference exists.
    pub async fn list(pool: &PgPool, params: &EntryListQuery) -> Result<Vec<EntryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM entries \
             WHERE ($1::BOOLEAN IS NULL OR featured = $1) \
               AND ($2::BOOLEAN IS NULL OR (playback_id IS NOT NULL) = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, EntryRow>(&query)
            .bind(params.featured)
            .bind(params.ready)
            .bind(params.clamped_limit())
            .bind(params.clamped_offset())
            .fetch_all(pool)
            .await
    }

    /// Set `<stage>_claimed_at` if it is still NULL.
    ///
    /// Returns `None` if another caller already claimed the stage.
    pub async fn claim_stage(
        pool: &PgPool,
        id: EntryId,
        stage: Stage,
        at: Timestamp,
    ) -> Result<Option<EntryRow>, sqlx::Error> {
        let prefix = stage.as_str();
        let query = format!(
            "UPDATE entries \
             SET {prefix}_claimed_at = $2, updated_at = NOW() \
             WHERE id = $1 AND {prefix}_claimed_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EntryRow>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Set `<stage>_handle` if it is still NULL.
    pub async fn record_handle(
        pool: &PgPool,
        id: EntryId,
        stage: Stage,
        handle: &str,
    ) -> Result<Option<EntryRow>, sqlx::Error> {
        let prefix = stage.as_str();
        let query = format!(
            "UPDATE entries \
             SET {prefix}_handle = $2, updated_at = NOW() \
             WHERE id = $1 AND {prefix}_handle IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EntryRow>(&query)
            .bind(id)
            .bind(handle)
            .fetch_optional(pool)
            .await
    }

    /// Write the terminal result of `stage` if `<stage>_resolved_at` is NULL.
    ///
    /// Rejects resolutions whose shape does not fit the stage.
    pub async fn resolve_stage(
        pool: &PgPool,
        id: EntryId,
        stage: Stage,
        resolution: &Resolution,
    ) -> Result<Option<EntryRow>, StoreError> {
        let is_publish = stage == Stage::Publish;
        let row = match resolution {
            Resolution::Url(url) if !is_publish => {
                Self::resolve_media(pool, id, stage, Some(url.as_str()), None).await?
            }
            Resolution::Failed(reason) if !is_publish => {
                Self::resolve_media(pool, id, stage, None, Some(reason.as_str())).await?
            }
            Resolution::Playback(p) if is_publish => {
                Self::resolve_publish(
                    pool,
                    id,
                    Some((p.playback_id.as_str(), p.playback_url.as_str())),
                    None,
                )
                .await?
            }
            Resolution::Failed(reason) => {
                Self::resolve_publish(pool, id, None, Some(reason.as_str())).await?
            }
            Resolution::Url(_) | Resolution::Playback(_) => {
                return Err(CoreError::Internal(format!(
                    "resolution does not fit the {stage} stage"
                ))
                .into());
            }
        };
        Ok(row)
    }

    async fn resolve_media(
        pool: &PgPool,
        id: EntryId,
        stage: Stage,
        url: Option<&str>,
        error: Option<&str>,
    ) -> Result<Option<EntryRow>, sqlx::Error> {
        let prefix = stage.as_str();
        let query = format!(
            "UPDATE entries \
             SET {prefix}_url = $2, {prefix}_error = $3, \
                 {prefix}_resolved_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND {prefix}_resolved_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EntryRow>(&query)
            .bind(id)
            .bind(url)
            .bind(error)
            .fetch_optional(pool)
            .await
    }

    async fn resolve_publish(
        pool: &PgPool,
        id: EntryId,
        playback: Option<(&str, &str)>,
        error: Option<&str>,
    ) -> Result<Option<EntryRow>, sqlx::Error> {
        let query = format!(
            "UPDATE entries \
             SET playback_id = $2, playback_url = $3, publish_error = $4, \
                 publish_resolved_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND publish_resolved_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EntryRow>(&query)
            .bind(id)
            .bind(playback.map(|(playback_id, _)| playback_id))
            .bind(playback.map(|(_, playback_url)| playback_url))
            .bind(error)
            .fetch_optional(pool)
            .await
    }

    /// Set the `featured` flag. Returns `None` if the entry does not exist.
    pub async fn set_featured(
        pool: &PgPool,
        id: EntryId,
        featured: bool,
    ) -> Result<Option<EntryRow>, sqlx::Error> {
        let query = format!(
            "UPDATE entries SET featured = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EntryRow>(&query)
            .bind(id)
            .bind(featured)
            .fetch_optional(pool)
            .await
    }
}
