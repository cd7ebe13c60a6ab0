//! The storage seam used by the pipeline.

use async_trait::async_trait;
use dreamreel_core::entry::{Entry, Prompts, Resolution, Stage};
use dreamreel_core::error::CoreError;
use dreamreel_core::types::{EntryId, Timestamp};

use crate::models::entry::EntryListQuery;

/// Errors from an [`EntryStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A write was rejected by the domain rules (e.g. wrong resolution shape).
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Durable record of entries, keyed by [`EntryId`].
///
/// Every mutating method is a single atomic conditional write. It returns
/// `Some(entry)` with the updated entry when the write was applied and `None`
/// when its condition did not hold (already claimed, handle already set, slot
/// already resolved, or the entry does not exist). Callers that get `None`
/// re-read with [`EntryStore::find`] to learn the current state.
///
/// Implementations must never apply a claim twice for the same stage: this is
/// the exclusivity primitive that stops concurrent reconciliations from
/// submitting duplicate upstream jobs.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Insert a new entry with no stage started.
    async fn create(&self, prompts: Prompts) -> Result<Entry, StoreError>;

    async fn find(&self, id: EntryId) -> Result<Option<Entry>, StoreError>;

    /// List entries newest first.
    async fn list(&self, query: &EntryListQuery) -> Result<Vec<Entry>, StoreError>;

    /// Set the started marker of `stage` if it is not set yet.
    async fn claim_stage(
        &self,
        id: EntryId,
        stage: Stage,
        at: Timestamp,
    ) -> Result<Option<Entry>, StoreError>;

    /// Record the upstream handle of `stage` if none is recorded yet.
    async fn record_handle(
        &self,
        id: EntryId,
        stage: Stage,
        handle: &str,
    ) -> Result<Option<Entry>, StoreError>;

    /// Write the terminal result of `stage` if it is still pending.
    async fn resolve_stage(
        &self,
        id: EntryId,
        stage: Stage,
        resolution: &Resolution,
    ) -> Result<Option<Entry>, StoreError>;

    /// Set or clear the gallery `featured` flag.
    async fn set_featured(&self, id: EntryId, featured: bool)
        -> Result<Option<Entry>, StoreError>;
}
