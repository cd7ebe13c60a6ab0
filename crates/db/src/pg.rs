//! PostgreSQL-backed [`EntryStore`].

use async_trait::async_trait;
use dreamreel_core::entry::{Entry, Prompts, Resolution, Stage};
use dreamreel_core::types::{EntryId, Timestamp};

use crate::models::entry::EntryListQuery;
use crate::repositories::EntryRepo;
use crate::store::{EntryStore, StoreError};
use crate::DbPool;

/// Production store: one row per entry, conditional `UPDATE`s for every
/// stage transition.
#[derive(Clone)]
pub struct PgEntryStore {
    pool: DbPool,
}

impl PgEntryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntryStore for PgEntryStore {
    async fn create(&self, prompts: Prompts) -> Result<Entry, StoreError> {
        let row = EntryRepo::insert(&self.pool, &prompts).await?;
        tracing::debug!(entry_id = %row.id, "Entry row inserted");
        Ok(row.into())
    }

    async fn find(&self, id: EntryId) -> Result<Option<Entry>, StoreError> {
        Ok(EntryRepo::find_by_id(&self.pool, id).await?.map(Entry::from))
    }

    async fn list(&self, query: &EntryListQuery) -> Result<Vec<Entry>, StoreError> {
        let rows = EntryRepo::list(&self.pool, query).await?;
        Ok(rows.into_iter().map(Entry::from).collect())
    }

    async fn claim_stage(
        &self,
        id: EntryId,
        stage: Stage,
        at: Timestamp,
    ) -> Result<Option<Entry>, StoreError> {
        Ok(EntryRepo::claim_stage(&self.pool, id, stage, at)
            .await?
            .map(Entry::from))
    }

    async fn record_handle(
        &self,
        id: EntryId,
        stage: Stage,
        handle: &str,
    ) -> Result<Option<Entry>, StoreError> {
        Ok(EntryRepo::record_handle(&self.pool, id, stage, handle)
            .await?
            .map(Entry::from))
    }

    async fn resolve_stage(
        &self,
        id: EntryId,
        stage: Stage,
        resolution: &Resolution,
    ) -> Result<Option<Entry>, StoreError> {
        Ok(EntryRepo::resolve_stage(&self.pool, id, stage, resolution)
            .await?
            .map(Entry::from))
    }

    async fn set_featured(
        &self,
        id: EntryId,
        featured: bool,
    ) -> Result<Option<Entry>, StoreError> {
        Ok(EntryRepo::set_featured(&self.pool, id, featured)
            .await?
            .map(Entry::from))
    }
}
