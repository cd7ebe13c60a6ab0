//! Process-local [`EntryStore`] for tests and local demos.
//!
//! All conditional writes run under one write lock, which gives them the
//! same compare-and-set semantics as the PostgreSQL statements. Nothing
//! survives a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dreamreel_core::entry::{Entry, Prompts, Resolution, Stage};
use dreamreel_core::error::CoreError;
use dreamreel_core::types::{new_entry_id, EntryId, Timestamp};
use tokio::sync::RwLock;

use crate::models::entry::EntryListQuery;
use crate::store::{EntryStore, StoreError};

#[derive(Default)]
pub struct MemoryEntryStore {
    entries: RwLock<HashMap<EntryId, Entry>>,
    writes: AtomicU64,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes that actually changed an entry (creates included).
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Run `apply` against the entry under the write lock and return the
    /// updated entry if it reported a change.
    async fn update<F>(&self, id: EntryId, apply: F) -> Result<Option<Entry>, StoreError>
    where
        F: FnOnce(&mut Entry) -> Result<bool, CoreError>,
    {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(&id) else {
            return Ok(None);
        };
        if !apply(entry)? {
            return Ok(None);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Some(entry.clone()))
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn create(&self, prompts: Prompts) -> Result<Entry, StoreError> {
        let entry = Entry::new(new_entry_id(), prompts, Utc::now());
        self.entries.write().await.insert(entry.id, entry.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(entry)
    }

    async fn find(&self, id: EntryId) -> Result<Option<Entry>, StoreError> {
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn list(&self, query: &EntryListQuery) -> Result<Vec<Entry>, StoreError> {
        let entries = self.entries.read().await;
        let mut matching: Vec<Entry> = entries
            .values()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matching
            .into_iter()
            .skip(query.clamped_offset() as usize)
            .take(query.clamped_limit() as usize)
            .collect())
    }

    async fn claim_stage(
        &self,
        id: EntryId,
        stage: Stage,
        at: Timestamp,
    ) -> Result<Option<Entry>, StoreError> {
        self.update(id, |entry| Ok(entry.apply_claim(stage, at))).await
    }

    async fn record_handle(
        &self,
        id: EntryId,
        stage: Stage,
        handle: &str,
    ) -> Result<Option<Entry>, StoreError> {
        self.update(id, |entry| Ok(entry.apply_handle(stage, handle, Utc::now())))
            .await
    }

    async fn resolve_stage(
        &self,
        id: EntryId,
        stage: Stage,
        resolution: &Resolution,
    ) -> Result<Option<Entry>, StoreError> {
        self.update(id, |entry| {
            entry.apply_resolution(stage, resolution, Utc::now())
        })
        .await
    }

    async fn set_featured(
        &self,
        id: EntryId,
        featured: bool,
    ) -> Result<Option<Entry>, StoreError> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(&id) else {
            return Ok(None);
        };
        if entry.featured != featured {
            entry.featured = featured;
            entry.updated_at = Utc::now();
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(Some(entry.clone()))
    }
}
