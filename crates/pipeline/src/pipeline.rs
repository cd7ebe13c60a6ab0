//! The [`Pipeline`] service object and the writes shared by the reconciler
//! and the stage initiators.

use std::sync::Arc;

use dreamreel_core::entry::{Entry, Resolution, Stage};
use dreamreel_core::error::CoreError;
use dreamreel_core::status::Snapshot;
use dreamreel_core::types::EntryId;
use dreamreel_core::validation::validate_prompts;
use dreamreel_db::EntryStore;
use dreamreel_events::bus::{
    ENTRY_FAILED, ENTRY_READY, STAGE_COMPLETED, STAGE_FAILED, STAGE_STARTED,
};
use dreamreel_events::{EventBus, PipelineEvent};
use dreamreel_providers::Providers;

use crate::config::PipelineConfig;
use crate::error::PipelineError;

/// Orchestrates entries through image, video and publish stages.
///
/// Holds no per-entry state: everything it knows about an entry is read
/// from the [`EntryStore`] at the start of each operation, so any number of
/// `Pipeline` instances (or processes) can work on the same entries.
pub struct Pipeline {
    pub(crate) store: Arc<dyn EntryStore>,
    pub(crate) providers: Providers,
    pub(crate) events: Arc<EventBus>,
    pub(crate) config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn EntryStore>,
        providers: Providers,
        events: Arc<EventBus>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            providers,
            events,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validate the prompts and store a new entry. Starts no stage.
    pub async fn create_entry(
        &self,
        first_image_prompt: &str,
        last_image_prompt: &str,
        video_prompt: &str,
    ) -> Result<Entry, PipelineError> {
        let prompts = validate_prompts(first_image_prompt, last_image_prompt, video_prompt)?;
        let entry = self.store.create(prompts).await?;
        tracing::info!(entry_id = %entry.id, "Entry created");
        Ok(entry)
    }

    /// The stored snapshot of an entry, without contacting any provider.
    pub async fn snapshot(&self, id: EntryId) -> Result<Snapshot, PipelineError> {
        Ok(Snapshot::from_entry(&self.load(id).await?))
    }

    pub(crate) async fn load(&self, id: EntryId) -> Result<Entry, PipelineError> {
        self.store.find(id).await?.ok_or_else(|| {
            CoreError::NotFound {
                entity: "entry",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// Write the terminal result of `stage`.
    ///
    /// If another caller resolved the slot first, the stored value wins and
    /// the current entry is re-read.
    pub(crate) async fn resolve(
        &self,
        entry: Entry,
        stage: Stage,
        resolution: Resolution,
    ) -> Result<Entry, PipelineError> {
        match self.store.resolve_stage(entry.id, stage, &resolution).await? {
            Some(updated) => {
                self.announce_resolution(&updated, stage, &resolution);
                Ok(updated)
            }
            None => {
                tracing::debug!(
                    entry_id = %entry.id,
                    stage = %stage,
                    "Slot already resolved by another caller",
                );
                self.load(entry.id).await
            }
        }
    }

    // ---- events ----

    pub(crate) fn announce_started(&self, entry_id: EntryId, stage: Stage, handle: &str) {
        self.events.publish(
            PipelineEvent::new(STAGE_STARTED, entry_id)
                .with_stage(stage)
                .with_payload(serde_json::json!({ "handle": handle })),
        );
    }

    fn announce_resolution(&self, entry: &Entry, stage: Stage, resolution: &Resolution) {
        let (event_type, payload) = match resolution {
            Resolution::Url(url) => (STAGE_COMPLETED, serde_json::json!({ "url": url })),
            Resolution::Playback(p) => (
                STAGE_COMPLETED,
                serde_json::json!({ "playbackId": p.playback_id, "playbackUrl": p.playback_url }),
            ),
            Resolution::Failed(reason) => (STAGE_FAILED, serde_json::json!({ "reason": reason })),
        };

        match resolution {
            Resolution::Failed(reason) => tracing::warn!(
                entry_id = %entry.id,
                stage = %stage,
                reason = %reason,
                "Stage failed",
            ),
            _ => tracing::info!(entry_id = %entry.id, stage = %stage, "Stage completed"),
        }

        self.events.publish(
            PipelineEvent::new(event_type, entry.id)
                .with_stage(stage)
                .with_payload(payload.clone()),
        );

        match resolution {
            Resolution::Playback(_) => {
                self.events
                    .publish(PipelineEvent::new(ENTRY_READY, entry.id).with_payload(payload));
            }
            // Only the write that failed the entry first announces it.
            Resolution::Failed(reason) if failed_slots(entry) == 1 => {
                self.events.publish(
                    PipelineEvent::new(ENTRY_FAILED, entry.id)
                        .with_stage(stage)
                        .with_payload(serde_json::json!({ "reason": reason })),
                );
            }
            _ => {}
        }
    }
}

fn failed_slots(entry: &Entry) -> usize {
    Stage::ALL
        .into_iter()
        .filter(|&stage| entry.failure(stage).is_some())
        .count()
}
