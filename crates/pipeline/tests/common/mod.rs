//! Shared fixtures: a pipeline over the in-memory store and fake providers.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dreamreel_core::entry::Entry;
use dreamreel_core::types::EntryId;
use dreamreel_db::{EntryStore, MemoryEntryStore};
use dreamreel_events::EventBus;
use dreamreel_pipeline::{Pipeline, PipelineConfig, RetryPolicy, StageTimeouts};
use dreamreel_providers::fake::{FakeJobClient, FakePublisher};
use dreamreel_providers::Providers;

pub const IMAGE_TIMEOUT: Duration = Duration::from_secs(60);
pub const VIDEO_TIMEOUT: Duration = Duration::from_secs(120);
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(90);

/// Stage timeouts that are easy to reason about and a retry policy that
/// does not slow tests down.
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        timeouts: StageTimeouts {
            image: IMAGE_TIMEOUT,
            video: VIDEO_TIMEOUT,
            publish: PUBLISH_TIMEOUT,
        },
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            multiplier: 2.0,
        },
    }
}

pub struct Harness {
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<MemoryEntryStore>,
    pub images: Arc<FakeJobClient>,
    pub videos: Arc<FakeJobClient>,
    pub publisher: Arc<FakePublisher>,
    pub events: Arc<EventBus>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_clients(FakeJobClient::new("img"), FakeJobClient::new("vid"))
    }

    pub fn with_clients(images: FakeJobClient, videos: FakeJobClient) -> Self {
        let store = Arc::new(MemoryEntryStore::new());
        let images = Arc::new(images);
        let videos = Arc::new(videos);
        let publisher = Arc::new(FakePublisher::new());
        let events = Arc::new(EventBus::default());

        let providers = Providers {
            images: images.clone(),
            videos: videos.clone(),
            publisher: publisher.clone(),
        };
        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            providers,
            events.clone(),
            test_config(),
        ));

        Self {
            pipeline,
            store,
            images,
            videos,
            publisher,
            events,
        }
    }

    /// Create an entry with prompts A / B / C.
    pub async fn create(&self) -> EntryId {
        self.pipeline.create_entry("A", "B", "C").await.unwrap().id
    }

    pub async fn entry(&self, id: EntryId) -> Entry {
        self.store.find(id).await.unwrap().unwrap()
    }

    /// Create an entry, start its images and let both complete.
    pub async fn entry_with_images(&self) -> EntryId {
        let id = self.create().await;
        self.pipeline.start_images(id).await.unwrap();
        self.images.complete_all().await;
        id
    }
}
