//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`PipelineEvent`]s. It is
//! shared via `Arc<EventBus>` between the pipeline and any consumers.

use chrono::{DateTime, Utc};
use dreamreel_core::entry::Stage;
use dreamreel_core::types::EntryId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// A stage was claimed and its upstream job submitted.
pub const STAGE_STARTED: &str = "stage.started";
/// A stage resolved with a URL or playback reference.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// A stage resolved as failed (upstream failure, submission error, timeout).
pub const STAGE_FAILED: &str = "stage.failed";
/// The entry has a playback reference.
pub const ENTRY_READY: &str = "entry.ready";
pub const ENTRY_FAILED: &str = "entry.failed";

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// Something that happened to one entry.
///
/// Built with [`PipelineEvent::new`] and enriched with
/// [`with_stage`](PipelineEvent::with_stage) and
/// [`with_payload`](PipelineEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// Dot-separated event name, e.g. `"stage.completed"`.
    pub event_type: String,

    pub entry_id: EntryId,

    /// The stage concerned, for `stage.*` events.
    pub stage: Option<Stage>,

    /// Event-specific data (handle, URL, failure reason).
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl PipelineEvent {
    pub fn new(event_type: impl Into<String>, entry_id: EntryId) -> Self {
        Self {
            event_type: event_type.into(),
            entry_id,
            stage: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use dreamreel_events::bus::{EventBus, PipelineEvent, ENTRY_READY};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(PipelineEvent::new(ENTRY_READY, dreamreel_core::types::new_entry_id()));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unread events are dropped and slow
    /// receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Dropped if there are none.
    pub fn publish(&self, event: PipelineEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
