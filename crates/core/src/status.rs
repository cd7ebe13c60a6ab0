//! Derived pipeline status and the snapshot returned to polling clients.
//!
//! Status is never stored authoritatively: [`derive_status`] recomputes it
//! from the slots every time, so the stored slots stay the single source of
//! truth.

use serde::{Deserialize, Serialize};

use crate::entry::{Entry, Stage};
use crate::types::EntryId;

// ---------------------------------------------------------------------------
// PipelineStatus
// ---------------------------------------------------------------------------

/// Coarse state of an entry, ordered left to right. `Failed` can be reached
/// from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    AwaitingImages,
    ImagesReady,
    AwaitingVideo,
    VideoReady,
    AwaitingPublish,
    Ready,
    Failed,
}

impl PipelineStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStatus::Ready | PipelineStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStatus::AwaitingImages => "awaiting_images",
            PipelineStatus::ImagesReady => "images_ready",
            PipelineStatus::AwaitingVideo => "awaiting_video",
            PipelineStatus::VideoReady => "video_ready",
            PipelineStatus::AwaitingPublish => "awaiting_publish",
            PipelineStatus::Ready => "ready",
            PipelineStatus::Failed => "failed",
        }
    }

    /// Parse the snake_case name used in query strings.
    pub fn parse(value: &str) -> Option<Self> {
        [
            PipelineStatus::AwaitingImages,
            PipelineStatus::ImagesReady,
            PipelineStatus::AwaitingVideo,
            PipelineStatus::VideoReady,
            PipelineStatus::AwaitingPublish,
            PipelineStatus::Ready,
            PipelineStatus::Failed,
        ]
        .into_iter()
        .find(|status| status.as_str() == value)
    }
}

/// Status plus, for failed entries, which stage failed and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedStatus {
    pub status: PipelineStatus,
    pub failed_stage: Option<Stage>,
    pub reason: Option<String>,
}

/// Compute the status of `entry` from its slots.
///
/// A failed slot anywhere wins; otherwise the furthest stage reached decides.
/// A stage counts as started as soon as it is claimed, even before its
/// upstream handle is recorded.
pub fn derive_status(entry: &Entry) -> DerivedStatus {
    if let Some((stage, reason)) = entry.first_failure() {
        return DerivedStatus {
            status: PipelineStatus::Failed,
            failed_stage: Some(stage),
            reason: Some(reason.to_string()),
        };
    }

    let status = if entry.playback().is_some() {
        PipelineStatus::Ready
    } else if entry.is_started(Stage::Publish) {
        PipelineStatus::AwaitingPublish
    } else if entry.url(Stage::Video).is_some() {
        PipelineStatus::VideoReady
    } else if entry.is_started(Stage::Video) {
        PipelineStatus::AwaitingVideo
    } else if entry.image_urls().is_some() {
        PipelineStatus::ImagesReady
    } else {
        PipelineStatus::AwaitingImages
    };

    DerivedStatus {
        status,
        failed_stage: None,
        reason: None,
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Normalized view of an entry returned by every reconciliation.
///
/// Contains no timestamps, so two reconciliations with no upstream change
/// serialize identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub entry_id: EntryId,
    pub status: PipelineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Snapshot {
    pub fn from_entry(entry: &Entry) -> Self {
        let derived = derive_status(entry);
        let playback = entry.playback();
        Self {
            entry_id: entry.id,
            status: derived.status,
            first_image_url: entry.url(Stage::FirstImage).map(str::to_string),
            last_image_url: entry.url(Stage::LastImage).map(str::to_string),
            video_url: entry.url(Stage::Video).map(str::to_string),
            playback_id: playback.map(|p| p.playback_id.clone()),
            playback_url: playback.map(|p| p.playback_url.clone()),
            failed_stage: derived.failed_stage,
            reason: derived.reason,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
