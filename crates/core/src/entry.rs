//! The generation entry and its per-stage slots.
//!
//! An [`Entry`] carries three immutable prompts and four [`Slot`]s, one per
//! [`Stage`]. Every slot moves strictly forward:
//!
//! ```text
//! not started -> claimed -> handle recorded -> resolved (done | failed)
//! ```
//!
//! The `apply_*` methods encode those one-way transitions. Each returns
//! `false` (and leaves the entry untouched) when the transition has already
//! happened, so replaying the same write is harmless. Store implementations
//! must give their conditional writes exactly these semantics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EntryId, Timestamp};

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One step of the fixed pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FirstImage,
    LastImage,
    Video,
    Publish,
}

impl Stage {
    /// Every stage, in dependency order.
    pub const ALL: [Stage; 4] = [
        Stage::FirstImage,
        Stage::LastImage,
        Stage::Video,
        Stage::Publish,
    ];

    /// The two leaf stages started together by the image initiator.
    pub const IMAGES: [Stage; 2] = [Stage::FirstImage, Stage::LastImage];

    /// Stable snake_case name, also used as the column prefix in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::FirstImage => "first_image",
            Stage::LastImage => "last_image",
            Stage::Video => "video",
            Stage::Publish => "publish",
        }
    }

    pub fn is_image(self) -> bool {
        matches!(self, Stage::FirstImage | Stage::LastImage)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// The three prompts an entry was created with. Never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompts {
    pub first_image: String,
    pub last_image: String,
    /// May be empty; see [`Prompts::video_or_default`].
    pub video: String,
}

impl Prompts {
    /// The video prompt to submit, falling back to
    /// [`DEFAULT_VIDEO_PROMPT`](crate::validation::DEFAULT_VIDEO_PROMPT).
    pub fn video_or_default(&self) -> &str {
        if self.video.trim().is_empty() {
            crate::validation::DEFAULT_VIDEO_PROMPT
        } else {
            &self.video
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome / Slot
// ---------------------------------------------------------------------------

/// Result held by a slot. Leaves `Pending` at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Pending,
    Done(T),
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending)
    }

    pub fn done(&self) -> Option<&T> {
        match self {
            Outcome::Done(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Outcome::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Playback reference returned by the hosting provider once an asset is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playback {
    pub playback_id: String,
    pub playback_url: String,
}

/// Persisted progress of one stage.
///
/// `claimed_at` is the "started" marker. It is set before the upstream
/// submission so that at most one caller ever submits; `handle` follows once
/// the provider accepts the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot<T> {
    pub claimed_at: Option<Timestamp>,
    pub handle: Option<String>,
    pub outcome: Outcome<T>,
    pub resolved_at: Option<Timestamp>,
}

impl<T> Slot<T> {
    pub fn empty() -> Self {
        Self {
            claimed_at: None,
            handle: None,
            outcome: Outcome::Pending,
            resolved_at: None,
        }
    }

    pub fn is_started(&self) -> bool {
        self.claimed_at.is_some()
    }

    pub fn is_resolved(&self) -> bool {
        !self.outcome.is_pending()
    }

    fn claim(&mut self, at: Timestamp) -> bool {
        if self.claimed_at.is_some() {
            return false;
        }
        self.claimed_at = Some(at);
        true
    }

    fn record_handle(&mut self, handle: &str) -> bool {
        if self.handle.is_some() {
            return false;
        }
        self.handle = Some(handle.to_string());
        true
    }

    fn resolve(&mut self, outcome: Outcome<T>, at: Timestamp) -> bool {
        if self.is_resolved() {
            return false;
        }
        self.outcome = outcome;
        self.resolved_at = Some(at);
        true
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// A terminal fact learned about a stage, written once into its slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An image or video job produced a media URL.
    Url(String),
    /// The publish stage produced a playback reference.
    Playback(Playback),
    /// The stage failed; the string is the recorded reason.
    Failed(String),
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One generation request and everything learned about it so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub prompts: Prompts,
    pub first_image: Slot<String>,
    pub last_image: Slot<String>,
    pub video: Slot<String>,
    pub publish: Slot<Playback>,
    pub featured: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Entry {
    /// A freshly created entry: prompts only, no stage started.
    pub fn new(id: EntryId, prompts: Prompts, now: Timestamp) -> Self {
        Self {
            id,
            prompts,
            first_image: Slot::empty(),
            last_image: Slot::empty(),
            video: Slot::empty(),
            publish: Slot::empty(),
            featured: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// The URL-producing slot for `stage`, or `None` for [`Stage::Publish`].
    pub fn media_slot(&self, stage: Stage) -> Option<&Slot<String>> {
        match stage {
            Stage::FirstImage => Some(&self.first_image),
            Stage::LastImage => Some(&self.last_image),
            Stage::Video => Some(&self.video),
            Stage::Publish => None,
        }
    }

    fn media_slot_mut(&mut self, stage: Stage) -> Option<&mut Slot<String>> {
        match stage {
            Stage::FirstImage => Some(&mut self.first_image),
            Stage::LastImage => Some(&mut self.last_image),
            Stage::Video => Some(&mut self.video),
            Stage::Publish => None,
        }
    }

    pub fn claimed_at(&self, stage: Stage) -> Option<Timestamp> {
        match self.media_slot(stage) {
            Some(slot) => slot.claimed_at,
            None => self.publish.claimed_at,
        }
    }

    pub fn is_started(&self, stage: Stage) -> bool {
        self.claimed_at(stage).is_some()
    }

    pub fn handle(&self, stage: Stage) -> Option<&str> {
        match self.media_slot(stage) {
            Some(slot) => slot.handle.as_deref(),
            None => self.publish.handle.as_deref(),
        }
    }

    pub fn is_resolved(&self, stage: Stage) -> bool {
        match self.media_slot(stage) {
            Some(slot) => slot.is_resolved(),
            None => self.publish.is_resolved(),
        }
    }

    /// Failure reason recorded for `stage`, if it failed.
    pub fn failure(&self, stage: Stage) -> Option<&str> {
        match self.media_slot(stage) {
            Some(slot) => slot.outcome.failure(),
            None => self.publish.outcome.failure(),
        }
    }

    /// Media URL of an image/video stage once it completed.
    pub fn url(&self, stage: Stage) -> Option<&str> {
        self.media_slot(stage)
            .and_then(|slot| slot.outcome.done())
            .map(String::as_str)
    }

    /// Both keyframe URLs, only once both image stages completed.
    pub fn image_urls(&self) -> Option<(&str, &str)> {
        Some((self.url(Stage::FirstImage)?, self.url(Stage::LastImage)?))
    }

    pub fn playback(&self) -> Option<&Playback> {
        self.publish.outcome.done()
    }

    /// The first failed stage (in dependency order) and its reason.
    pub fn first_failure(&self) -> Option<(Stage, &str)> {
        Stage::ALL
            .into_iter()
            .find_map(|stage| self.failure(stage).map(|reason| (stage, reason)))
    }

    /// Set the started marker. `false` if the stage was already claimed.
    pub fn apply_claim(&mut self, stage: Stage, at: Timestamp) -> bool {
        let applied = match self.media_slot_mut(stage) {
            Some(slot) => slot.claim(at),
            None => self.publish.claim(at),
        };
        if applied {
            self.updated_at = at;
        }
        applied
    }

    /// Record the upstream handle. `false` if one is already recorded.
    pub fn apply_handle(&mut self, stage: Stage, handle: &str, at: Timestamp) -> bool {
        let applied = match self.media_slot_mut(stage) {
            Some(slot) => slot.record_handle(handle),
            None => self.publish.record_handle(handle),
        };
        if applied {
            self.updated_at = at;
        }
        applied
    }

    /// Write a terminal result. `Ok(false)` if the slot is already resolved.
    ///
    /// Rejects resolutions whose shape does not fit the stage (a playback
    /// reference for an image, a URL for publish).
    pub fn apply_resolution(
        &mut self,
        stage: Stage,
        resolution: &Resolution,
        at: Timestamp,
    ) -> Result<bool, CoreError> {
        let applied = match (stage, resolution) {
            (Stage::Publish, Resolution::Playback(playback)) => self
                .publish
                .resolve(Outcome::Done(playback.clone()), at),
            (Stage::Publish, Resolution::Failed(reason)) => {
                self.publish.resolve(Outcome::Failed(reason.clone()), at)
            }
            (Stage::Publish, Resolution::Url(_)) => {
                return Err(CoreError::Internal(
                    "publish stage cannot resolve to a media URL".to_string(),
                ));
            }
            (_, Resolution::Playback(_)) => {
                return Err(CoreError::Internal(format!(
                    "{stage} stage cannot resolve to a playback reference"
                )));
            }
            (_, Resolution::Url(url)) => self
                .media_slot_mut(stage)
                .is_some_and(|slot| slot.resolve(Outcome::Done(url.clone()), at)),
            (_, Resolution::Failed(reason)) => self
                .media_slot_mut(stage)
                .is_some_and(|slot| slot.resolve(Outcome::Failed(reason.clone()), at)),
        };
        if applied {
            self.updated_at = at;
        }
        Ok(applied)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
