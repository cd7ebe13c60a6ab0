//! Pipeline Reconciler: one pass of checking and advancing an entry against
//! upstream reality.
//!
//! A pass runs strictly in dependency order:
//!
//! 1. poll both image slots,
//! 2. start the video stage once both images have URLs,
//! 3. poll the video slot,
//! 4. start the publish stage once the video has a URL,
//! 5. poll the publish slot,
//!
//! and returns the snapshot derived from what is stored afterwards. Each step
//! is guarded by the stored slots, never by in-memory state, so passes may
//! overlap and a pass cut short by a crash loses nothing.
//!
//! A pass starts at most one new stage. When it does, it stops there and
//! reports the status the entry had just before the start; the new job is
//! first polled, and shown as awaiting, on the next pass.

use chrono::Utc;
use dreamreel_core::entry::{Entry, Resolution, Stage};
use dreamreel_core::status::{derive_status, Snapshot};
use dreamreel_core::types::{EntryId, Timestamp};
use dreamreel_providers::{JobStatus, PublishStatus};

use crate::error::PipelineError;
use crate::initiators::{is_eligible, StartOutcome};
use crate::pipeline::Pipeline;

/// Failure reason recorded for a slot that stayed pending too long.
pub const TIMEOUT_REASON: &str = "timeout";

/// Where a pass stands after trying to start a stage.
enum Step {
    Continue(Entry),
    /// This pass started a stage (or failed to) and ends with this snapshot.
    Finished(Snapshot),
}

impl Pipeline {
    /// Run one reconciliation pass for `id` and return its snapshot.
    ///
    /// Upstream poll errors are logged and leave the slot pending; only store
    /// errors (and a missing entry) are returned as errors. A slot is timed
    /// out only after its job was polled and still is not finished.
    pub async fn reconcile(&self, id: EntryId) -> Result<Snapshot, PipelineError> {
        self.reconcile_at(id, Utc::now()).await
    }

    /// [`reconcile`](Self::reconcile) with an explicit clock, which decides
    /// pending-age timeouts and stamps new claims.
    pub async fn reconcile_at(&self, id: EntryId, now: Timestamp) -> Result<Snapshot, PipelineError> {
        let mut entry = self.load(id).await?;
        if derive_status(&entry).status.is_terminal() {
            return Ok(Snapshot::from_entry(&entry));
        }

        for stage in Stage::IMAGES {
            entry = self.advance_job(entry, stage, now).await?;
        }

        entry = match self.advance_into(entry, Stage::Video, now).await? {
            Step::Continue(entry) => entry,
            Step::Finished(snapshot) => return Ok(snapshot),
        };
        entry = self.advance_job(entry, Stage::Video, now).await?;

        entry = match self.advance_into(entry, Stage::Publish, now).await? {
            Step::Continue(entry) => entry,
            Step::Finished(snapshot) => return Ok(snapshot),
        };
        entry = self.advance_publish(entry, now).await?;

        Ok(Snapshot::from_entry(&entry))
    }

    /// Start `stage` if its inputs are ready and it has not been started.
    async fn advance_into(&self, entry: Entry, stage: Stage, now: Timestamp) -> Result<Step, PipelineError> {
        if entry.first_failure().is_some() || entry.is_started(stage) || !is_eligible(&entry, stage) {
            return Ok(Step::Continue(entry));
        }
        let before = Snapshot::from_entry(&entry);
        let (entry, outcome) = self.start_stage(entry, stage, now).await?;
        Ok(match outcome {
            StartOutcome::Started => Step::Finished(before),
            StartOutcome::SubmissionFailed => Step::Finished(Snapshot::from_entry(&entry)),
            // Lost the claim: the winner submits, this pass carries on.
            StartOutcome::AlreadyStarted => Step::Continue(entry),
        })
    }

    /// Whether the claim on `stage` is older than its pending-age ceiling.
    fn timed_out(&self, entry: &Entry, stage: Stage, now: Timestamp) -> bool {
        let Some(claimed_at) = entry.claimed_at(stage) else {
            return false;
        };
        let ceiling = self.config.timeouts.for_stage(stage);
        (now - claimed_at)
            .to_std()
            .is_ok_and(|age| age > ceiling)
    }

    /// Mark `stage` failed if it is still pending past its ceiling.
    ///
    /// Only called once the provider has had its say: a job that finished
    /// while nobody was polling keeps its result.
    async fn expire_if_stale(&self, entry: Entry, stage: Stage, now: Timestamp) -> Result<Entry, PipelineError> {
        if !self.timed_out(&entry, stage, now) {
            return Ok(entry);
        }
        self.resolve(entry, stage, Resolution::Failed(TIMEOUT_REASON.to_string()))
            .await
    }

    /// The handle to poll for `stage`, or `None` if there is nothing to poll.
    ///
    /// A slot that was claimed but never got a handle has no job to ask
    /// about, so it only goes through the timeout check.
    async fn pollable(
        &self,
        entry: Entry,
        stage: Stage,
        now: Timestamp,
    ) -> Result<(Entry, Option<String>), PipelineError> {
        if entry.first_failure().is_some() || !entry.is_started(stage) || entry.is_resolved(stage) {
            return Ok((entry, None));
        }
        match entry.handle(stage).map(str::to_string) {
            Some(handle) => Ok((entry, Some(handle))),
            // The claimer is still submitting, or crashed before recording.
            None => Ok((self.expire_if_stale(entry, stage, now).await?, None)),
        }
    }

    /// Poll a generation slot and record a terminal answer.
    async fn advance_job(&self, entry: Entry, stage: Stage, now: Timestamp) -> Result<Entry, PipelineError> {
        let (entry, handle) = self.pollable(entry, stage, now).await?;
        let Some(handle) = handle else {
            return Ok(entry);
        };

        let client = if stage.is_image() {
            &self.providers.images
        } else {
            &self.providers.videos
        };

        match client.poll(&handle).await {
            Ok(JobStatus::Pending) => self.expire_if_stale(entry, stage, now).await,
            Ok(JobStatus::Completed { url }) => self.resolve(entry, stage, Resolution::Url(url)).await,
            Ok(JobStatus::Failed { reason }) => {
                self.resolve(entry, stage, Resolution::Failed(reason)).await
            }
            Err(e) => {
                tracing::warn!(
                    entry_id = %entry.id,
                    stage = %stage,
                    handle = %handle,
                    error = %e,
                    "Poll failed, slot stays pending",
                );
                self.expire_if_stale(entry, stage, now).await
            }
        }
    }

    /// Poll the publish slot and record a terminal answer.
    async fn advance_publish(&self, entry: Entry, now: Timestamp) -> Result<Entry, PipelineError> {
        let stage = Stage::Publish;
        let (entry, handle) = self.pollable(entry, stage, now).await?;
        let Some(handle) = handle else {
            return Ok(entry);
        };

        match self.providers.publisher.poll(&handle).await {
            Ok(PublishStatus::Pending) => self.expire_if_stale(entry, stage, now).await,
            Ok(PublishStatus::Ready(playback)) => {
                self.resolve(entry, stage, Resolution::Playback(playback)).await
            }
            Ok(PublishStatus::Failed { reason }) => {
                self.resolve(entry, stage, Resolution::Failed(reason)).await
            }
            Err(e) => {
                tracing::warn!(
                    entry_id = %entry.id,
                    handle = %handle,
                    error = %e,
                    "Publish poll failed, slot stays pending",
                );
                self.expire_if_stale(entry, stage, now).await
            }
        }
    }
}
