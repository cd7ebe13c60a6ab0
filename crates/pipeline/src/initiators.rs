//! Stage Initiators: start a stage at most once per entry.
//!
//! Starting is claim-then-submit. The claim is an atomic conditional write
//! of the slot's started marker, so exactly one caller wins it; only the
//! winner talks to the provider. Submission is retried with backoff, and
//! exhausted retries resolve the slot as `failed("submission_error: ...")`.

use chrono::Utc;
use dreamreel_core::entry::{Entry, Resolution, Stage};
use dreamreel_core::status::Snapshot;
use dreamreel_core::types::{EntryId, Timestamp};
use dreamreel_providers::{GenerationRequest, JobHandle, SubmissionError};

use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::retry::{retry_async, RetryOutcome};

/// Prefix of the failure reason recorded when every submission attempt failed.
pub const SUBMISSION_ERROR_REASON: &str = "submission_error";

/// What a call to start a stage did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// This call won the claim and the provider accepted the job.
    Started,
    /// The stage was already claimed, by this entry's history or a racing
    /// caller. Nothing was submitted.
    AlreadyStarted,
    /// This call won the claim but every submission attempt failed; the slot
    /// is now failed.
    SubmissionFailed,
}

/// Whether the inputs of `stage` exist on `entry`.
pub(crate) fn is_eligible(entry: &Entry, stage: Stage) -> bool {
    match stage {
        Stage::FirstImage | Stage::LastImage => true,
        Stage::Video => entry.image_urls().is_some(),
        Stage::Publish => entry.url(Stage::Video).is_some(),
    }
}

fn ineligible_reason(stage: Stage) -> &'static str {
    match stage {
        Stage::FirstImage | Stage::LastImage => "image stages have no prerequisites",
        Stage::Video => "both images must be ready",
        Stage::Publish => "the video must be ready",
    }
}

/// The upstream call that starts a stage.
enum Submission {
    Job(GenerationRequest),
    Publish { media_url: String },
}

impl Submission {
    fn for_stage(entry: &Entry, stage: Stage) -> Result<Self, PipelineError> {
        let submission = match stage {
            Stage::FirstImage => Submission::Job(GenerationRequest::Image {
                prompt: entry.prompts.first_image.clone(),
            }),
            Stage::LastImage => Submission::Job(GenerationRequest::Image {
                prompt: entry.prompts.last_image.clone(),
            }),
            Stage::Video => {
                let (first, last) = entry.image_urls().ok_or_else(|| {
                    PipelineError::InvariantViolation(format!(
                        "video submission for entry {} without both image URLs",
                        entry.id
                    ))
                })?;
                Submission::Job(GenerationRequest::Video {
                    prompt: entry.prompts.video_or_default().to_string(),
                    first_image_url: first.to_string(),
                    last_image_url: last.to_string(),
                })
            }
            Stage::Publish => {
                let media_url = entry.url(Stage::Video).ok_or_else(|| {
                    PipelineError::InvariantViolation(format!(
                        "publish submission for entry {} without a video URL",
                        entry.id
                    ))
                })?;
                Submission::Publish {
                    media_url: media_url.to_string(),
                }
            }
        };
        Ok(submission)
    }
}

impl Pipeline {
    /// Ensure both image jobs are submitted. Idempotent.
    ///
    /// The images go one after the other: once the entry has failed, the
    /// last image is not submitted.
    pub async fn start_images(&self, id: EntryId) -> Result<Snapshot, PipelineError> {
        let mut entry = self.load(id).await?;
        let now = Utc::now();
        for stage in Stage::IMAGES {
            if entry.first_failure().is_some() {
                break;
            }
            (entry, _) = self.start_stage(entry, stage, now).await?;
        }
        Ok(Snapshot::from_entry(&entry))
    }

    /// Ensure the video job is submitted.
    ///
    /// Fails with [`PipelineError::NotEligible`] while either image lacks a
    /// URL.
    pub async fn start_video(&self, id: EntryId) -> Result<Snapshot, PipelineError> {
        let entry = self.load(id).await?;
        let (entry, _) = self.start_stage(entry, Stage::Video, Utc::now()).await?;
        Ok(Snapshot::from_entry(&entry))
    }

    /// Ensure the video is submitted to the hosting provider.
    pub async fn start_publish(&self, id: EntryId) -> Result<Snapshot, PipelineError> {
        let entry = self.load(id).await?;
        let (entry, _) = self.start_stage(entry, Stage::Publish, Utc::now()).await?;
        Ok(Snapshot::from_entry(&entry))
    }

    /// Start a single stage and report what happened.
    pub async fn ensure_started(&self, id: EntryId, stage: Stage) -> Result<StartOutcome, PipelineError> {
        let entry = self.load(id).await?;
        let (_, outcome) = self.start_stage(entry, stage, Utc::now()).await?;
        Ok(outcome)
    }

    pub(crate) async fn start_stage(
        &self,
        entry: Entry,
        stage: Stage,
        now: Timestamp,
    ) -> Result<(Entry, StartOutcome), PipelineError> {
        if entry.is_started(stage) {
            return Ok((entry, StartOutcome::AlreadyStarted));
        }
        if let Some((failed, _)) = entry.first_failure() {
            return Err(PipelineError::NotEligible {
                stage,
                reason: format!("the entry failed at the {failed} stage"),
            });
        }
        if !is_eligible(&entry, stage) {
            return Err(PipelineError::NotEligible {
                stage,
                reason: ineligible_reason(stage).to_string(),
            });
        }
        let submission = Submission::for_stage(&entry, stage)?;

        let Some(claimed) = self.store.claim_stage(entry.id, stage, now).await? else {
            tracing::debug!(entry_id = %entry.id, stage = %stage, "Stage claimed by another caller");
            return Ok((self.load(entry.id).await?, StartOutcome::AlreadyStarted));
        };

        let label = format!("submit {stage}");
        let submission = &submission;
        let outcome = retry_async(&self.config.retry, &label, |_| async move {
            self.submit(stage, submission).await
        })
        .await;

        match outcome {
            RetryOutcome::Success { value: handle, attempts } => {
                let Some(entry) = self.store.record_handle(claimed.id, stage, &handle).await? else {
                    return Err(PipelineError::InvariantViolation(format!(
                        "{stage} handle of entry {} was recorded by a caller that did not claim it",
                        claimed.id
                    )));
                };
                tracing::info!(
                    entry_id = %entry.id,
                    stage = %stage,
                    handle = %handle,
                    attempts,
                    "Stage started",
                );
                self.announce_started(entry.id, stage, &handle);
                Ok((entry, StartOutcome::Started))
            }
            RetryOutcome::Exhausted { error, attempts } => {
                tracing::error!(
                    entry_id = %claimed.id,
                    stage = %stage,
                    attempts,
                    error = %error,
                    "Submission failed after retries",
                );
                let reason = format!("{SUBMISSION_ERROR_REASON}: {error}");
                let entry = self.resolve(claimed, stage, Resolution::Failed(reason)).await?;
                Ok((entry, StartOutcome::SubmissionFailed))
            }
        }
    }

    async fn submit(&self, stage: Stage, submission: &Submission) -> Result<JobHandle, SubmissionError> {
        match submission {
            Submission::Job(request) if stage.is_image() => self.providers.images.submit(request).await,
            Submission::Job(request) => self.providers.videos.submit(request).await,
            Submission::Publish { media_url } => self.providers.publisher.publish(media_url).await,
        }
    }
}
