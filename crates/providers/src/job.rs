//! Capability traits for the external generation and hosting providers.
//!
//! The pipeline only ever talks to providers through [`JobClient`] and
//! [`PublisherClient`]; concrete protocols live in [`crate::luma`] and
//! [`crate::mux`], and [`crate::fake`] scripts both for tests.

use async_trait::async_trait;
use dreamreel_core::entry::Playback;

use crate::error::{PollError, SubmissionError};

/// Opaque upstream job identifier returned by a submission.
pub type JobHandle = String;

/// Input of a generation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    Image {
        prompt: String,
    },
    /// A transition between two already generated images.
    Video {
        prompt: String,
        first_image_url: String,
        last_image_url: String,
    },
}

impl GenerationRequest {
    pub fn prompt(&self) -> &str {
        match self {
            GenerationRequest::Image { prompt } | GenerationRequest::Video { prompt, .. } => prompt,
        }
    }
}

/// Provider-reported state of a generation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Completed { url: String },
    Failed { reason: String },
}

/// Provider-reported state of a hosted asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStatus {
    Pending,
    Ready(Playback),
    Failed { reason: String },
}

/// An asynchronous generation provider: submit a job, then poll it.
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Create an upstream job.
    ///
    /// Must return an error, never a handle, when the provider rejects the
    /// request.
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, SubmissionError>;

    /// Read the current state of a job. Has no side effects upstream.
    async fn poll(&self, handle: &str) -> Result<JobStatus, PollError>;
}

/// A media-hosting provider that ingests a video URL and eventually exposes
/// a playback reference.
#[async_trait]
pub trait PublisherClient: Send + Sync {
    async fn publish(&self, media_url: &str) -> Result<JobHandle, SubmissionError>;

    async fn poll(&self, handle: &str) -> Result<PublishStatus, PollError>;
}
