//! Pipeline orchestration core.
//!
//! [`Pipeline`] tracks each entry through first image, last image, video and
//! publish, driven entirely by callers: every [`Pipeline::reconcile`] call is
//! one pass that polls what is pending, starts what has become eligible, and
//! persists what it learns. There is no background scheduler.

pub mod config;
pub mod error;
pub mod initiators;
pub mod pipeline;
pub mod reconciler;
pub mod retry;

pub use config::{PipelineConfig, StageTimeouts};
pub use error::PipelineError;
pub use initiators::{StartOutcome, SUBMISSION_ERROR_REASON};
pub use pipeline::Pipeline;
pub use reconciler::TIMEOUT_REASON;
pub use retry::RetryPolicy;
