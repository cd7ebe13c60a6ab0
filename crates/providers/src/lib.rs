//! Job Client and Publisher Client: the pipeline's view of the external
//! generation and media-hosting providers.

pub mod config;
pub mod error;
pub mod fake;
mod http;
pub mod job;
pub mod luma;
pub mod mux;

pub use config::{ProviderConfig, ProviderMode, Providers};
pub use error::{PollError, SubmissionError};
pub use job::{GenerationRequest, JobClient, JobHandle, JobStatus, PublishStatus, PublisherClient};
