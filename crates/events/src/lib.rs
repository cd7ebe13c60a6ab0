//! Pipeline event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PipelineEvent`]: the event envelope (`stage.*`, `entry.*`).
//! - [`EventLog`]: background consumer that writes events to the log.

pub mod bus;
pub mod log;

pub use bus::{EventBus, PipelineEvent};
pub use log::EventLog;
