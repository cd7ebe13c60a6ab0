//! Background consumer that writes every pipeline event to the log.

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::PipelineEvent;

pub struct EventLog;

impl EventLog {
    /// Log events from `receiver` until the bus closes or `cancel` fires.
    ///
    /// Returns the number of events logged.
    pub async fn run(
        mut receiver: broadcast::Receiver<PipelineEvent>,
        cancel: CancellationToken,
    ) -> u64 {
        let mut logged = 0u64;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(logged, "Event log stopping");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => {
                        Self::write(&event);
                        logged += 1;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Event log lagged, some events were not logged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!(logged, "Event bus closed, event log stopping");
                        break;
                    }
                }
            }
        }
        logged
    }

    fn write(event: &PipelineEvent) {
        tracing::info!(
            event_type = %event.event_type,
            entry_id = %event.entry_id,
            stage = event.stage.map(|s| s.as_str()),
            payload = %event.payload,
            "Pipeline event",
        );
    }
}
