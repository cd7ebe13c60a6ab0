use dreamreel_core::entry::Stage;
use dreamreel_core::error::CoreError;
use dreamreel_db::StoreError;

/// Errors surfaced by pipeline operations.
///
/// Upstream failures are not errors at this level: they are recorded in the
/// entry and reported through its snapshot.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// An explicit initiator was called before its inputs exist.
    #[error("{stage} stage cannot start yet: {reason}")]
    NotEligible { stage: Stage, reason: String },

    /// A guard in the reconciler let through a state it should not have.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}
