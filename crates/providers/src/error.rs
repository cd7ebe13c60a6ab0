/// Errors from submitting a job or an asset to a provider.
///
/// Every variant counts as a failed submission attempt; the pipeline retries
/// a bounded number of times before recording the slot as failed.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// The provider answered with a non-2xx status (bad input, auth, quota).
    #[error("provider rejected request ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider accepted the request but the response carried no handle.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Errors from a status check.
///
/// Never terminal: a poll that errors leaves the slot pending and the next
/// reconciliation simply asks again.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The provider answered with a non-2xx status.
    #[error("provider status check failed ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response could not be interpreted (unknown state, missing asset).
    #[error("malformed provider response: {0}")]
    Malformed(String),
}
