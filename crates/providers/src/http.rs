//! Response helpers shared by the HTTP provider clients.

use serde::de::DeserializeOwned;

use crate::error::{PollError, SubmissionError};

/// Split a response into its status and body text when it is not 2xx.
async fn failure(response: reqwest::Response) -> Result<reqwest::Response, (u16, String)> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err((status.as_u16(), body))
}

/// Parse a successful submission response into the expected type.
pub(crate) async fn parse_submission<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SubmissionError> {
    let response = failure(response)
        .await
        .map_err(|(status, body)| SubmissionError::Rejected { status, body })?;
    Ok(response.json::<T>().await?)
}

/// Parse a successful status-check response into the expected type.
pub(crate) async fn parse_poll<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PollError> {
    let response = failure(response)
        .await
        .map_err(|(status, body)| PollError::Api { status, body })?;
    Ok(response.json::<T>().await?)
}
