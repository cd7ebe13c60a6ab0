//! REST client for the media-hosting provider.
//!
//! Publishing creates an asset from a public video URL
//! (`POST /video/v1/assets`); the asset id is the handle, and
//! `GET /video/v1/assets/{id}` reports when it is playable.

use async_trait::async_trait;
use dreamreel_core::entry::Playback;
use serde::{Deserialize, Serialize};

use crate::error::{PollError, SubmissionError};
use crate::http::{parse_poll, parse_submission};
use crate::job::{JobHandle, PublishStatus, PublisherClient};

/// HTTP client for the hosting provider.
pub struct MuxClient {
    client: reqwest::Client,
    api_url: String,
    token_id: String,
    token_secret: String,
    playback_base_url: String,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CreateAsset<'a> {
    input: &'a str,
    playback_policy: [&'static str; 1],
    encoding_tier: &'static str,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Asset,
}

#[derive(Debug, Deserialize)]
struct PlaybackId {
    id: String,
}

/// An asset as returned by the create and get endpoints.
#[derive(Debug, Deserialize)]
pub struct Asset {
    pub id: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    playback_ids: Vec<PlaybackId>,
    #[serde(default)]
    errors: Option<AssetErrors>,
}

#[derive(Debug, Deserialize)]
struct AssetErrors {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    messages: Vec<String>,
}

impl Asset {
    /// Map the asset status onto a [`PublishStatus`].
    ///
    /// `playback_base_url` prefixes the HLS URL built from the first
    /// playback id.
    pub fn publish_status(&self, playback_base_url: &str) -> Result<PublishStatus, PollError> {
        match self.status.as_deref() {
            Some("preparing") => Ok(PublishStatus::Pending),
            Some("ready") => {
                let playback_id = self
                    .playback_ids
                    .first()
                    .map(|p| p.id.clone())
                    .ok_or_else(|| {
                        PollError::Malformed("ready asset has no playback id".to_string())
                    })?;
                Ok(PublishStatus::Ready(Playback {
                    playback_url: playback_url(playback_base_url, &playback_id),
                    playback_id,
                }))
            }
            Some("errored") => Ok(PublishStatus::Failed {
                reason: self.error_text(),
            }),
            Some(other) => Err(PollError::Malformed(format!("unknown asset status '{other}'"))),
            None => Err(PollError::Malformed("asset has no status".to_string())),
        }
    }

    fn error_text(&self) -> String {
        let Some(errors) = &self.errors else {
            return "asset errored".to_string();
        };
        match (errors.kind.as_deref(), errors.messages.is_empty()) {
            (Some(kind), false) => format!("{kind}: {}", errors.messages.join("; ")),
            (Some(kind), true) => kind.to_string(),
            (None, false) => errors.messages.join("; "),
            (None, true) => "asset errored".to_string(),
        }
    }
}

/// `{base}/{playback_id}.m3u8`
pub fn playback_url(base: &str, playback_id: &str) -> String {
    format!("{}/{playback_id}.m3u8", base.trim_end_matches('/'))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

impl MuxClient {
    pub fn new(
        client: reqwest::Client,
        api_url: String,
        token_id: String,
        token_secret: String,
        playback_base_url: String,
    ) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token_id,
            token_secret,
            playback_base_url,
        }
    }
}

#[async_trait]
impl PublisherClient for MuxClient {
    async fn publish(&self, media_url: &str) -> Result<JobHandle, SubmissionError> {
        let body = CreateAsset {
            input: media_url,
            playback_policy: ["public"],
            encoding_tier: "baseline",
        };

        let response = self
            .client
            .post(format!("{}/video/v1/assets", self.api_url))
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .json(&body)
            .send()
            .await?;

        let envelope: Envelope = parse_submission(response).await?;
        envelope
            .data
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SubmissionError::Malformed("asset has no id".to_string()))
    }

    async fn poll(&self, handle: &str) -> Result<PublishStatus, PollError> {
        let response = self
            .client
            .get(format!("{}/video/v1/assets/{handle}", self.api_url))
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .send()
            .await?;

        let envelope: Envelope = parse_poll(response).await?;
        envelope.data.publish_status(&self.playback_base_url)
    }
}
