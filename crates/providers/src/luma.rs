//! REST client for the image/video generation provider.
//!
//! Wraps three endpoints of the Dream Machine API using [`reqwest`]:
//! `POST /generations/image`, `POST /generations/video` and
//! `GET /generations/{id}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PollError, SubmissionError};
use crate::http::{parse_poll, parse_submission};
use crate::job::{GenerationRequest, JobClient, JobHandle, JobStatus};

/// Fallback failure text when the provider gives none.
const UNSPECIFIED_FAILURE: &str = "generation failed";

/// HTTP client for the generation provider.
pub struct LumaClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    image_model: String,
    video_model: String,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ImageBody<'a> {
    prompt: &'a str,
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct Keyframe<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct Keyframes<'a> {
    frame0: Keyframe<'a>,
    frame1: Keyframe<'a>,
}

#[derive(Debug, Serialize)]
struct VideoBody<'a> {
    prompt: &'a str,
    model: &'a str,
    keyframes: Keyframes<'a>,
}

#[derive(Debug, Default, Deserialize)]
struct Assets {
    image: Option<String>,
    video: Option<String>,
}

/// A generation as returned by both the create and the get endpoints.
#[derive(Debug, Deserialize)]
pub struct Generation {
    pub id: Option<String>,
    pub state: Option<String>,
    pub failure_reason: Option<String>,
    #[serde(default)]
    assets: Option<Assets>,
}

impl Generation {
    /// Map the provider's generation state onto a [`JobStatus`].
    ///
    /// A `completed` generation without an asset URL is treated as a
    /// malformed response rather than a failure, so the slot stays pending.
    pub fn job_status(&self) -> Result<JobStatus, PollError> {
        match self.state.as_deref() {
            Some("queued") | Some("dreaming") => Ok(JobStatus::Pending),
            Some("completed") => {
                let assets = self.assets.as_ref();
                let url = assets
                    .and_then(|a| a.video.clone())
                    .or_else(|| assets.and_then(|a| a.image.clone()))
                    .filter(|url| !url.is_empty());
                match url {
                    Some(url) => Ok(JobStatus::Completed { url }),
                    None => Err(PollError::Malformed(
                        "completed generation has no asset URL".to_string(),
                    )),
                }
            }
            Some("failed") => Ok(JobStatus::Failed {
                reason: self
                    .failure_reason
                    .clone()
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| UNSPECIFIED_FAILURE.to_string()),
            }),
            Some(other) => Err(PollError::Malformed(format!(
                "unknown generation state '{other}'"
            ))),
            None => Err(PollError::Malformed("generation has no state".to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

impl LumaClient {
    /// * `api_url` - Base URL, e.g. `https://api.lumalabs.ai/dream-machine/v1`.
    pub fn new(
        client: reqwest::Client,
        api_url: String,
        api_key: String,
        image_model: String,
        video_model: String,
    ) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            image_model,
            video_model,
        }
    }

    async fn create(&self, path: &str, body: &impl Serialize) -> Result<JobHandle, SubmissionError> {
        let response = self
            .client
            .post(format!("{}{path}", self.api_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let generation: Generation = parse_submission(response).await?;
        generation
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SubmissionError::Malformed("generation has no id".to_string()))
    }
}

#[async_trait]
impl JobClient for LumaClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, SubmissionError> {
        match request {
            GenerationRequest::Image { prompt } => {
                let body = ImageBody {
                    prompt,
                    model: &self.image_model,
                };
                self.create("/generations/image", &body).await
            }
            GenerationRequest::Video {
                prompt,
                first_image_url,
                last_image_url,
            } => {
                let body = VideoBody {
                    prompt,
                    model: &self.video_model,
                    keyframes: Keyframes {
                        frame0: Keyframe {
                            kind: "image",
                            url: first_image_url.trim(),
                        },
                        frame1: Keyframe {
                            kind: "image",
                            url: last_image_url.trim(),
                        },
                    },
                };
                self.create("/generations/video", &body).await
            }
        }
    }

    async fn poll(&self, handle: &str) -> Result<JobStatus, PollError> {
        let response = self
            .client
            .get(format!("{}/generations/{handle}", self.api_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let generation: Generation = parse_poll(response).await?;
        generation.job_status()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn parse(json: serde_json::Value) -> Generation {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn in_progress_states_are_pending() {
        for state in ["queued", "dreaming"] {
            let g = parse(serde_json::json!({"id": "g1", "state": state}));
            assert_eq!(g.job_status().unwrap(), JobStatus::Pending);
        }
    }

    #[test]
    fn completed_video_uses_video_asset() {
        let g = parse(serde_json::json!({
            "id": "g1",
            "state": "completed",
            "assets": {"video": "https://cdn/v.mp4"}
        }));
        assert_eq!(
            g.job_status().unwrap(),
            JobStatus::Completed { url: "https://cdn/v.mp4".into() }
        );
    }

    #[test]
    fn completed_image_uses_image_asset() {
        let g = parse(serde_json::json!({
            "state": "completed",
            "assets": {"image": "https://cdn/a.jpg", "video": null}
        }));
        assert_matches!(g.job_status(), Ok(JobStatus::Completed { url }) if url == "https://cdn/a.jpg");
    }

    #[test]
    fn completed_without_asset_is_malformed_not_failed() {
        let g = parse(serde_json::json!({"state": "completed", "assets": {}}));
        assert_matches!(g.job_status(), Err(PollError::Malformed(_)));
    }

    #[test]
    fn failed_carries_reason() {
        let g = parse(serde_json::json!({"state": "failed", "failure_reason": "content policy"}));
        assert_eq!(
            g.job_status().unwrap(),
            JobStatus::Failed { reason: "content policy".into() }
        );

        let g = parse(serde_json::json!({"state": "failed"}));
        assert_matches!(g.job_status(), Ok(JobStatus::Failed { reason }) if reason == UNSPECIFIED_FAILURE);
    }

    #[test]
    fn unknown_state_is_malformed() {
        let g = parse(serde_json::json!({"state": "exploding"}));
        assert_matches!(g.job_status(), Err(PollError::Malformed(_)));
    }

    #[test]
    fn video_body_uses_image_keyframes() {
        let body = VideoBody {
            prompt: "p",
            model: "ray-1.6",
            keyframes: Keyframes {
                frame0: Keyframe { kind: "image", url: "https://a" },
                frame1: Keyframe { kind: "image", url: "https://b" },
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["keyframes"]["frame0"]["type"], "image");
        assert_eq!(json["keyframes"]["frame1"]["url"], "https://b");
        assert_eq!(json["model"], "ray-1.6");
    }
}
