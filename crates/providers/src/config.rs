use std::sync::Arc;

use crate::fake::{FakeJobClient, FakePublisher};
use crate::job::{JobClient, PublisherClient};
use crate::luma::LumaClient;
use crate::mux::MuxClient;

/// Polls a fake job answers `pending` before it completes.
const FAKE_POLLS_TO_COMPLETE: u32 = 2;

/// Which provider implementations the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    /// Real HTTP providers.
    Live,
    /// Self-completing in-process fakes, for local demos.
    Fake,
}

/// Provider configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub mode: ProviderMode,
    pub generation_api_url: String,
    pub generation_api_key: String,
    pub image_model: String,
    pub video_model: String,
    pub publish_api_url: String,
    pub publish_token_id: String,
    pub publish_token_secret: String,
    pub playback_base_url: String,
}

/// The three provider capabilities the pipeline needs.
///
/// Image and video jobs share one interface but are separate instances, so
/// each can be pointed at (or faked as) a different backend.
#[derive(Clone)]
pub struct Providers {
    pub images: Arc<dyn JobClient>,
    pub videos: Arc<dyn JobClient>,
    pub publisher: Arc<dyn PublisherClient>,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

impl ProviderConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                                    |
    /// |------------------------|--------------------------------------------|
    /// | `PROVIDER_MODE`        | `live`                                     |
    /// | `GENERATION_API_URL`   | `https://api.lumalabs.ai/dream-machine/v1` |
    /// | `GENERATION_API_KEY`   | required in `live` mode                    |
    /// | `IMAGE_MODEL`          | `photon-1`                                 |
    /// | `VIDEO_MODEL`          | `ray-1.6`                                  |
    /// | `PUBLISH_API_URL`      | `https://api.mux.com`                      |
    /// | `PUBLISH_TOKEN_ID`     | required in `live` mode                    |
    /// | `PUBLISH_TOKEN_SECRET` | required in `live` mode                    |
    /// | `PLAYBACK_BASE_URL`    | `https://stream.mux.com`                   |
    pub fn from_env() -> Self {
        let mode = match var_or("PROVIDER_MODE", "live").as_str() {
            "live" => ProviderMode::Live,
            "fake" => ProviderMode::Fake,
            other => panic!("PROVIDER_MODE must be 'live' or 'fake', got '{other}'"),
        };

        let required = |name: &str| -> String {
            match mode {
                ProviderMode::Live => std::env::var(name)
                    .unwrap_or_else(|_| panic!("{name} must be set when PROVIDER_MODE=live")),
                ProviderMode::Fake => std::env::var(name).unwrap_or_default(),
            }
        };

        Self {
            mode,
            generation_api_url: var_or(
                "GENERATION_API_URL",
                "https://api.lumalabs.ai/dream-machine/v1",
            ),
            generation_api_key: required("GENERATION_API_KEY"),
            image_model: var_or("IMAGE_MODEL", "photon-1"),
            video_model: var_or("VIDEO_MODEL", "ray-1.6"),
            publish_api_url: var_or("PUBLISH_API_URL", "https://api.mux.com"),
            publish_token_id: required("PUBLISH_TOKEN_ID"),
            publish_token_secret: required("PUBLISH_TOKEN_SECRET"),
            playback_base_url: var_or("PLAYBACK_BASE_URL", "https://stream.mux.com"),
        }
    }

    /// Construct the provider clients for the configured mode.
    pub fn build(&self) -> Providers {
        match self.mode {
            ProviderMode::Live => {
                let http = reqwest::Client::new();
                let generation = Arc::new(LumaClient::new(
                    http.clone(),
                    self.generation_api_url.clone(),
                    self.generation_api_key.clone(),
                    self.image_model.clone(),
                    self.video_model.clone(),
                ));
                let publisher = Arc::new(MuxClient::new(
                    http,
                    self.publish_api_url.clone(),
                    self.publish_token_id.clone(),
                    self.publish_token_secret.clone(),
                    self.playback_base_url.clone(),
                ));
                Providers {
                    images: generation.clone(),
                    videos: generation,
                    publisher,
                }
            }
            ProviderMode::Fake => Providers {
                images: Arc::new(FakeJobClient::completing_after(
                    "img",
                    FAKE_POLLS_TO_COMPLETE,
                )),
                videos: Arc::new(FakeJobClient::completing_after(
                    "vid",
                    FAKE_POLLS_TO_COMPLETE,
                )),
                publisher: Arc::new(FakePublisher::ready_after(FAKE_POLLS_TO_COMPLETE)),
            },
        }
    }
}
