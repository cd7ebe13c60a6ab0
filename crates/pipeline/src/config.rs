use std::time::Duration;

use dreamreel_core::entry::Stage;

use crate::retry::RetryPolicy;

/// Maximum time a slot may stay pending, counted from its claim.
#[derive(Debug, Clone)]
pub struct StageTimeouts {
    /// Applies to both image stages.
    pub image: Duration,
    pub video: Duration,
    pub publish: Duration,
}

impl StageTimeouts {
    pub fn for_stage(&self, stage: Stage) -> Duration {
        match stage {
            Stage::FirstImage | Stage::LastImage => self.image,
            Stage::Video => self.video,
            Stage::Publish => self.publish,
        }
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            image: Duration::from_secs(900),
            video: Duration::from_secs(1800),
            publish: Duration::from_secs(900),
        }
    }
}

/// Pipeline configuration loaded from environment variables.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub timeouts: StageTimeouts,
    pub retry: RetryPolicy,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> T {
    std::env::var(name)
        .unwrap_or_else(|_| default.into())
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid {}", std::any::type_name::<T>()))
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `IMAGE_STAGE_TIMEOUT_SECS`   | `900`   |
    /// | `VIDEO_STAGE_TIMEOUT_SECS`   | `1800`  |
    /// | `PUBLISH_STAGE_TIMEOUT_SECS` | `900`   |
    /// | `SUBMIT_MAX_ATTEMPTS`        | `3`     |
    /// | `SUBMIT_INITIAL_BACKOFF_MS`  | `500`   |
    /// | `SUBMIT_MAX_BACKOFF_MS`      | `5000`  |
    pub fn from_env() -> Self {
        let timeouts = StageTimeouts {
            image: Duration::from_secs(parse_var("IMAGE_STAGE_TIMEOUT_SECS", "900")),
            video: Duration::from_secs(parse_var("VIDEO_STAGE_TIMEOUT_SECS", "1800")),
            publish: Duration::from_secs(parse_var("PUBLISH_STAGE_TIMEOUT_SECS", "900")),
        };

        let max_attempts: u32 = parse_var("SUBMIT_MAX_ATTEMPTS", "3");
        assert!(max_attempts >= 1, "SUBMIT_MAX_ATTEMPTS must be at least 1");

        let retry = RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(parse_var("SUBMIT_INITIAL_BACKOFF_MS", "500")),
            max_backoff: Duration::from_millis(parse_var("SUBMIT_MAX_BACKOFF_MS", "5000")),
            ..Default::default()
        };

        Self { timeouts, retry }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_stages_share_a_timeout() {
        let t = StageTimeouts::default();
        assert_eq!(t.for_stage(Stage::FirstImage), t.for_stage(Stage::LastImage));
        assert_eq!(t.for_stage(Stage::Video), Duration::from_secs(1800));
    }
}
