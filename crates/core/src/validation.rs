//! Prompt validation for new entries.

use crate::entry::Prompts;
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of any single prompt, in characters.
pub const MAX_PROMPT_LENGTH: usize = 2_000;

/// Video prompt submitted when the entry was created with a blank one.
pub const DEFAULT_VIDEO_PROMPT: &str = "A smooth cinematic transition";

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn check_length(field: &str, text: &str) -> Result<(), CoreError> {
    let len = text.chars().count();
    if len > MAX_PROMPT_LENGTH {
        return Err(CoreError::Validation(format!(
            "{field} exceeds maximum length of {MAX_PROMPT_LENGTH} characters (got {len})"
        )));
    }
    Ok(())
}

fn required(field: &str, text: &str) -> Result<String, CoreError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    check_length(field, trimmed)?;
    Ok(trimmed.to_string())
}

/// Validate and normalize (trim) the three prompts of a new entry.
///
/// Both image prompts are required. The video prompt may be blank, in which
/// case [`DEFAULT_VIDEO_PROMPT`] is used at submission time.
pub fn validate_prompts(
    first_image: &str,
    last_image: &str,
    video: &str,
) -> Result<Prompts, CoreError> {
    let first_image = required("firstImagePrompt", first_image)?;
    let last_image = required("lastImagePrompt", last_image)?;
    let video = video.trim();
    check_length("videoPrompt", video)?;
    Ok(Prompts {
        first_image,
        last_image,
        video: video.to_string(),
    })
}
