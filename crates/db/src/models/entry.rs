//! Row model and query DTOs for the `entries` table.

use dreamreel_core::entry::{Entry, Outcome, Playback, Prompts, Slot};
use dreamreel_core::types::{EntryId, Timestamp};
use serde::Deserialize;
use sqlx::FromRow;

/// Default page size for entry listing.
pub const DEFAULT_LIMIT: i64 = 36;

/// Maximum page size for entry listing.
pub const MAX_LIMIT: i64 = 100;

/// A row from the `entries` table.
#[derive(Debug, Clone, FromRow)]
pub struct EntryRow {
    pub id: EntryId,
    pub first_image_prompt: String,
    pub last_image_prompt: String,
    pub video_prompt: String,

    pub first_image_claimed_at: Option<Timestamp>,
    pub first_image_handle: Option<String>,
    pub first_image_url: Option<String>,
    pub first_image_error: Option<String>,
    pub first_image_resolved_at: Option<Timestamp>,

    pub last_image_claimed_at: Option<Timestamp>,
    pub last_image_handle: Option<String>,
    pub last_image_url: Option<String>,
    pub last_image_error: Option<String>,
    pub last_image_resolved_at: Option<Timestamp>,

    pub video_claimed_at: Option<Timestamp>,
    pub video_handle: Option<String>,
    pub video_url: Option<String>,
    pub video_error: Option<String>,
    pub video_resolved_at: Option<Timestamp>,

    pub publish_claimed_at: Option<Timestamp>,
    pub publish_handle: Option<String>,
    pub playback_id: Option<String>,
    pub playback_url: Option<String>,
    pub publish_error: Option<String>,
    pub publish_resolved_at: Option<Timestamp>,

    pub featured: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn outcome<T>(value: Option<T>, error: Option<String>) -> Outcome<T> {
    match (value, error) {
        (Some(value), _) => Outcome::Done(value),
        (None, Some(reason)) => Outcome::Failed(reason),
        (None, None) => Outcome::Pending,
    }
}

fn slot<T>(
    claimed_at: Option<Timestamp>,
    handle: Option<String>,
    outcome: Outcome<T>,
    resolved_at: Option<Timestamp>,
) -> Slot<T> {
    Slot {
        claimed_at,
        handle,
        outcome,
        resolved_at,
    }
}

impl From<EntryRow> for Entry {
    fn from(row: EntryRow) -> Self {
        let playback = match (row.playback_id, row.playback_url) {
            (Some(playback_id), Some(playback_url)) => Some(Playback {
                playback_id,
                playback_url,
            }),
            _ => None,
        };

        Entry {
            id: row.id,
            prompts: Prompts {
                first_image: row.first_image_prompt,
                last_image: row.last_image_prompt,
                video: row.video_prompt,
            },
            first_image: slot(
                row.first_image_claimed_at,
                row.first_image_handle,
                outcome(row.first_image_url, row.first_image_error),
                row.first_image_resolved_at,
            ),
            last_image: slot(
                row.last_image_claimed_at,
                row.last_image_handle,
                outcome(row.last_image_url, row.last_image_error),
                row.last_image_resolved_at,
            ),
            video: slot(
                row.video_claimed_at,
                row.video_handle,
                outcome(row.video_url, row.video_error),
                row.video_resolved_at,
            ),
            publish: slot(
                row.publish_claimed_at,
                row.publish_handle,
                outcome(playback, row.publish_error),
                row.publish_resolved_at,
            ),
            featured: row.featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Query parameters for `GET /api/v1/entries`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryListQuery {
    /// Only entries whose `featured` flag matches.
    pub featured: Option<bool>,
    /// `true`: only entries with a playback reference; `false`: only without.
    pub ready: Option<bool>,
    /// Maximum number of results. Defaults to 36, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

impl EntryListQuery {
    pub fn clamped_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn clamped_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Whether `entry` passes the `featured` / `ready` filters.
    pub fn matches(&self, entry: &Entry) -> bool {
        self.featured.map_or(true, |featured| entry.featured == featured)
            && self
                .ready
                .map_or(true, |ready| entry.playback().is_some() == ready)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use dreamreel_core::entry::Stage;

    use super::*;

    fn blank_row() -> EntryRow {
        let now = Utc::now();
        EntryRow {
            id: dreamreel_core::types::new_entry_id(),
            first_image_prompt: "a".into(),
            last_image_prompt: "b".into(),
            video_prompt: String::new(),
            first_image_claimed_at: None,
            first_image_handle: None,
            first_image_url: None,
            first_image_error: None,
            first_image_resolved_at: None,
            last_image_claimed_at: None,
            last_image_handle: None,
            last_image_url: None,
            last_image_error: None,
            last_image_resolved_at: None,
            video_claimed_at: None,
            video_handle: None,
            video_url: None,
            video_error: None,
            video_resolved_at: None,
            publish_claimed_at: None,
            publish_handle: None,
            playback_id: None,
            playback_url: None,
            publish_error: None,
            publish_resolved_at: None,
            featured: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn blank_row_maps_to_unstarted_entry() {
        let entry = Entry::from(blank_row());
        for stage in Stage::ALL {
            assert!(!entry.is_started(stage));
            assert!(!entry.is_resolved(stage));
        }
    }

    #[test]
    fn result_columns_map_to_outcomes() {
        let mut row = blank_row();
        row.first_image_url = Some("https://a".into());
        row.last_image_error = Some("timeout".into());
        row.playback_id = Some("P".into());
        row.playback_url = Some("https://stream/P.m3u8".into());
        let entry = Entry::from(row);
        assert_eq!(entry.url(Stage::FirstImage), Some("https://a"));
        assert_eq!(entry.failure(Stage::LastImage), Some("timeout"));
        assert_eq!(entry.playback().map(|p| p.playback_id.as_str()), Some("P"));
    }

    #[test]
    fn list_limit_is_clamped() {
        let q = EntryListQuery {
            limit: Some(10_000),
            offset: Some(-3),
            ..Default::default()
        };
        assert_eq!(q.clamped_limit(), MAX_LIMIT);
        assert_eq!(q.clamped_offset(), 0);
        assert_eq!(EntryListQuery::default().clamped_limit(), DEFAULT_LIMIT);
    }
}
