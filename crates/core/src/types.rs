/// Entries are keyed by time-ordered UUIDs (v7); callers treat them as opaque.
pub type EntryId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Allocate a fresh entry identifier.
pub fn new_entry_id() -> EntryId {
    uuid::Uuid::now_v7()
}
