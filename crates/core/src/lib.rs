//! Domain types for the dreamreel generation pipeline.
//!
//! Pure data and rules only: entries and their stage slots, the derived
//! status state machine, the client-facing snapshot, and prompt validation.
//! Storage, provider I/O and orchestration live in the sibling crates.

pub mod entry;
pub mod error;
pub mod status;
pub mod types;
pub mod validation;
