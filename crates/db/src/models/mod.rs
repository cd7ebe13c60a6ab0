//! Row models and DTOs.
//!
//! Each submodule contains a `FromRow` struct matching the database row,
//! its conversion into the domain type, and the query DTOs for that table.

pub mod entry;
