//! Entry Store: durable, single-source-of-truth storage for pipeline entries.
//!
//! [`store::EntryStore`] is the storage seam used by the pipeline. Two
//! implementations are provided: [`pg::PgEntryStore`] (PostgreSQL, the
//! production store) and [`memory::MemoryEntryStore`] (process-local, for
//! tests and local demos).

use sqlx::postgres::PgPoolOptions;

pub mod memory;
pub mod models;
pub mod pg;
pub mod repositories;
pub mod store;

pub use memory::MemoryEntryStore;
pub use pg::PgEntryStore;
pub use store::{EntryStore, StoreError};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply any pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
