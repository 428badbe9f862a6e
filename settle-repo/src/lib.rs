//! Persistence adapter for the settlement engine.
//!
//! Implements the [`SettlementRepository`](settle_types::SettlementRepository)
//! port on SQLite. The schema is applied on startup from the bundled
//! migration file; identifiers and timestamps are stored as TEXT.

pub mod sqlite;
mod types;

#[cfg(test)]
mod sqlite_tests;

pub use sqlite::SqliteRepo;

/// Connects to the database and runs migrations.
pub async fn build_repo(database_url: &str) -> anyhow::Result<SqliteRepo> {
    SqliteRepo::new(database_url).await
}
