//! Database module
//!
//! This module provides all database functionality including:
//! - Schema creation and in-place upgrades of older layouts
//! - Model definitions
//! - Repository layer for CRUD operations

pub mod models;
pub mod repository;
pub mod schema;

pub use models::*;
pub use repository::Repository;
pub use schema::initialize_database;

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;

/// Connections used while the schema is brought up to date
const MIGRATION_CONNECTIONS: u32 = 1;
const APP_CONNECTIONS: u32 = 5;

fn file_options(db_path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
}

async fn open_pool(options: SqliteConnectOptions, max_connections: u32) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Open the database file at `db_path`, upgrading its schema first.
///
/// The upgrade runs on its own single-connection pool, closed before the
/// application pool opens, so every pooled connection sees the final layout.
pub async fn create_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::info!("Opening database at: {:?}", db_path);

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let migration_pool = open_pool(file_options(db_path), MIGRATION_CONNECTIONS).await?;
    initialize_database(&migration_pool).await?;
    migration_pool.close().await;

    let pool = open_pool(file_options(db_path), APP_CONNECTIONS).await?;

    tracing::info!("Database ready with up to {} connections", APP_CONNECTIONS);
    Ok(pool)
}

/// Empty in-memory database; a second connection would see a different
/// database, so the pool holds exactly one.
#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);

    open_pool(options, 1).await.unwrap()
}
