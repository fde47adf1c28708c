//! SQLite store for rooms, rosters, per-round answers and round results.
//!
//! Nothing here is global: callers build a pool with [`create_pool`] and pass it
//! to the functions in [`rooms`] and [`answers`]. The scoring engine never
//! touches the store.

pub mod answers;
pub mod models;
pub mod rooms;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};

/// Get the path to the database file using platform-specific data directory
pub fn default_db_path() -> Result<PathBuf> {
    let mut path = dirs::data_dir()
        .context("Unable to determine data directory for your platform")?;

    path.push("mots-en-tete");

    std::fs::create_dir_all(&path)
        .context("Failed to create mots-en-tete data directory")?;

    path.push("rooms.db");
    Ok(path)
}

/// Create a connection pool to the SQLite database at `path` and run migrations
pub async fn create_pool(path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to database {}", path.display()))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}
