//! Database initialization
//!
//! Creates the database file on first run and applies the schema. All
//! statements are idempotent (`CREATE TABLE IF NOT EXISTS`), so calling
//! [`init_database`] against an existing database is safe.
//!
//! Timestamps are stored as TEXT in the formats defined in [`crate::time`];
//! within one table that representation sorts chronologically, so `MAX()`
//! and range comparisons work directly on the column.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL mode allows concurrent readers while a sync or import is writing
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent - safe to call multiple times)
///
/// Exposed separately so tests can apply the schema to in-memory pools.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_world_join_logs_table(pool).await?;
    create_player_join_logs_table(pool).await?;
    create_player_leave_logs_table(pool).await?;
    create_vrchat_photos_table(pool).await?;
    Ok(())
}

async fn create_world_join_logs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS world_join_logs (
            guid TEXT PRIMARY KEY,
            world_id TEXT NOT NULL,
            world_name TEXT NOT NULL,
            world_instance_id TEXT NOT NULL,
            joined_at TIMESTAMP NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Natural key: re-parsing the same store lines must not create duplicates
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_world_join_logs_natural_key
        ON world_join_logs (world_id, world_instance_id, joined_at)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_world_join_logs_joined_at ON world_join_logs (joined_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_player_join_logs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS player_join_logs (
            guid TEXT PRIMARY KEY,
            player_id TEXT,
            player_name TEXT NOT NULL,
            joined_at TIMESTAMP NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_player_join_logs_natural_key
        ON player_join_logs (player_name, joined_at)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_player_join_logs_joined_at ON player_join_logs (joined_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_player_leave_logs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS player_leave_logs (
            guid TEXT PRIMARY KEY,
            player_id TEXT,
            player_name TEXT NOT NULL,
            left_at TIMESTAMP NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_player_leave_logs_natural_key
        ON player_leave_logs (player_name, left_at)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_player_leave_logs_left_at ON player_leave_logs (left_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_vrchat_photos_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vrchat_photos (
            guid TEXT PRIMARY KEY,
            photo_path TEXT NOT NULL UNIQUE,
            taken_at TIMESTAMP NOT NULL,
            width INTEGER NOT NULL,
            height INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (width > 0),
            CHECK (height > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_vrchat_photos_taken_at ON vrchat_photos (taken_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
