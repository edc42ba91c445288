//! Player join/leave log persistence
//!
//! Two structurally identical tables. The natural key is (name, timestamp):
//! player ids are missing from older client logs, and two events for the
//! same name in the same second are the same event re-read.

use crate::models::{PlayerJoinLog, PlayerLeaveLog};
use sqlx::{SqliteConnection, SqlitePool};
use valbum_common::{time, Result};

/// Insert a player join unless its natural key already exists.
pub async fn insert_join_if_absent(
    conn: &mut SqliteConnection,
    record: &PlayerJoinLog,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO player_join_logs (guid, player_id, player_name, joined_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.player_id)
    .bind(&record.player_name)
    .bind(time::format_record(record.joined_at))
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Insert a player leave unless its natural key already exists.
pub async fn insert_leave_if_absent(
    conn: &mut SqliteConnection,
    record: &PlayerLeaveLog,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO player_leave_logs (guid, player_id, player_name, left_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.player_id)
    .bind(&record.player_name)
    .bind(time::format_record(record.left_at))
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_joins(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM player_join_logs")
        .fetch_one(pool)
        .await?)
}

pub async fn count_leaves(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM player_leave_logs")
        .fetch_one(pool)
        .await?)
}
