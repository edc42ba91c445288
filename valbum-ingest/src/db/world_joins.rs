//! World join log persistence

use crate::models::WorldJoinLog;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;
use valbum_common::{time, Error, Result};

/// Insert a world join unless its natural key already exists.
///
/// Returns true when a row was actually created.
pub async fn insert_if_absent(conn: &mut SqliteConnection, record: &WorldJoinLog) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO world_join_logs
            (guid, world_id, world_name, world_instance_id, joined_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.world_id)
    .bind(&record.world_name)
    .bind(&record.world_instance_id)
    .bind(time::format_record(record.joined_at))
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Newest known world join time, the incremental sync watermark.
pub async fn latest_joined_at(pool: &SqlitePool) -> Result<Option<chrono::NaiveDateTime>> {
    let latest: Option<String> = sqlx::query_scalar("SELECT MAX(joined_at) FROM world_join_logs")
        .fetch_one(pool)
        .await?;

    match latest {
        Some(text) => Ok(Some(time::parse_record(&text)?)),
        None => Ok(None),
    }
}

/// All world joins, newest first.
pub async fn list_all_desc(pool: &SqlitePool) -> Result<Vec<WorldJoinLog>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, world_id, world_name, world_instance_id, joined_at
        FROM world_join_logs
        ORDER BY joined_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM world_join_logs")
        .fetch_one(pool)
        .await?)
}

fn from_row(row: &SqliteRow) -> Result<WorldJoinLog> {
    let guid_str: String = row.get("guid");
    let id = Uuid::parse_str(&guid_str)
        .map_err(|e| Error::Internal(format!("Invalid guid {:?}: {}", guid_str, e)))?;
    let joined_at_str: String = row.get("joined_at");

    Ok(WorldJoinLog {
        id,
        world_id: row.get("world_id"),
        world_name: row.get("world_name"),
        world_instance_id: row.get("world_instance_id"),
        joined_at: time::parse_record(&joined_at_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        valbum_common::db::create_schema(&pool).await.unwrap();
        pool
    }

    fn join_at(h: u32) -> WorldJoinLog {
        WorldJoinLog::new(
            "wrld_abc".to_string(),
            "Test World".to_string(),
            "12345".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_insert_if_absent_deduplicates_on_natural_key() {
        let pool = test_pool().await;
        let record = join_at(23);

        let mut conn = pool.acquire().await.unwrap();
        assert!(insert_if_absent(&mut conn, &record).await.unwrap());

        // Same natural key, different id: ignored
        let duplicate = WorldJoinLog::new(
            record.world_id.clone(),
            record.world_name.clone(),
            record.world_instance_id.clone(),
            record.joined_at,
        );
        assert!(!insert_if_absent(&mut conn, &duplicate).await.unwrap());
        assert_eq!(count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_latest_joined_at_watermark() {
        let pool = test_pool().await;
        assert!(latest_joined_at(&pool).await.unwrap().is_none());

        let mut conn = pool.acquire().await.unwrap();
        insert_if_absent(&mut conn, &join_at(9)).await.unwrap();
        insert_if_absent(&mut conn, &join_at(21)).await.unwrap();
        drop(conn);

        let latest = latest_joined_at(&pool).await.unwrap().unwrap();
        assert_eq!(latest, join_at(21).joined_at);
    }

    #[tokio::test]
    async fn test_list_all_desc_round_trips_fields() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        insert_if_absent(&mut conn, &join_at(9)).await.unwrap();
        insert_if_absent(&mut conn, &join_at(21)).await.unwrap();
        drop(conn);

        let joins = list_all_desc(&pool).await.unwrap();
        assert_eq!(joins.len(), 2);
        assert_eq!(joins[0].joined_at, join_at(21).joined_at);
        assert_eq!(joins[1].joined_at, join_at(9).joined_at);
        assert_eq!(joins[0].world_id, "wrld_abc");
        assert_eq!(joins[0].world_name, "Test World");
        assert_eq!(joins[0].world_instance_id, "12345");
    }
}
