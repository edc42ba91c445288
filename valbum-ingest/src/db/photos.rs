//! Photo record persistence

use crate::models::VRChatPhoto;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;
use valbum_common::{time, Error, Result};

/// Insert a photo unless its path already exists.
pub async fn insert_if_absent(conn: &mut SqliteConnection, record: &VRChatPhoto) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO vrchat_photos (guid, photo_path, taken_at, width, height)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.photo_path)
    .bind(time::format_photo(record.taken_at))
    .bind(record.width)
    .bind(record.height)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// All photos, oldest first.
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<VRChatPhoto>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, photo_path, taken_at, width, height
        FROM vrchat_photos
        ORDER BY taken_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM vrchat_photos")
        .fetch_one(pool)
        .await?)
}

fn from_row(row: &SqliteRow) -> Result<VRChatPhoto> {
    let guid_str: String = row.get("guid");
    let id = Uuid::parse_str(&guid_str)
        .map_err(|e| Error::Internal(format!("Invalid guid {:?}: {}", guid_str, e)))?;
    let taken_at_str: String = row.get("taken_at");

    Ok(VRChatPhoto {
        id,
        photo_path: row.get("photo_path"),
        taken_at: time::parse_photo(&taken_at_str)?,
        width: row.get("width"),
        height: row.get("height"),
    })
}
