//! Parsed record persistence
//!
//! Runs the parser over a batch of store lines and writes every resulting
//! record inside one transaction. Either the whole batch lands or none of it
//! does, so a failed sync never leaves a half-written table. Records whose
//! natural key already exists are skipped and do not appear in the outcome.

use crate::db;
use crate::models::SyncOutcome;
use crate::services::line_extractor::RawLogLine;
use crate::services::record_parser::{ParsedLogEvent, RecordParser};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

/// Persistence errors
#[derive(Debug, Error)]
pub enum PersistError {
    /// Transaction begin/commit failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Row insert or mapping failure
    #[error(transparent)]
    Common(#[from] valbum_common::Error),
}

/// Parses store lines and persists the resulting records
pub struct Persister {
    db: SqlitePool,
}

impl Persister {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Parse `lines` (store order) and insert every record that is not
    /// already present. All inserts share one transaction.
    pub async fn parse_and_persist(
        &self,
        lines: &[RawLogLine],
    ) -> Result<SyncOutcome, PersistError> {
        let mut parser = RecordParser::new();
        let mut events = Vec::new();
        for line in lines {
            if let Some(event) = parser.parse_line(line) {
                events.push(event);
            }
        }
        parser.finish();
        debug!("Parsed {} events from {} lines", events.len(), lines.len());

        let mut outcome = SyncOutcome::default();
        let mut tx = self.db.begin().await?;

        for event in events {
            match event {
                ParsedLogEvent::WorldJoin(record) => {
                    if db::world_joins::insert_if_absent(&mut tx, &record).await? {
                        outcome.created_world_join_logs.push(record);
                    }
                }
                ParsedLogEvent::PlayerJoin(record) => {
                    if db::player_events::insert_join_if_absent(&mut tx, &record).await? {
                        outcome.created_player_join_logs.push(record);
                    }
                }
                ParsedLogEvent::PlayerLeave(record) => {
                    if db::player_events::insert_leave_if_absent(&mut tx, &record).await? {
                        outcome.created_player_leave_logs.push(record);
                    }
                }
                ParsedLogEvent::Photo(record) => {
                    if db::photos::insert_if_absent(&mut tx, &record).await? {
                        outcome.created_photo_records.push(record);
                    }
                }
                // Session markers delimit play sessions; they create no rows
                ParsedLogEvent::SessionStart { .. } | ParsedLogEvent::AppQuit { .. } => {}
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }
}
