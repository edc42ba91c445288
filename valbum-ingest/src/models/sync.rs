//! Sync request and result types

use crate::models::{PlayerJoinLog, PlayerLeaveLog, VRChatPhoto, WorldJoinLog};
use serde::{Deserialize, Serialize};

/// How much of the log store to re-parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncMode {
    /// Parse every store file
    Full,
    /// Parse only store partitions at or after the newest known world join
    Incremental,
}

/// Records created by one sync pass
///
/// Only rows actually inserted appear here; records that already existed
/// under their natural key are absent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncOutcome {
    pub created_world_join_logs: Vec<WorldJoinLog>,
    pub created_player_join_logs: Vec<PlayerJoinLog>,
    pub created_player_leave_logs: Vec<PlayerLeaveLog>,
    pub created_photo_records: Vec<VRChatPhoto>,
}

impl SyncOutcome {
    /// Total rows inserted across all four tables.
    pub fn total_created(&self) -> usize {
        self.created_world_join_logs.len()
            + self.created_player_join_logs.len()
            + self.created_player_leave_logs.len()
            + self.created_photo_records.len()
    }
}
