//! Log record types
//!
//! One struct per database table. Identity is the random `id`; deduplication
//! works on the natural keys enforced by unique indexes, so re-parsing the
//! same store lines never produces duplicate rows.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entry into a world instance. Marks a session boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldJoinLog {
    /// Unique record identifier
    pub id: Uuid,

    /// World identifier (`wrld_...`)
    pub world_id: String,

    /// Human-readable world name
    pub world_name: String,

    /// Instance identifier, including access tags (`12345~region(jp)`)
    pub world_instance_id: String,

    /// When the client joined, local wall-clock time
    pub joined_at: NaiveDateTime,
}

impl WorldJoinLog {
    pub fn new(
        world_id: String,
        world_name: String,
        world_instance_id: String,
        joined_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            world_id,
            world_name,
            world_instance_id,
            joined_at,
        }
    }
}

/// Another player appearing in the current instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoinLog {
    /// Unique record identifier
    pub id: Uuid,

    /// Player identifier (`usr_...`), absent in older client logs
    pub player_id: Option<String>,

    /// Player display name
    pub player_name: String,

    /// When the player joined, local wall-clock time
    pub joined_at: NaiveDateTime,
}

impl PlayerJoinLog {
    pub fn new(player_id: Option<String>, player_name: String, joined_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            player_name,
            joined_at,
        }
    }
}

/// A player leaving the current instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLeaveLog {
    /// Unique record identifier
    pub id: Uuid,

    /// Player identifier (`usr_...`), absent in older client logs
    pub player_id: Option<String>,

    /// Player display name
    pub player_name: String,

    /// When the player left, local wall-clock time
    pub left_at: NaiveDateTime,
}

impl PlayerLeaveLog {
    pub fn new(player_id: Option<String>, player_name: String, left_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            player_name,
            left_at,
        }
    }
}

/// A screenshot taken by the in-game camera.
///
/// `taken_at` comes from the photo filename, not the log line timestamp; the
/// filename carries millisecond resolution while log lines only have seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VRChatPhoto {
    /// Unique record identifier
    pub id: Uuid,

    /// Absolute path the client wrote the file to
    pub photo_path: String,

    /// Capture time from the filename, millisecond resolution
    pub taken_at: NaiveDateTime,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,
}

impl VRChatPhoto {
    pub fn new(photo_path: String, taken_at: NaiveDateTime, width: u32, height: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            photo_path,
            taken_at,
            width,
            height,
        }
    }
}

/// Photos grouped under the world session they were taken in.
///
/// Sessions are ordered newest first; photos within a session oldest first.
/// A trailing group with `world_id: None` collects photos taken before any
/// known world join.
#[derive(Debug, Clone, Serialize)]
pub struct SessionGroup {
    /// World identifier, None for the ungrouped bucket
    pub world_id: Option<String>,

    /// World name, empty for the ungrouped bucket
    pub world_name: String,

    /// Instance identifier, empty for the ungrouped bucket
    pub world_instance_id: String,

    /// Session start, None for the ungrouped bucket
    pub joined_at: Option<NaiveDateTime>,

    /// Photos taken during this session, oldest first
    pub photos: Vec<VRChatPhoto>,
}
