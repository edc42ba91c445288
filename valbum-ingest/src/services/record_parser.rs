//! Store line parsing
//!
//! Turns filtered store lines into typed records. The parser is a small state
//! machine because a world join spans two consecutive lines in client logs:
//!
//! ```text
//! 2024.01.15 23:02:45 Log -  [Behaviour] Joining wrld_abc:12345~region(jp)
//! 2024.01.15 23:02:45 Log -  [Behaviour] Joining or Creating Room: Some World
//! ```
//!
//! The first line carries the world and instance ids, the second the display
//! name. The record timestamp is the id line's. An id line never followed by
//! a room line (client killed between the two writes) is dropped with a
//! warning; the pair will parse whole on a later pass once both lines are in
//! the store.
//!
//! Photo timestamps come from the screenshot filename, which has millisecond
//! resolution in both filename layouts the client has used:
//!
//! ```text
//! VRChat_2024-01-15_23-15-33.123_1920x1080.png   (current)
//! VRChat_1920x1080_2024-01-15_23-15-33.123.png   (legacy)
//! ```

use crate::models::{PlayerJoinLog, PlayerLeaveLog, VRChatPhoto, WorldJoinLog};
use crate::services::line_extractor::RawLogLine;
use chrono::NaiveDateTime;
use tracing::{debug, warn};

const ANALYTICS_MARKER: &str = "VRC Analytics Initialized";
const WORLD_ID_MARKER: &str = "[Behaviour] Joining wrld_";
const ROOM_NAME_MARKER: &str = "[Behaviour] Joining or Creating Room: ";
const PLAYER_JOINED_MARKER: &str = "[Behaviour] OnPlayerJoined ";
const PLAYER_LEFT_MARKER: &str = "[Behaviour] OnPlayerLeft ";
const APP_QUIT_MARKER: &str = "VRCApplication: HandleApplicationQuit";
const SCREENSHOT_MARKER: &str = "[VRC Camera] Took screenshot to: ";

/// Timestamp layout inside screenshot filenames.
const PHOTO_FILENAME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S%.3f";

/// One parsed store line
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLogEvent {
    WorldJoin(WorldJoinLog),
    PlayerJoin(PlayerJoinLog),
    PlayerLeave(PlayerLeaveLog),
    Photo(VRChatPhoto),
    /// Client launch (`VRC Analytics Initialized`)
    SessionStart { at: NaiveDateTime },
    /// Clean client shutdown
    AppQuit { at: NaiveDateTime },
}

/// First half of a world join, waiting for its room name line
#[derive(Debug)]
struct PendingWorldJoin {
    world_id: String,
    world_instance_id: String,
    joined_at: NaiveDateTime,
}

/// Store line parser
///
/// Feed lines in store order via [`parse_line`](Self::parse_line), then call
/// [`finish`](Self::finish) to flush pairing state.
#[derive(Debug, Default)]
pub struct RecordParser {
    pending_join: Option<PendingWorldJoin>,
}

impl RecordParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one line. Returns None for lines that complete later (the world
    /// id half of a join) and for lines no shape matches.
    pub fn parse_line(&mut self, line: &RawLogLine) -> Option<ParsedLogEvent> {
        let text = line.text.as_str();
        let at = line.timestamp;

        // Room name line: completes a pending world join
        if let Some(rest) = substring_after(text, ROOM_NAME_MARKER) {
            return match self.pending_join.take() {
                Some(pending) => Some(ParsedLogEvent::WorldJoin(WorldJoinLog::new(
                    pending.world_id,
                    rest.trim().to_string(),
                    pending.world_instance_id,
                    pending.joined_at,
                ))),
                None => {
                    warn!("Room name line with no preceding world id line: {}", text);
                    None
                }
            };
        }

        if let Some(rest) = substring_after(text, WORLD_ID_MARKER) {
            match parse_world_ref(rest.trim()) {
                Some((world_id, world_instance_id)) => {
                    if let Some(orphan) = self.pending_join.replace(PendingWorldJoin {
                        world_id,
                        world_instance_id,
                        joined_at: at,
                    }) {
                        warn!(
                            "World join for {} never got a room name line, dropped",
                            orphan.world_id
                        );
                    }
                }
                None => debug!("Unparseable world reference: {}", text),
            }
            return None;
        }

        if let Some(rest) = substring_after(text, PLAYER_JOINED_MARKER) {
            let (player_name, player_id) = parse_player(rest.trim())?;
            return Some(ParsedLogEvent::PlayerJoin(PlayerJoinLog::new(
                player_id,
                player_name,
                at,
            )));
        }

        if let Some(rest) = substring_after(text, PLAYER_LEFT_MARKER) {
            let (player_name, player_id) = parse_player(rest.trim())?;
            return Some(ParsedLogEvent::PlayerLeave(PlayerLeaveLog::new(
                player_id,
                player_name,
                at,
            )));
        }

        if let Some(rest) = substring_after(text, SCREENSHOT_MARKER) {
            let path = rest.trim();
            return match parse_photo_filename(path) {
                Some((taken_at, width, height)) => Some(ParsedLogEvent::Photo(VRChatPhoto::new(
                    path.to_string(),
                    taken_at,
                    width,
                    height,
                ))),
                None => {
                    debug!("Screenshot path without a parseable filename: {}", path);
                    None
                }
            };
        }

        if text.contains(APP_QUIT_MARKER) {
            return Some(ParsedLogEvent::AppQuit { at });
        }

        if text.contains(ANALYTICS_MARKER) {
            return Some(ParsedLogEvent::SessionStart { at });
        }

        None
    }

    /// Flush pairing state at end of input.
    pub fn finish(&mut self) {
        if let Some(orphan) = self.pending_join.take() {
            warn!(
                "World join for {} never got a room name line, dropped",
                orphan.world_id
            );
        }
    }
}

/// The remainder of `text` after `marker`, if the marker occurs.
fn substring_after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    text.find(marker).map(|i| &text[i + marker.len()..])
}

/// Parse `abc123:12345~region(jp)` (the part after `wrld_`) into the full
/// world id and the instance id with its access tags intact.
fn parse_world_ref(rest: &str) -> Option<(String, String)> {
    let (id_part, instance) = rest.split_once(':')?;
    if id_part.is_empty() || instance.is_empty() {
        return None;
    }
    Some((format!("wrld_{}", id_part), instance.to_string()))
}

/// Parse `DisplayName (usr_...)` into name and optional id. Older client
/// versions logged the bare display name, and display names may themselves
/// contain parentheses, so the id is taken from the last `(usr_` group only.
fn parse_player(rest: &str) -> Option<(String, Option<String>)> {
    if rest.is_empty() {
        return None;
    }
    if rest.ends_with(')') {
        if let Some(open) = rest.rfind("(usr_") {
            let name = rest[..open].trim();
            let id = &rest[open + 1..rest.len() - 1];
            if !name.is_empty() {
                return Some((name.to_string(), Some(id.to_string())));
            }
        }
    }
    Some((rest.to_string(), None))
}

/// Extract capture time and dimensions from a screenshot path.
///
/// Paths in client logs are Windows-style; splitting on both separator kinds
/// keeps this host-independent.
fn parse_photo_filename(path: &str) -> Option<(NaiveDateTime, u32, u32)> {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (stem, _ext) = file_name.rsplit_once('.')?;
    let rest = stem.strip_prefix("VRChat_")?;

    // Current layout: timestamp first, dimensions last
    if let Some((ts_part, dims_part)) = rest.rsplit_once('_') {
        if let Some((width, height)) = parse_dimensions(dims_part) {
            let taken_at = NaiveDateTime::parse_from_str(ts_part, PHOTO_FILENAME_FORMAT).ok()?;
            return Some((taken_at, width, height));
        }
    }

    // Legacy layout: dimensions first, timestamp last
    let (dims_part, ts_part) = rest.split_once('_')?;
    let (width, height) = parse_dimensions(dims_part)?;
    let taken_at = NaiveDateTime::parse_from_str(ts_part, PHOTO_FILENAME_FORMAT).ok()?;
    Some((taken_at, width, height))
}

/// Parse `1920x1080`.
fn parse_dimensions(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.split_once('x')?;
    let width: u32 = w.parse().ok()?;
    let height: u32 = h.parse().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn raw(ts: &str, text: &str) -> RawLogLine {
        RawLogLine {
            timestamp: NaiveDateTime::parse_from_str(ts, "%Y.%m.%d %H:%M:%S").unwrap(),
            text: text.to_string(),
            source_file: PathBuf::from("logStore-2024-01.txt"),
        }
    }

    fn parse_all(lines: &[RawLogLine]) -> Vec<ParsedLogEvent> {
        let mut parser = RecordParser::new();
        let mut events = Vec::new();
        for line in lines {
            if let Some(ev) = parser.parse_line(line) {
                events.push(ev);
            }
        }
        parser.finish();
        events
    }

    #[test]
    fn test_world_join_pairs_two_lines() {
        let events = parse_all(&[
            raw(
                "2024.01.15 23:02:45",
                "2024.01.15 23:02:45 Log        -  [Behaviour] Joining wrld_abc-123:12345~region(jp)",
            ),
            raw(
                "2024.01.15 23:02:46",
                "2024.01.15 23:02:46 Log        -  [Behaviour] Joining or Creating Room: The Great Pug",
            ),
        ]);

        assert_eq!(events.len(), 1);
        let ParsedLogEvent::WorldJoin(join) = &events[0] else {
            panic!("expected world join, got {:?}", events[0]);
        };
        assert_eq!(join.world_id, "wrld_abc-123");
        assert_eq!(join.world_name, "The Great Pug");
        assert_eq!(join.world_instance_id, "12345~region(jp)");
        // Timestamp of the id line, not the room line
        assert_eq!(
            join.joined_at,
            NaiveDateTime::parse_from_str("2024.01.15 23:02:45", "%Y.%m.%d %H:%M:%S").unwrap()
        );
    }

    #[test]
    fn test_orphan_room_name_line_is_dropped() {
        let events = parse_all(&[raw(
            "2024.01.15 23:02:46",
            "2024.01.15 23:02:46 Log        -  [Behaviour] Joining or Creating Room: Lost World",
        )]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_unpaired_world_id_line_is_dropped() {
        let events = parse_all(&[
            raw(
                "2024.01.15 23:02:45",
                "2024.01.15 23:02:45 Log        -  [Behaviour] Joining wrld_abc:111",
            ),
            raw(
                "2024.01.15 23:05:00",
                "2024.01.15 23:05:00 Log        -  [Behaviour] OnPlayerJoined Alice",
            ),
        ]);
        // Only the player join survives
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ParsedLogEvent::PlayerJoin(_)));
    }

    #[test]
    fn test_second_world_id_replaces_pending() {
        let events = parse_all(&[
            raw(
                "2024.01.15 23:02:45",
                "2024.01.15 23:02:45 Log        -  [Behaviour] Joining wrld_first:1",
            ),
            raw(
                "2024.01.15 23:03:00",
                "2024.01.15 23:03:00 Log        -  [Behaviour] Joining wrld_second:2",
            ),
            raw(
                "2024.01.15 23:03:01",
                "2024.01.15 23:03:01 Log        -  [Behaviour] Joining or Creating Room: Second World",
            ),
        ]);
        assert_eq!(events.len(), 1);
        let ParsedLogEvent::WorldJoin(join) = &events[0] else {
            panic!("expected world join");
        };
        assert_eq!(join.world_id, "wrld_second");
    }

    #[test]
    fn test_player_join_with_and_without_id() {
        let events = parse_all(&[
            raw(
                "2024.01.15 23:05:00",
                "2024.01.15 23:05:00 Log        -  [Behaviour] OnPlayerJoined Alice (usr_8f3a2c1d-0000-1111-2222-333344445555)",
            ),
            raw(
                "2024.01.15 23:05:01",
                "2024.01.15 23:05:01 Log        -  [Behaviour] OnPlayerJoined Bob",
            ),
        ]);

        let ParsedLogEvent::PlayerJoin(alice) = &events[0] else {
            panic!("expected player join");
        };
        assert_eq!(alice.player_name, "Alice");
        assert_eq!(
            alice.player_id.as_deref(),
            Some("usr_8f3a2c1d-0000-1111-2222-333344445555")
        );

        let ParsedLogEvent::PlayerJoin(bob) = &events[1] else {
            panic!("expected player join");
        };
        assert_eq!(bob.player_name, "Bob");
        assert!(bob.player_id.is_none());
    }

    #[test]
    fn test_player_name_with_parentheses() {
        let events = parse_all(&[raw(
            "2024.01.15 23:05:00",
            "2024.01.15 23:05:00 Log        -  [Behaviour] OnPlayerJoined Alice (she) (usr_abc)",
        )]);
        let ParsedLogEvent::PlayerJoin(join) = &events[0] else {
            panic!("expected player join");
        };
        assert_eq!(join.player_name, "Alice (she)");
        assert_eq!(join.player_id.as_deref(), Some("usr_abc"));
    }

    #[test]
    fn test_player_left_room_is_not_a_player_leave() {
        let events = parse_all(&[raw(
            "2024.01.15 23:10:00",
            "2024.01.15 23:10:00 Log        -  [Behaviour] OnPlayerLeftRoom",
        )]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_player_leave() {
        let events = parse_all(&[raw(
            "2024.01.15 23:10:00",
            "2024.01.15 23:10:00 Log        -  [Behaviour] OnPlayerLeft Alice (usr_abc)",
        )]);
        let ParsedLogEvent::PlayerLeave(leave) = &events[0] else {
            panic!("expected player leave");
        };
        assert_eq!(leave.player_name, "Alice");
    }

    #[test]
    fn test_photo_current_filename_layout() {
        let events = parse_all(&[raw(
            "2024.01.15 23:15:34",
            r"2024.01.15 23:15:34 Log        -  [VRC Camera] Took screenshot to: C:\Users\me\Pictures\VRChat\2024-01\VRChat_2024-01-15_23-15-33.123_1920x1080.png",
        )]);
        let ParsedLogEvent::Photo(photo) = &events[0] else {
            panic!("expected photo");
        };
        assert_eq!(photo.width, 1920);
        assert_eq!(photo.height, 1080);
        assert_eq!(
            photo.taken_at,
            NaiveDateTime::parse_from_str("2024-01-15_23-15-33.123", PHOTO_FILENAME_FORMAT)
                .unwrap()
        );
        assert!(photo.photo_path.ends_with("VRChat_2024-01-15_23-15-33.123_1920x1080.png"));
    }

    #[test]
    fn test_photo_legacy_filename_layout() {
        let events = parse_all(&[raw(
            "2024.01.15 23:15:34",
            r"2024.01.15 23:15:34 Log        -  [VRC Camera] Took screenshot to: C:\Pictures\VRChat_1920x1080_2024-01-15_23-15-33.123.png",
        )]);
        let ParsedLogEvent::Photo(photo) = &events[0] else {
            panic!("expected photo");
        };
        assert_eq!((photo.width, photo.height), (1920, 1080));
        assert_eq!(
            photo.taken_at,
            NaiveDateTime::parse_from_str("2024-01-15_23-15-33.123", PHOTO_FILENAME_FORMAT)
                .unwrap()
        );
    }

    #[test]
    fn test_photo_with_unparseable_filename_is_dropped() {
        let events = parse_all(&[raw(
            "2024.01.15 23:15:34",
            r"2024.01.15 23:15:34 Log        -  [VRC Camera] Took screenshot to: C:\Pictures\renamed.png",
        )]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_session_markers() {
        let events = parse_all(&[
            raw(
                "2024.01.15 23:00:00",
                "2024.01.15 23:00:00 Log        -  VRC Analytics Initialized",
            ),
            raw(
                "2024.01.15 23:59:00",
                "2024.01.15 23:59:00 Log        -  VRCApplication: HandleApplicationQuit",
            ),
        ]);
        assert!(matches!(events[0], ParsedLogEvent::SessionStart { .. }));
        assert!(matches!(events[1], ParsedLogEvent::AppQuit { .. }));
    }

    #[test]
    fn test_unrecognized_line_is_ignored() {
        let events = parse_all(&[raw(
            "2024.01.15 23:00:00",
            "2024.01.15 23:00:00 Log        -  [Network] Measure Server ping",
        )]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_world_ref_parsing() {
        assert_eq!(
            parse_world_ref("abc:123"),
            Some(("wrld_abc".to_string(), "123".to_string()))
        );
        assert_eq!(
            parse_world_ref("abc:123~private(usr_x)~region(jp)"),
            Some((
                "wrld_abc".to_string(),
                "123~private(usr_x)~region(jp)".to_string()
            ))
        );
        assert_eq!(parse_world_ref("abc"), None);
        assert_eq!(parse_world_ref(":123"), None);
    }
}
