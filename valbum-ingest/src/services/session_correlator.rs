//! Photo/session correlation
//!
//! Pure function: no I/O, no clock. Each photo belongs to the nearest world
//! join at or before its capture time. Photos older than every known join
//! land in a trailing ungrouped bucket.
//!
//! Both inputs are sorted ascending, then a single two-pointer sweep assigns
//! photos, so the whole grouping is O(n log n) in sorts and O(n) in the
//! sweep. Output order is newest session first; photos within a session stay
//! oldest first.

use crate::models::{SessionGroup, VRChatPhoto, WorldJoinLog};

/// Group photos under the world sessions they were taken in.
///
/// Every input photo appears in exactly one group. Sessions without photos
/// are kept; an album wants to show where you went even when the camera
/// stayed holstered. The ungrouped bucket appears only when needed, after
/// all sessions.
pub fn correlate(photos: Vec<VRChatPhoto>, joins: Vec<WorldJoinLog>) -> Vec<SessionGroup> {
    let mut photos = photos;
    photos.sort_by(|a, b| a.taken_at.cmp(&b.taken_at));

    let mut joins = joins;
    joins.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));

    let mut groups: Vec<SessionGroup> = joins
        .into_iter()
        .map(|join| SessionGroup {
            world_id: Some(join.world_id),
            world_name: join.world_name,
            world_instance_id: join.world_instance_id,
            joined_at: Some(join.joined_at),
            photos: Vec::new(),
        })
        .collect();

    let mut ungrouped = Vec::new();
    let mut current: Option<usize> = None;

    for photo in photos {
        // Advance to the newest session that started at or before this photo
        let mut next = current.map(|i| i + 1).unwrap_or(0);
        while next < groups.len() {
            match groups[next].joined_at {
                Some(joined_at) if joined_at <= photo.taken_at => {
                    current = Some(next);
                    next += 1;
                }
                _ => break,
            }
        }

        match current {
            Some(i) => groups[i].photos.push(photo),
            None => ungrouped.push(photo),
        }
    }

    // Newest session first; in-session photo order stays oldest first
    groups.reverse();

    if !ungrouped.is_empty() {
        groups.push(SessionGroup {
            world_id: None,
            world_name: String::new(),
            world_instance_id: String::new(),
            joined_at: None,
            photos: ungrouped,
        });
    }

    groups
}
