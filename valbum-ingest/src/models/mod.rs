//! Data models for valbum-ingest

pub mod backup;
pub mod records;
pub mod sync;

pub use backup::{BackupStatus, ExportOutcome, ImportBackupRecord, ImportOutcome};
pub use records::{PlayerJoinLog, PlayerLeaveLog, SessionGroup, VRChatPhoto, WorldJoinLog};
pub use sync::{SyncMode, SyncOutcome};
