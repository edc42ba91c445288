//! HTTP API endpoints
//!
//! Endpoints:
//! - `GET /health` - Health check
//! - `POST /api/sync` - Run a full or incremental log sync
//! - `POST /api/import` - Import external log store files (with backup)
//! - `GET /api/import/backups` - List import backup history
//! - `POST /api/import/rollback` - Roll back to a pre-import backup
//! - `POST /api/export` - Export the log store to a folder
//! - `GET /api/sessions` - Photos grouped into world join sessions

pub mod health;
pub mod import;
pub mod sessions;
pub mod sync;
