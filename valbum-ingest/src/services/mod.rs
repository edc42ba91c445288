//! Service modules for the log ingestion pipeline
//!
//! Data flows extractor → store → parser → persister; the orchestrator wires
//! them together, the import manager wraps them with backup bookkeeping, and
//! the correlator works on persisted records only.

pub mod import_manager;
pub mod line_extractor;
pub mod log_store;
pub mod persister;
pub mod record_parser;
pub mod session_correlator;
pub mod sync_orchestrator;

pub use import_manager::{ImportError, ImportManager, RollbackError};
pub use line_extractor::{ExtractError, LineExtractor, RawLogLine, DEFAULT_INCLUDE_PATTERNS};
pub use log_store::{AppendOutcome, LogStoreWriter, StoreError, MAX_STORE_FILE_BYTES};
pub use persister::{PersistError, Persister};
pub use record_parser::{ParsedLogEvent, RecordParser};
pub use session_correlator::correlate;
pub use sync_orchestrator::{SyncError, SyncOrchestrator};
