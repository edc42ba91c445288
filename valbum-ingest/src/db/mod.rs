//! Database access for valbum-ingest
//!
//! One module per table. Inserts take a `&mut SqliteConnection` so the
//! persister can run a whole batch inside a single transaction; reads take
//! the pool directly.

pub mod photos;
pub mod player_events;
pub mod world_joins;
