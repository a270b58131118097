//! Persistence layer: SQLite storage and schema migrations (§4.A, §6.2).

mod migrations;
mod sqlite;

pub use sqlite::{default_db_path, sanitize_fts5_query, MemoryQuery, Store, StorageError};
