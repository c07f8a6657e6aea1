//! Storage implementations.
//!
//! - [`MemoryStore`]: in-memory, for tests and development
//! - [`SqliteStore`]: file-based SQLite via sqlx

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
