//! Test support utilities
//!
//! Shared by the unit and integration tests of every workspace member:
//! idempotent logging initialisation and throwaway SQLite databases.

pub mod logging;
pub mod sqlite;

pub use sqlite::TempSqlite;
