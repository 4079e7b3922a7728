//! Shared database configuration, pooling, transactions and migration infrastructure.
//! Used by the gateway and the migration CLI.

pub mod config;
pub mod error;
pub mod infra;

pub use config::env_file::load_env_file;
pub use config::settings::{
    sanitize_db_url, validate_db_url, DatabaseSettings, ResolvedConfig, ServerSettings,
};
pub use error::DbInfraError;
pub use infra::db::migrate::{build_admin_connection, orchestrate_migration, run_migration};
pub use infra::db::pool::DbPool;
pub use infra::db::txn::{with_transaction, TxnError, TxnHandle, TxnSource, UnitOfWork};
pub use migration::{MigrationCommand, MigrationEngine, MigrationOutcome};

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_support::logging::init();
}
