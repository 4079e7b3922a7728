pub mod migrate;
pub mod pool;
pub mod txn;

pub use migrate::{build_admin_connection, orchestrate_migration, run_migration};
pub use pool::DbPool;
pub use txn::{with_transaction, TxnError, TxnHandle, TxnSource, UnitOfWork};
