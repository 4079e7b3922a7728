use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;

use async_trait::async_trait;
use futures::FutureExt;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Boxed future returned by a unit of work; borrows the transaction for `'c`.
pub type UnitOfWork<'c, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>;

/// Something that can open a transaction on a leased connection.
#[async_trait]
pub trait TxnSource: Send + Sync {
    type Txn: TxnHandle;

    async fn begin(&self) -> Result<Self::Txn, DbErr>;
}

/// An open transaction. Both terminal operations consume the handle, which
/// hands the leased connection back to its pool.
#[async_trait]
pub trait TxnHandle: Send + Sync + Sized {
    async fn commit(self) -> Result<(), DbErr>;

    async fn rollback(self) -> Result<(), DbErr>;
}

#[derive(Debug, Error)]
pub enum TxnError<E>
where
    E: std::error::Error + 'static,
{
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] DbErr),
    #[error(transparent)]
    Work(E),
    #[error("tx failed: {original}, rollback failed: {rollback}")]
    Rollback {
        original: E,
        #[source]
        rollback: DbErr,
    },
    #[error("failed to commit transaction: {0}")]
    Commit(#[source] DbErr),
}

impl<E> TxnError<E>
where
    E: std::error::Error + 'static,
{
    /// The unit of work's own error, if that is what ended the transaction.
    pub fn work(&self) -> Option<&E> {
        match self {
            TxnError::Work(e) | TxnError::Rollback { original: e, .. } => Some(e),
            TxnError::Begin(_) | TxnError::Commit(_) => None,
        }
    }

    pub fn into_work(self) -> Option<E> {
        match self {
            TxnError::Work(e) | TxnError::Rollback { original: e, .. } => Some(e),
            TxnError::Begin(_) | TxnError::Commit(_) => None,
        }
    }
}

/// Run `work` inside a single transaction leased from `source`.
///
/// - `Ok` from the unit of work commits.
/// - `Err` rolls back and returns the error untouched; if the rollback also
///   fails both errors come back together in [`TxnError::Rollback`].
/// - A panic rolls back and then resumes unwinding into the caller.
///
/// Exactly one of commit or rollback is attempted once `begin` succeeds. If the
/// returned future is dropped mid-flight the transaction handle is dropped with
/// it and the driver rolls back on return to the pool.
pub async fn with_transaction<S, F, T, E>(source: &S, work: F) -> Result<T, TxnError<E>>
where
    S: TxnSource + ?Sized,
    F: for<'c> FnOnce(&'c S::Txn) -> UnitOfWork<'c, T, E> + Send,
    T: Send,
    E: std::error::Error + Send + 'static,
{
    let txn = source.begin().await.map_err(TxnError::Begin)?;
    debug!("txn=begin");

    // Building the future runs caller code too, so it sits inside the guard.
    let handle = &txn;
    let outcome = AssertUnwindSafe(async move { work(handle).await })
        .catch_unwind()
        .await;

    match outcome {
        Err(panic) => {
            error!("txn=panic action=rollback");
            if let Err(rollback_err) = txn.rollback().await {
                error!(error = %rollback_err, "txn=rollback_failed after panic");
            }
            std::panic::resume_unwind(panic)
        }
        Ok(Err(err)) => {
            warn!(error = %err, "txn=rollback reason=work_error");
            match txn.rollback().await {
                Ok(()) => Err(TxnError::Work(err)),
                Err(rollback_err) => {
                    error!(error = %err, rollback_error = %rollback_err, "txn=rollback_failed");
                    Err(TxnError::Rollback {
                        original: err,
                        rollback: rollback_err,
                    })
                }
            }
        }
        Ok(Ok(value)) => match txn.commit().await {
            Ok(()) => {
                debug!("txn=commit");
                Ok(value)
            }
            Err(commit_err) => {
                error!(error = %commit_err, "txn=commit_failed");
                Err(TxnError::Commit(commit_err))
            }
        },
    }
}

#[async_trait]
impl TxnSource for DatabaseConnection {
    type Txn = DatabaseTransaction;

    async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        TransactionTrait::begin(self).await
    }
}

/// Nested units of work run on a savepoint of the outer transaction.
#[async_trait]
impl TxnSource for DatabaseTransaction {
    type Txn = DatabaseTransaction;

    async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        TransactionTrait::begin(self).await
    }
}

#[async_trait]
impl TxnHandle for DatabaseTransaction {
    async fn commit(self) -> Result<(), DbErr> {
        DatabaseTransaction::commit(self).await
    }

    async fn rollback(self) -> Result<(), DbErr> {
        DatabaseTransaction::rollback(self).await
    }
}
