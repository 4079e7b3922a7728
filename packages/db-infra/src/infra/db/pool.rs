use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, DbErr};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::settings::{sanitize_db_url, validate_db_url, DatabaseSettings};
use crate::error::DbInfraError;
use crate::infra::db::txn::{self, TxnError, TxnSource, UnitOfWork};

/// Shared, bounded pool of database connections.
///
/// Clones are cheap and all refer to the same pool.
#[derive(Clone)]
pub struct DbPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    conn: DatabaseConnection,
    closed: AtomicBool,
    shutdown: CancellationToken,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl DbPool {
    /// Build the pool, verify it answers a ping, and start the health monitor.
    ///
    /// A pool that fails its liveness check is closed before the error is
    /// returned; nothing usable is handed back.
    pub async fn open(settings: &DatabaseSettings) -> Result<Self, DbInfraError> {
        let url = settings.connection_url();
        validate_db_url(&url)?;

        let max_conns = settings.max_conns;
        let min_conns = settings.min_conns.min(max_conns);

        let mut opt = ConnectOptions::new(url.clone());
        opt.max_connections(max_conns)
            .min_connections(min_conns)
            .max_lifetime(settings.max_conn_lifetime)
            .idle_timeout(settings.max_conn_idle_time)
            .sqlx_logging(false);

        info!(
            url = %sanitize_db_url(&url),
            max_conns,
            min_conns,
            max_lifetime_s = settings.max_conn_lifetime.as_secs(),
            idle_timeout_s = settings.max_conn_idle_time.as_secs(),
            "pool=opening"
        );

        let conn = Database::connect(opt)
            .await
            .map_err(DbInfraError::connect)?;

        if let Err(e) = conn.ping().await {
            warn!(error = %e, "pool=ping_failed closing partially opened pool");
            if let Err(close_err) = conn.close().await {
                debug!(error = %close_err, "pool=close_failed after ping failure");
            }
            return Err(DbInfraError::ping(e));
        }

        info!("Successfully connected to database");

        let shutdown = CancellationToken::new();
        let monitor = spawn_health_monitor(
            conn.clone(),
            settings.health_check_period,
            shutdown.clone(),
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                conn,
                closed: AtomicBool::new(false),
                shutdown,
                monitor: Mutex::new(monitor),
            }),
        })
    }

    /// Underlying sea-orm handle for statements that do not need a transaction.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.inner.conn
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// On-demand liveness check.
    pub async fn ping(&self) -> Result<(), DbInfraError> {
        if self.is_closed() {
            return Err(DbInfraError::ping("connection pool is closed"));
        }
        self.inner.conn.ping().await.map_err(DbInfraError::ping)
    }

    /// Stop the health monitor and close every connection.
    ///
    /// Idempotent: only the first call does any work.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            debug!("pool=close already_closed=true");
            return;
        }

        self.inner.shutdown.cancel();
        if let Some(handle) = self.inner.monitor.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "health monitor ended abnormally");
            }
        }

        // Closing any handle closes the shared pool.
        if let Err(e) = self.inner.conn.clone().close().await {
            warn!(error = %e, "pool=close_failed");
        }
        info!("pool=closed");
    }

    /// Run `work` in a transaction on a connection leased from this pool.
    pub async fn with_transaction<F, T, E>(&self, work: F) -> Result<T, TxnError<E>>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> UnitOfWork<'c, T, E> + Send,
        T: Send,
        E: std::error::Error + Send + 'static,
    {
        txn::with_transaction(self, work).await
    }
}

impl fmt::Debug for DbPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbPool")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TxnSource for DbPool {
    type Txn = DatabaseTransaction;

    async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        if self.is_closed() {
            return Err(DbErr::Custom("connection pool is closed".to_string()));
        }
        TxnSource::begin(&self.inner.conn).await
    }
}

fn spawn_health_monitor(
    conn: DatabaseConnection,
    period: Duration,
    shutdown: CancellationToken,
) -> Option<JoinHandle<()>> {
    if period.is_zero() {
        debug!("health_check=disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately and open() has just pinged.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    trace!("health_check=stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match conn.ping().await {
                        Ok(()) => trace!("health_check=ok"),
                        Err(e) => warn!(error = %e, "health_check=failed"),
                    }
                }
            }
        }
    }))
}
