pub mod error;
pub mod middleware;
pub mod server;
pub mod state;
pub mod telemetry;

use db_infra::{DbPool, ResolvedConfig};
use tracing::info;

pub use error::AppError;
pub use server::build_server;
pub use state::AppState;

/// Open the pool, serve until the server stops, then release the pool.
///
/// The pool is closed on every exit path once it has been opened.
pub async fn run(config: ResolvedConfig) -> Result<(), AppError> {
    let pool = DbPool::open(&config.database).await?;
    info!("gateway=db_connected");

    let server = match build_server(&config.server, AppState::new(pool.clone())) {
        Ok(server) => server,
        Err(e) => {
            pool.close().await;
            return Err(e);
        }
    };
    info!(
        host = %config.server.host,
        port = config.server.port,
        "gateway=listening"
    );

    let served = server.await;
    info!("gateway=stopped");
    pool.close().await;

    served.map_err(AppError::Server)
}
