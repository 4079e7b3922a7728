use migration::{
    get_latest_migration_version, MigrationCommand, MigrationEngine, MigrationOutcome,
    SchemaMigrator,
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{error, info, warn};

use crate::config::settings::{sanitize_db_url, validate_db_url, DatabaseSettings};
use crate::error::DbInfraError;

/// Open a single direct (non-pooled) connection and verify it is alive.
pub async fn build_admin_connection(url: &str) -> Result<DatabaseConnection, DbInfraError> {
    validate_db_url(url)?;

    let mut opt = ConnectOptions::new(url.to_owned());
    opt.min_connections(1)
        .max_connections(1)
        .sqlx_logging(false);

    let conn = Database::connect(opt)
        .await
        .map_err(DbInfraError::connect)?;

    if let Err(e) = conn.ping().await {
        if let Err(close_err) = conn.close().await {
            warn!(error = %close_err, "admin connection close failed after ping failure");
        }
        return Err(DbInfraError::ping(e));
    }

    info!("Successfully connected to database");
    Ok(conn)
}

/// Drive `engine` in the requested direction. "Nothing to do" is a success.
pub async fn run_migration<E>(
    engine: &E,
    command: MigrationCommand,
) -> Result<MigrationOutcome, DbInfraError>
where
    E: MigrationEngine + ?Sized,
{
    info!("migrate=start command={:?}", command);

    let outcome = engine.run(command).await.map_err(|e| {
        error!("migrate=failed command={:?} err={}", command, e);
        DbInfraError::migration(e)
    })?;

    match outcome {
        MigrationOutcome::Applied(n) => info!("migrate=done applied={}", n),
        MigrationOutcome::Reverted(n) => info!("migrate=done reverted={}", n),
        MigrationOutcome::NoChange => info!("migrate=done no_change=true"),
    }

    Ok(outcome)
}

/// Full migration-runner sequence: connect, ping, migrate, disconnect.
pub async fn orchestrate_migration(
    settings: &DatabaseSettings,
    command: MigrationCommand,
) -> Result<MigrationOutcome, DbInfraError> {
    let url = settings.connection_url();
    info!("Connecting to database: {}", sanitize_db_url(&url));

    let conn = build_admin_connection(&url).await?;
    let engine = SchemaMigrator::new(conn.clone());

    let result = run_migration(&engine, command).await;

    if result.is_ok() {
        match get_latest_migration_version(&conn).await {
            Ok(Some(version)) => info!("migrate=version current={}", version),
            Ok(None) => info!("migrate=version current=none"),
            Err(e) => warn!(error = %e, "migrate=version lookup_failed"),
        }
    }

    if let Err(e) = conn.close().await {
        warn!(error = %e, "failed to close admin connection");
    }

    result
}
