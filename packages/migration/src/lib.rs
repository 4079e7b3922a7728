pub use sea_orm_migration::prelude::*;
pub use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseConnection};

mod m20251016_000001_init; // keep filename + module name in sync

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20251016_000001_init::Migration)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationCommand {
    /// Apply every pending migration.
    Up,
    /// Revert the most recently applied migration.
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    Applied(usize),
    Reverted(usize),
    /// Nothing to do; the schema was already where the command would take it.
    NoChange,
}

/// Narrow capability the migration runner depends on.
///
/// File discovery, ordering and bookkeeping belong to the implementation.
#[async_trait::async_trait]
pub trait MigrationEngine: Send + Sync {
    async fn apply_forward(&self) -> Result<MigrationOutcome, DbErr>;

    async fn apply_backward(&self) -> Result<MigrationOutcome, DbErr>;

    async fn run(&self, command: MigrationCommand) -> Result<MigrationOutcome, DbErr> {
        match command {
            MigrationCommand::Up => self.apply_forward().await,
            MigrationCommand::Down => self.apply_backward().await,
        }
    }
}

/// [`MigrationEngine`] over the compiled-in [`Migrator`] set.
#[derive(Debug, Clone)]
pub struct SchemaMigrator {
    db: DatabaseConnection,
}

impl SchemaMigrator {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl MigrationEngine for SchemaMigrator {
    async fn apply_forward(&self) -> Result<MigrationOutcome, DbErr> {
        let pending = count_pending_migrations(&self.db).await?;
        tracing::info!(
            "▶ up: {} migration(s) defined, {} pending",
            Migrator::migrations().len(),
            pending
        );
        if pending == 0 {
            return Ok(MigrationOutcome::NoChange);
        }

        Migrator::up(&self.db, None).await?;
        Ok(MigrationOutcome::Applied(pending))
    }

    async fn apply_backward(&self) -> Result<MigrationOutcome, DbErr> {
        let applied = count_applied_migrations(&self.db).await?;
        tracing::info!("▶ down: {} migration(s) applied", applied);
        if applied == 0 {
            return Ok(MigrationOutcome::NoChange);
        }

        Migrator::down(&self.db, Some(1)).await?;
        Ok(MigrationOutcome::Reverted(1))
    }
}

/// Count the number of migrations that have been applied to the database.
/// Returns 0 if the migration table doesn't exist yet.
pub async fn count_applied_migrations(db: &DatabaseConnection) -> Result<usize, DbErr> {
    match Migrator::get_applied_migrations(db).await {
        Ok(migrations) => Ok(migrations.len()),
        Err(DbErr::Exec(_)) => Ok(0), // Migration table doesn't exist yet
        Err(e) => Err(e),
    }
}

/// Count the migrations defined in [`Migrator`] that have not been applied.
pub async fn count_pending_migrations(db: &DatabaseConnection) -> Result<usize, DbErr> {
    match Migrator::get_pending_migrations(db).await {
        Ok(migrations) => Ok(migrations.len()),
        Err(DbErr::Exec(_)) => Ok(Migrator::migrations().len()),
        Err(e) => Err(e),
    }
}

/// Get the version string of the latest applied migration.
/// Returns None if no migrations have been applied or the migration table doesn't exist.
pub async fn get_latest_migration_version(
    db: &DatabaseConnection,
) -> Result<Option<String>, DbErr> {
    match Migrator::get_applied_migrations(db).await {
        Ok(migrations) => Ok(migrations.last().map(|m| m.name().to_string())),
        Err(DbErr::Exec(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use sea_orm_migration::sea_orm::{ConnectOptions, Database};
    use test_support::TempSqlite;

    use super::*;

    async fn sqlite_db(file: &TempSqlite) -> DatabaseConnection {
        let mut opt = ConnectOptions::new(file.url());
        opt.max_connections(1).sqlx_logging(false);
        Database::connect(opt).await.unwrap()
    }

    #[tokio::test]
    async fn test_up_then_up_again_is_no_change() {
        let file = TempSqlite::new();
        let db = sqlite_db(&file).await;
        let engine = SchemaMigrator::new(db.clone());

        let first = engine.run(MigrationCommand::Up).await.unwrap();
        assert_eq!(first, MigrationOutcome::Applied(Migrator::migrations().len()));
        assert_eq!(
            count_applied_migrations(&db).await.unwrap(),
            Migrator::migrations().len()
        );

        let second = engine.run(MigrationCommand::Up).await.unwrap();
        assert_eq!(second, MigrationOutcome::NoChange);
    }

    #[tokio::test]
    async fn test_down_reverts_latest_then_no_change() {
        let file = TempSqlite::new();
        let db = sqlite_db(&file).await;
        let engine = SchemaMigrator::new(db.clone());

        engine.apply_forward().await.unwrap();
        assert_eq!(
            get_latest_migration_version(&db).await.unwrap().as_deref(),
            Some("m20251016_000001_init")
        );

        let reverted = engine.apply_backward().await.unwrap();
        assert_eq!(reverted, MigrationOutcome::Reverted(1));
        assert_eq!(count_applied_migrations(&db).await.unwrap(), 0);

        let again = engine.apply_backward().await.unwrap();
        assert_eq!(again, MigrationOutcome::NoChange);
    }

    #[tokio::test]
    async fn test_fresh_database_reports_everything_pending() {
        let file = TempSqlite::new();
        let db = sqlite_db(&file).await;

        assert_eq!(
            count_pending_migrations(&db).await.unwrap(),
            Migrator::migrations().len()
        );
        assert_eq!(get_latest_migration_version(&db).await.unwrap(), None);
    }
}
