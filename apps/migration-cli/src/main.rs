use clap::{Parser, ValueEnum};
use db_infra::{load_env_file, orchestrate_migration, ResolvedConfig};
use migration::{MigrationCommand, MigrationOutcome};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Direction {
    /// Apply all pending migrations
    Up,
    /// Revert the most recently applied migration
    Down,
}

impl From<Direction> for MigrationCommand {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => MigrationCommand::Up,
            Direction::Down => MigrationCommand::Down,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "migrate")]
#[command(about = "Gateway database migration tool")]
struct Args {
    /// Migration direction
    #[arg(value_enum)]
    direction: Direction,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .without_time()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_env_filter("migration=info,db_infra=info,migrate=info,sqlx=warn")
        .init();

    // Usage errors are fatal before any configuration is read or any
    // connection is attempted.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.use_stderr() {
                eprintln!("{e}");
                eprintln!("Please provide a migration direction: 'up' or 'down'");
                std::process::exit(2);
            }
            // --help / --version
            print!("{e}");
            return;
        }
    };

    load_env_file();
    let config = ResolvedConfig::resolve();

    match orchestrate_migration(&config.database, args.direction.into()).await {
        Ok(MigrationOutcome::NoChange) => info!("No migrations to run; schema is up to date"),
        Ok(MigrationOutcome::Applied(n)) => info!("Migrations applied successfully ({n})"),
        Ok(MigrationOutcome::Reverted(n)) => info!("Migrations rolled back successfully ({n})"),
        Err(e) => {
            error!("Migration failed: {e}");
            std::process::exit(1);
        }
    }
}
