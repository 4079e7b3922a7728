use db_infra::{load_env_file, ResolvedConfig};
use gateway::telemetry;
use tracing::error;

#[actix_web::main]
async fn main() {
    telemetry::init_tracing();

    // Values already present in the process environment win over .env.
    load_env_file();
    let config = ResolvedConfig::resolve();

    if let Err(e) = gateway::run(config).await {
        error!(error = %e, "gateway=fatal");
        std::process::exit(1);
    }
}
