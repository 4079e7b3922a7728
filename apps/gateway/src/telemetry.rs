use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,actix_web=info,sqlx=warn,sea_orm=warn";
const SERVICE_NAME: &str = "gateway";

/// `RUST_LOG` when it is set to something, otherwise the gateway default.
fn filter_directives(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup("RUST_LOG")
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the JSON subscriber for the gateway process.
///
/// A filter that does not parse is reported on stderr and replaced by the
/// default rather than silencing all output.
pub fn init_tracing() {
    let directives = filter_directives(|key| std::env::var(key).ok());
    let env_filter = EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("invalid log filter {directives:?} ({e}); using {DEFAULT_FILTER:?}");
        EnvFilter::new(DEFAULT_FILTER)
    });

    let json_layer = fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_target(false)
        .with_ansi(false);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .try_init()
        .is_err()
    {
        eprintln!("tracing subscriber already installed; keeping the existing one");
        return;
    }

    tracing::info!(service = SERVICE_NAME, filter = %directives, "telemetry=ready");
}
