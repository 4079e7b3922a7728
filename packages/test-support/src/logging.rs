//! Test logging bootstrap shared by unit and integration tests.
//!
//! Wire it from a `#[ctor::ctor]` in each test binary; repeated calls are
//! cheap and install nothing new.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

const QUIET: &str = "warn";
const SOURCES: [&str; 2] = ["TEST_LOG", "RUST_LOG"];

static INSTALLED: OnceCell<String> = OnceCell::new();

/// First non-blank of `TEST_LOG`, `RUST_LOG`; `"warn"` otherwise.
pub fn directives(lookup: impl Fn(&str) -> Option<String>) -> String {
    SOURCES
        .iter()
        .find_map(|&key| lookup(key).filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| QUIET.to_string())
}

/// Install the test subscriber once per process and return the directives in
/// effect. Output goes through the test writer so cargo/nextest capture it.
pub fn init() -> &'static str {
    INSTALLED.get_or_init(|| {
        let wanted = directives(|key| std::env::var(key).ok());
        let filter = EnvFilter::try_new(&wanted).unwrap_or_else(|_| EnvFilter::new(QUIET));

        // Some other harness may have installed a subscriber first; keep it.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .compact()
            .try_init();

        wanted
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_log_wins_over_rust_log() {
        let got = directives(|key| match key {
            "TEST_LOG" => Some("db_infra=debug".to_string()),
            "RUST_LOG" => Some("info".to_string()),
            _ => None,
        });
        assert_eq!(got, "db_infra=debug");
    }

    #[test]
    fn test_blank_test_log_falls_through() {
        let got = directives(|key| match key {
            "TEST_LOG" => Some(String::new()),
            "RUST_LOG" => Some("info".to_string()),
            _ => None,
        });
        assert_eq!(got, "info");
        assert_eq!(directives(|_| None), "warn");
    }

    #[test]
    fn test_init_is_idempotent() {
        let first = init();
        let second = init();
        assert!(std::ptr::eq(first, second));
    }
}
