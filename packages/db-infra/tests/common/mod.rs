#![allow(dead_code)]

// tests/common/mod.rs
use db_infra::{DatabaseSettings, ResolvedConfig};

// Logging is auto-installed for every test binary that pulls this module in
#[ctor::ctor]
fn init_logging() {
    test_support::logging::init();
}

/// Database settings resolved the same way the binaries do, pointed at `url`.
pub fn settings_for(url: &str, max_conns: u32) -> DatabaseSettings {
    let max_conns = max_conns.to_string();
    ResolvedConfig::resolve_from(|key| match key {
        "DATABASE_URL" => Some(url.to_string()),
        "DB_MAX_CONNS" => Some(max_conns.clone()),
        _ => None,
    })
    .database
}
