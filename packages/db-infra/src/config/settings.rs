use std::fmt;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

use crate::error::DbInfraError;

// Server defaults
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

// Database defaults
pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_USER: &str = "username";
pub const DEFAULT_DB_PASSWORD: &str = "password";
pub const DEFAULT_DB_NAME: &str = "dbname";
pub const DEFAULT_DB_SSL_MODE: &str = "disable";
pub const DEFAULT_MAX_CONNS: u32 = 25;

// Fixed pool shape
pub const MIN_CONNS: u32 = 5;
pub const MAX_CONN_LIFETIME: Duration = Duration::from_secs(60 * 60);
pub const MAX_CONN_IDLE_TIME: Duration = Duration::from_secs(30 * 60);
pub const HEALTH_CHECK_PERIOD: Duration = Duration::from_secs(60);

/// Characters that must be escaped inside the userinfo part of a connection URL.
const USERINFO: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Immutable settings snapshot resolved once at process start.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub database: DatabaseSettings,
    pub server: ServerSettings,
}

#[derive(Clone, PartialEq)]
pub struct DatabaseSettings {
    /// Full connection string from `DATABASE_URL`; wins over every field below.
    pub url_override: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub db_name: String,
    pub ssl_mode: String,
    pub max_conns: u32,
    pub min_conns: u32,
    pub max_conn_lifetime: Duration,
    pub max_conn_idle_time: Duration,
    pub health_check_period: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl ResolvedConfig {
    /// Resolve settings from the current process environment.
    pub fn resolve() -> Self {
        Self::resolve_from(|key| std::env::var(key).ok())
    }

    /// Resolve settings from an arbitrary variable snapshot.
    ///
    /// Never fails: unset, empty, or unparseable values take their default.
    pub fn resolve_from<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = ServerSettings {
            host: string_or(&lookup, "SERVER_HOST", DEFAULT_SERVER_HOST),
            port: port_or(&lookup, "SERVER_PORT", DEFAULT_SERVER_PORT),
            read_timeout: duration_or(&lookup, "SERVER_READ_TIMEOUT", DEFAULT_READ_TIMEOUT),
            write_timeout: duration_or(&lookup, "SERVER_WRITE_TIMEOUT", DEFAULT_WRITE_TIMEOUT),
        };

        let database = DatabaseSettings {
            url_override: non_empty(&lookup, "DATABASE_URL"),
            host: string_or(&lookup, "DB_HOST", DEFAULT_DB_HOST),
            port: port_or(&lookup, "DB_PORT", DEFAULT_DB_PORT),
            user: string_or(&lookup, "DB_USER", DEFAULT_DB_USER),
            password: string_or(&lookup, "DB_PASSWORD", DEFAULT_DB_PASSWORD),
            db_name: string_or(&lookup, "DB_NAME", DEFAULT_DB_NAME),
            ssl_mode: string_or(&lookup, "DB_SSL_MODE", DEFAULT_DB_SSL_MODE),
            max_conns: non_empty(&lookup, "DB_MAX_CONNS")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_CONNS),
            min_conns: MIN_CONNS,
            max_conn_lifetime: MAX_CONN_LIFETIME,
            max_conn_idle_time: MAX_CONN_IDLE_TIME,
            health_check_period: HEALTH_CHECK_PERIOD,
        };

        Self { database, server }
    }
}

impl DatabaseSettings {
    /// Connection string for this database.
    ///
    /// `DATABASE_URL` short-circuits; otherwise the URL is assembled from the
    /// individual fields.
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url_override {
            return url.clone();
        }

        let user = utf8_percent_encode(&self.user, USERINFO);
        let password = utf8_percent_encode(&self.password, USERINFO);
        format!(
            "postgres://{user}:{password}@{host}:{port}/{db}?sslmode={ssl}",
            host = self.host,
            port = self.port,
            db = self.db_name,
            ssl = self.ssl_mode,
        )
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field(
                "url_override",
                &self.url_override.as_deref().map(sanitize_db_url),
            )
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("db_name", &self.db_name)
            .field("ssl_mode", &self.ssl_mode)
            .field("max_conns", &self.max_conns)
            .field("min_conns", &self.min_conns)
            .field("max_conn_lifetime", &self.max_conn_lifetime)
            .field("max_conn_idle_time", &self.max_conn_idle_time)
            .field("health_check_period", &self.health_check_period)
            .finish()
    }
}

/// Mask the password of a connection string so it can be logged.
pub fn sanitize_db_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() && parsed.set_password(Some("***")).is_err() {
                return "<unprintable connection string>".to_string();
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable connection string>".to_string(),
    }
}

/// Reject connection strings that cannot be parsed or that name a backend this
/// build has no driver for.
pub fn validate_db_url(url: &str) -> Result<(), DbInfraError> {
    let parsed = Url::parse(url)
        .map_err(|e| DbInfraError::config(format!("failed to parse database config: {e}")))?;

    match parsed.scheme() {
        "postgres" | "postgresql" | "sqlite" => Ok(()),
        other => Err(DbInfraError::config(format!(
            "unsupported database scheme '{other}' (expected postgres or sqlite)"
        ))),
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.is_empty())
}

fn string_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key).unwrap_or_else(|| default.to_string())
}

fn port_or<F>(lookup: &F, key: &str, default: u16) -> u16
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key)
        .and_then(|v| v.trim().parse::<u16>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(default)
}

fn duration_or<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key)
        .and_then(|v| humantime::parse_duration(v.trim()).ok())
        .unwrap_or(default)
}
