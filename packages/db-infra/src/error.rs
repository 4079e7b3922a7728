use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbInfraError {
    #[error("Configuration error: {message}")]
    Config { message: String },
    #[error("failed to create connection pool: {message}")]
    Connect { message: String },
    #[error("failed to ping database: {message}")]
    Ping { message: String },
    #[error("migration failed: {message}")]
    Migration { message: String },
}

impl DbInfraError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn connect(err: impl std::fmt::Display) -> Self {
        Self::Connect {
            message: err.to_string(),
        }
    }

    pub fn ping(err: impl std::fmt::Display) -> Self {
        Self::Ping {
            message: err.to_string(),
        }
    }

    pub fn migration(err: impl std::fmt::Display) -> Self {
        Self::Migration {
            message: err.to_string(),
        }
    }

    /// True for failures that mean the database could not be reached at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Ping { .. })
    }
}
