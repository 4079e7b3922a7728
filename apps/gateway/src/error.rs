use db_infra::DbInfraError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Db(DbInfraError),
    #[error("http server error: {0}")]
    Server(#[from] std::io::Error),
}

impl From<DbInfraError> for AppError {
    fn from(err: DbInfraError) -> Self {
        match err {
            DbInfraError::Config { message } => AppError::Config(message),
            other => AppError::Db(other),
        }
    }
}
