use db_infra::DbPool;

/// Shared per-process state handed to every worker through `web::Data`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: DbPool,
}

impl AppState {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}
