use sqlx::SqlitePool;

/// Shared by every request; the pool is the only shared handle.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}
