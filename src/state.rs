use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::CompletionPolicy;
use crate::db::SqliteStore;
use crate::store::ProgressStore;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub store: Arc<dyn ProgressStore>,
    pub completion_policy: CompletionPolicy,
}

impl AppState {
    pub fn new(db: SqlitePool, completion_policy: CompletionPolicy) -> Self {
        let store = Arc::new(SqliteStore::new(db.clone()));
        Self {
            db,
            store,
            completion_policy,
        }
    }
}
