use std::sync::Arc;

use crate::core::{config::AppConfig, db::DbPool};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub config: Arc<AppConfig>,
}
