use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::sso::SsoClient;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub sso: Arc<dyn SsoClient>,
    pub config: AppConfig,
}
