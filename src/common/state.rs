// Application state shared across all modules

use reqwest::Client;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::common::config::AppConfig;
use crate::services::GoogleService;

/// Application state containing the database pool, configuration and services.
/// Built once in `main` and handed to every handler through an `Extension` layer.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub google_service: Arc<GoogleService>,
}

impl AppState {
    pub fn new(db: SqlitePool, http: Client, config: AppConfig) -> Self {
        let google_service = Arc::new(GoogleService::new(http, &config));
        Self {
            db,
            config: Arc::new(config),
            google_service,
        }
    }
}
