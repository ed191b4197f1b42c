use std::sync::Arc;

use sqlx::SqlitePool;

use super::{config::Config, database};

pub struct AppState {
    pub config: Config,
    pub pool: SqlitePool,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let pool = database::connect(&config.database_url)
            .await
            .expect("Database misconfigured!");

        Arc::new(Self { config, pool })
    }

    pub fn with_pool(config: Config, pool: SqlitePool) -> Arc<Self> {
        Arc::new(Self { config, pool })
    }
}
