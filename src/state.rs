use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    config::Config,
    database::{Db, init_mongo},
};

pub struct AppState {
    pub config: Config,
    pub db: Db,
    /// Serializes booking create/update within this process so two
    /// requests cannot both pass the availability check before either
    /// write lands. Multi-instance deployments still race; see DESIGN.md.
    pub booking_lock: Mutex<()>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        Self::with_config(Config::load()).await
    }

    pub async fn with_config(config: Config) -> Arc<Self> {
        let db = init_mongo(&config.mongo_url, &config.mongo_db).await;

        Arc::new(Self {
            config,
            db,
            booking_lock: Mutex::new(()),
        })
    }
}
