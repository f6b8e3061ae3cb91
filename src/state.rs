use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{CacheService, ProfileService, SeaOrmCacheService, SeaOrmProfileService};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub cache_service: Arc<dyn CacheService>,

    pub profile_service: Arc<dyn ProfileService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::with_store(config, store))
    }

    /// Wires the services around an already opened store.
    #[must_use]
    pub fn with_store(config: Config, store: Store) -> Self {
        let config = Arc::new(RwLock::new(config));

        let cache_service = Arc::new(SeaOrmCacheService::new(store.clone(), config.clone()))
            as Arc<dyn CacheService + Send + Sync + 'static>;

        let profile_service = Arc::new(SeaOrmProfileService::new(store.clone()))
            as Arc<dyn ProfileService + Send + Sync + 'static>;

        Self {
            config,
            store,
            cache_service,
            profile_service,
        }
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
