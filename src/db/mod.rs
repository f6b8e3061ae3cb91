use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::domain::{CacheError, CacheFamily, Caller, format_timestamp};

pub mod guard;
pub mod migrator;
pub(crate) mod repositories;

pub use guard::{ScopedCache, ScopedProfiles};
pub use repositories::profile::NewProfile;
pub use repositories::user::User;

/// Live/expired row counts for one cache family.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FamilyStats {
    pub family: CacheFamily,
    pub live: u64,
    pub expired: u64,
}

#[derive(Clone)]
pub struct Store {
    conn: DatabaseConnection,
    clock: Arc<dyn Clock>,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self {
            conn,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the time source used for expiry checks and timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn cache_repo(&self, family: CacheFamily) -> repositories::cache::CacheRepository {
        repositories::cache::CacheRepository::new(self.conn.clone(), family)
    }

    fn profile_repo(&self) -> repositories::profile::ProfileRepository {
        repositories::profile::ProfileRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    /// Cache records of `family`, as seen by `caller`.
    #[must_use]
    pub fn cache(&self, family: CacheFamily, caller: &Caller) -> ScopedCache {
        ScopedCache::new(
            self.cache_repo(family),
            self.profile_repo(),
            family,
            caller.clone(),
            self.clock(),
        )
    }

    /// Birth profiles, as seen by `caller`.
    #[must_use]
    pub fn profiles(&self, caller: &Caller) -> ScopedProfiles {
        ScopedProfiles::new(self.profile_repo(), caller.clone(), self.clock())
    }

    /// Deletes rows of every family that expired before `cutoff`.
    ///
    /// This is a maintenance task that runs outside any caller's scope.
    pub async fn sweep_expired(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<(CacheFamily, u64)>, CacheError> {
        let mut swept = Vec::with_capacity(CacheFamily::ALL.len());
        for family in CacheFamily::ALL {
            let removed = self.cache_repo(family).sweep_expired(cutoff).await?;
            swept.push((family, removed));
        }
        Ok(swept)
    }

    pub async fn cache_stats(&self) -> Result<Vec<FamilyStats>, CacheError> {
        let now = self.clock.now();
        let mut stats = Vec::with_capacity(CacheFamily::ALL.len());
        for family in CacheFamily::ALL {
            let (live, expired) = self.cache_repo(family).counts(now).await?;
            stats.push(FamilyStats {
                family,
                live,
                expired,
            });
        }
        Ok(stats)
    }

    pub async fn create_user(&self, username: &str) -> Result<(User, String)> {
        let now = format_timestamp(self.clock.now());
        self.user_repo().create(username, &now).await
    }

    pub async fn get_user(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>> {
        self.user_repo().verify_api_key(api_key).await
    }

    pub async fn regenerate_api_key(&self, username: &str) -> Result<String> {
        let now = format_timestamp(self.clock.now());
        self.user_repo().regenerate_api_key(username, &now).await
    }
}
