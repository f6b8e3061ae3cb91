//! Background removal of long-expired cache rows.
//!
//! Expired rows stay readable (as `Expired`) until the sweep deletes them
//! once they are older than the configured retention.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SweepConfig;
use crate::db::Store;
use crate::domain::CacheFamily;

pub struct Scheduler {
    store: Store,
    config: SweepConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(store: Store, config: SweepConfig) -> Self {
        Self {
            store,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Runs until [`Scheduler::stop`] is called.
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Cache sweep is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background cache sweep");

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let store = self.store.clone();
        let running = Arc::clone(&self.running);
        let retention = self.config.retention();

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let store = store.clone();
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                if let Err(e) = sweep_once(&store, retention).await {
                    error!(event = "job_failed", job_name = "sweep_cache", error = %e, "Scheduled cache sweep failed");
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Cache sweep running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let interval_mins = self.config.interval_minutes.max(1);
        let retention = self.config.retention();

        info!(
            "Cache sweep running every {}m, retention {}h",
            interval_mins, self.config.retention_hours
        );

        let mut ticker = interval(Duration::from_secs(u64::from(interval_mins) * 60));

        loop {
            ticker.tick().await;
            if !*self.running.read().await {
                break;
            }
            if let Err(e) = sweep_once(&self.store, retention).await {
                error!(event = "job_failed", job_name = "sweep_cache", error = %e, "Scheduled cache sweep failed");
            }
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping cache sweep...");
        *self.running.write().await = false;
    }

    pub async fn run_once(&self) -> Result<Vec<(CacheFamily, u64)>> {
        info!("Running manual cache sweep...");
        sweep_once(&self.store, self.config.retention()).await
    }
}

/// Deletes rows that expired more than `retention` ago.
pub async fn sweep_once(
    store: &Store,
    retention: chrono::Duration,
) -> Result<Vec<(CacheFamily, u64)>> {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "sweep_cache", "Starting cache sweep");

    let cutoff = store.clock().now() - retention;
    let swept = store.sweep_expired(cutoff).await?;

    for (family, removed) in &swept {
        metrics::counter!("cache_swept_total", "family" => family.as_str()).increment(*removed);
    }

    info!(
        event = "job_finished",
        job_name = "sweep_cache",
        removed = swept.iter().map(|(_, n)| n).sum::<u64>(),
        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Cache sweep finished"
    );

    Ok(swept)
}
