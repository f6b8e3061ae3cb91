//! One-shot cache sweep command handler

use crate::config::Config;
use crate::db::Store;
use crate::services::Scheduler;

pub async fn cmd_sweep(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let scheduler = Scheduler::new(store, config.sweep.clone());

    let swept = scheduler.run_once().await?;

    println!(
        "Removed rows expired more than {}h ago:",
        config.sweep.retention_hours
    );
    for (family, removed) in swept {
        println!("  {:<16} {}", family.as_str(), removed);
    }

    Ok(())
}
