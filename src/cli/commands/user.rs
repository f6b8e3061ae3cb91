//! User management command handlers

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_user_add(config: &Config, username: &str) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;

    if store.get_user(username).await?.is_some() {
        println!("User '{}' already exists.", username);
        println!("Rotate their key with: jyotish user rotate-key {}", username);
        return Ok(());
    }

    let (user, api_key) = store.create_user(username).await?;

    println!("✓ Created user '{}' ({})", user.username, user.id);
    println!("  API key: {}", api_key);
    println!();
    println!("Store this key now, it is not shown again.");

    Ok(())
}

pub async fn cmd_user_list(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let users = store.list_users().await?;

    if users.is_empty() {
        println!("No users yet.");
        println!();
        println!("Add one with: jyotish user add <name>");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<70}", "");

    for user in users {
        println!("{}", user.username);
        println!("  ID: {} | Created: {}", user.id, user.created_at);
    }

    Ok(())
}

pub async fn cmd_user_rotate_key(config: &Config, username: &str) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;

    if store.get_user(username).await?.is_none() {
        println!("User '{}' not found.", username);
        return Ok(());
    }

    let api_key = store.regenerate_api_key(username).await?;

    println!("✓ New API key for '{}': {}", username, api_key);
    println!("The previous key no longer works.");

    Ok(())
}
