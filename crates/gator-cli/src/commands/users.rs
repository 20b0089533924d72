use anyhow::{bail, Result};

use gator_core::storage::{Database, UserRepository};
use gator_core::Config;

pub async fn register(db: &Database, config: &mut Config, name: &str) -> Result<()> {
    let repo = UserRepository::new(db);
    if repo.find_by_name(name).await?.is_some() {
        bail!("User '{}' already exists", name);
    }

    let user = repo.create(name).await?;
    config.set_user(&user.name)?;

    println!("Registered user '{}' ({})", user.name, user.id);
    Ok(())
}

pub async fn login(db: &Database, config: &mut Config, name: &str) -> Result<()> {
    let Some(user) = UserRepository::new(db).find_by_name(name).await? else {
        bail!("User '{}' does not exist, run `gator register {}` first", name, name);
    };

    config.set_user(&user.name)?;
    println!("Logged in as '{}'", user.name);
    Ok(())
}

pub async fn reset(db: &Database) -> Result<()> {
    let deleted = UserRepository::new(db).delete_all().await?;
    println!("Deleted {} users along with their feeds and posts", deleted);
    Ok(())
}

pub async fn list(db: &Database, config: &Config) -> Result<()> {
    let users = UserRepository::new(db).list_all().await?;

    if users.is_empty() {
        println!("No users yet. Run `gator register <name>` to create one.");
        return Ok(());
    }

    for user in &users {
        if config.current_user_name.as_deref() == Some(user.name.as_str()) {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }

    Ok(())
}
