use anyhow::{bail, Result};

use gator_core::feed::{parse_feed_url, NewFeed};
use gator_core::storage::{Database, FeedRepository, FollowRepository};
use gator_core::Config;

use super::require_user;

pub async fn add(db: &Database, config: &Config, name: &str, url: &str) -> Result<()> {
    let user = require_user(db, config).await?;
    let url = parse_feed_url(url)?;

    let feed_repo = FeedRepository::new(db);
    if feed_repo.find_by_url(&url).await?.is_some() {
        bail!("A feed with URL {} already exists, use `gator follow {}`", url, url);
    }

    let feed = feed_repo
        .create(&NewFeed {
            name: name.to_string(),
            url,
            user_id: user.id,
        })
        .await?;
    FollowRepository::new(db).create(user.id, feed.id).await?;

    println!("Added feed '{}' ({})", feed.name, feed.id);
    println!("  URL: {}", feed.url);
    println!("  Followed by: {}", user.name);
    Ok(())
}

pub async fn list(db: &Database, config: &Config) -> Result<()> {
    require_user(db, config).await?;
    let feeds = FeedRepository::new(db).list_all().await?;

    if feeds.is_empty() {
        println!("No feeds yet.");
        println!("\nTo add a feed, run:");
        println!("  gator addfeed <name> <url>");
        return Ok(());
    }

    println!("Feeds ({}):\n", feeds.len());

    for entry in &feeds {
        println!("  {}", entry.feed.name);
        println!("    URL: {}", entry.feed.url);
        println!("    Added by: {}", entry.owner_name);
        match entry.feed.last_fetched_at {
            Some(last) => println!("    Last fetched: {}", last.format("%Y-%m-%d %H:%M")),
            None => println!("    Last fetched: never"),
        }
        println!();
    }

    Ok(())
}
