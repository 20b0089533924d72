use anyhow::{anyhow, Result};

use gator_core::feed::parse_feed_url;
use gator_core::storage::{Database, FeedRepository, FollowRepository};
use gator_core::Config;

use super::require_user;

pub async fn follow(db: &Database, config: &Config, url: &str) -> Result<()> {
    let user = require_user(db, config).await?;
    // Stored URLs are normalized by `addfeed`
    let url = parse_feed_url(url)?;
    let feed = FeedRepository::new(db)
        .find_by_url(&url)
        .await?
        .ok_or_else(|| anyhow!("No feed with URL {}, add it with `gator addfeed`", url))?;

    match FollowRepository::new(db).create(user.id, feed.id).await? {
        Some(_) => println!("{} now follows '{}'", user.name, feed.name),
        None => println!("{} already follows '{}'", user.name, feed.name),
    }

    Ok(())
}

pub async fn unfollow(db: &Database, config: &Config, url: &str) -> Result<()> {
    let user = require_user(db, config).await?;
    // Stored URLs are normalized by `addfeed`
    let url = parse_feed_url(url)?;
    let feed = FeedRepository::new(db)
        .find_by_url(&url)
        .await?
        .ok_or_else(|| anyhow!("No feed with URL {}", url))?;

    if FollowRepository::new(db).delete(user.id, feed.id).await? {
        println!("{} unfollowed '{}'", user.name, feed.name);
    } else {
        println!("{} was not following '{}'", user.name, feed.name);
    }

    Ok(())
}

pub async fn following(db: &Database, config: &Config) -> Result<()> {
    let user = require_user(db, config).await?;
    let feeds = FollowRepository::new(db).list_feeds_for_user(user.id).await?;

    if feeds.is_empty() {
        println!("{} does not follow any feeds yet.", user.name);
        return Ok(());
    }

    println!("{} follows:", user.name);
    for feed in &feeds {
        println!("  * {}", feed.name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::feeds;
    use gator_core::storage::UserRepository;

    fn session(name: &str) -> Config {
        Config {
            db_url: "sqlite::memory:".to_string(),
            current_user_name: Some(name.to_string()),
        }
    }

    #[tokio::test]
    async fn test_follow_matches_url_as_added() {
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(&db);
        users.create("owner").await.unwrap();
        let reader = users.create("reader").await.unwrap();

        feeds::add(&db, &session("owner"), "example", "https://Example.com")
            .await
            .unwrap();

        follow(&db, &session("reader"), "https://Example.com").await.unwrap();
        let followed = FollowRepository::new(&db)
            .list_feeds_for_user(reader.id)
            .await
            .unwrap();
        assert_eq!(followed.len(), 1);
        assert_eq!(followed[0].url, "https://example.com/");

        unfollow(&db, &session("reader"), "https://Example.com").await.unwrap();
        assert!(FollowRepository::new(&db)
            .list_feeds_for_user(reader.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_follow_unknown_feed_fails() {
        let db = Database::open_in_memory().await.unwrap();
        UserRepository::new(&db).create("reader").await.unwrap();

        let err = follow(&db, &session("reader"), "https://example.com/missing.xml")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No feed with URL"));
    }
}
