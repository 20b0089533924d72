use anyhow::Result;

use gator_core::storage::{Database, PostRepository};
use gator_core::Config;

use super::require_user;

const PREVIEW_LEN: usize = 200;

pub async fn run(db: &Database, config: &Config, limit: u32) -> Result<()> {
    let user = require_user(db, config).await?;
    let posts = PostRepository::new(db).list_for_user(user.id, limit).await?;

    if posts.is_empty() {
        println!("No posts yet. Follow a feed and run `gator agg` to collect some.");
        return Ok(());
    }

    for post in &posts {
        println!("{}", post.title);
        if let Some(published) = post.published_at {
            println!("  Published: {}", published.format("%Y-%m-%d %H:%M"));
        }
        println!("  {}", post.url);

        let preview = post.description_preview(PREVIEW_LEN);
        if !preview.is_empty() {
            println!("  {}", preview);
        }
        println!();
    }

    Ok(())
}
