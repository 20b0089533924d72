use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::feed::{parse_pub_date, DocumentFetcher, Feed, NewPost, RssItem};
use crate::storage::{FeedStore, UpsertOutcome};
use crate::Result;

/// Outcome of one ingestion of one feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub feed_name: String,
    /// Items present in the fetched document
    pub attempted: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Items whose write failed and were skipped
    pub failed: usize,
}

/// Fetch one feed and store its items.
///
/// The feed is stamped as fetched before the network call, so a failing
/// feed does not block the others. A failed stamp or fetch aborts the step;
/// a failed item write only skips that item.
pub async fn ingest_feed(
    store: &dyn FeedStore,
    fetcher: &dyn DocumentFetcher,
    feed: &Feed,
) -> Result<IngestReport> {
    store.mark_fetched(feed.id, Utc::now()).await?;

    let document = fetcher.fetch(&feed.url).await?;

    let mut report = IngestReport {
        feed_name: feed.name.clone(),
        attempted: document.items.len(),
        ..Default::default()
    };

    for item in &document.items {
        let post = build_post(feed.id, item);

        match store.upsert_post(&post).await {
            Ok(UpsertOutcome::Inserted) => report.inserted += 1,
            Ok(UpsertOutcome::Duplicate) => {
                debug!("Post already stored: {}", post.url);
                report.duplicates += 1;
            }
            Err(e) => {
                warn!(feed = %feed.name, link = %post.url, "Failed to store post: {}", e);
                report.failed += 1;
            }
        }
    }

    info!(
        feed = %report.feed_name,
        attempted = report.attempted,
        inserted = report.inserted,
        duplicates = report.duplicates,
        failed = report.failed,
        "Feed collected"
    );

    Ok(report)
}

fn build_post(feed_id: Uuid, item: &RssItem) -> NewPost {
    let published_at = parse_pub_date(&item.pub_date);
    if published_at.is_none() && !item.pub_date.trim().is_empty() {
        debug!("Unparseable pubDate {:?} for {}", item.pub_date, item.link);
    }

    NewPost {
        id: Uuid::new_v4(),
        feed_id,
        title: item.title.clone(),
        description: Some(item.description.clone()).filter(|d| !d.is_empty()),
        url: item.link.clone(),
        published_at,
    }
}
