use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Database, FeedRepository, PostRepository, UpsertOutcome};
use crate::feed::{Feed, NewPost};
use crate::Result;

/// The storage operations the poller depends on.
///
/// Implementations must be safe to share across tasks; several pollers may
/// run against the same backing store.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// The feed with the oldest `last_fetched_at`, never-fetched feeds first.
    /// `None` when no feeds are registered.
    async fn next_feed_to_poll(&self) -> Result<Option<Feed>>;

    /// Set `last_fetched_at` (and `updated_at`) to `at`
    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// Insert a post unless the feed already has one with the same link
    async fn upsert_post(&self, post: &NewPost) -> Result<UpsertOutcome>;
}

#[async_trait]
impl FeedStore for Database {
    async fn next_feed_to_poll(&self) -> Result<Option<Feed>> {
        FeedRepository::new(self).next_to_poll().await
    }

    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        FeedRepository::new(self).mark_fetched(feed_id, at).await
    }

    async fn upsert_post(&self, post: &NewPost) -> Result<UpsertOutcome> {
        PostRepository::new(self).insert(post).await
    }
}
