use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::feed_repo::FeedRow;
use super::Database;
use crate::feed::{Feed, FeedFollow};
use crate::Result;

/// Repository for user ↔ feed follows
pub struct FollowRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
struct FollowRow {
    id: String,
    user_id: String,
    feed_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FollowRow> for FeedFollow {
    fn from(row: FollowRow) -> Self {
        FeedFollow {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            user_id: Uuid::parse_str(&row.user_id).unwrap_or_default(),
            feed_id: Uuid::parse_str(&row.feed_id).unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl<'a> FollowRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Follow a feed. Returns `None` if the user already follows it.
    pub async fn create(&self, user_id: Uuid, feed_id: Uuid) -> Result<Option<FeedFollow>> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO feed_follows (id, user_id, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, feed_id) DO NOTHING
            "#,
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(feed_id.to_string())
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let row: FollowRow = sqlx::query_as(
            "SELECT id, user_id, feed_id, created_at, updated_at FROM feed_follows WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_one(self.db.pool())
        .await?;

        Ok(Some(FeedFollow::from(row)))
    }

    /// Stop following a feed. Returns whether a follow was removed.
    pub async fn delete(&self, user_id: Uuid, feed_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id.to_string())
            .bind(feed_id.to_string())
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Feeds followed by a user, by name
    pub async fn list_feeds_for_user(&self, user_id: Uuid) -> Result<Vec<Feed>> {
        let rows: Vec<FeedRow> = sqlx::query_as(
            r#"
            SELECT f.id, f.name, f.url, f.user_id, f.last_fetched_at,
                   f.created_at, f.updated_at
            FROM feed_follows ff
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.user_id = ?
            ORDER BY f.name ASC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Feed::from).collect())
    }
}
