use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::retry::with_lock_retry;
use super::Database;
use crate::feed::{NewPost, Post};
use crate::Result;

/// Result of offering a post to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// The feed already has a post with this link; nothing was written
    Duplicate,
}

/// Repository for ingested posts
pub struct PostRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
struct PostRow {
    id: String,
    feed_id: String,
    title: String,
    description: Option<String>,
    url: String,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            feed_id: Uuid::parse_str(&row.feed_id).unwrap_or_default(),
            title: row.title,
            description: row.description,
            url: row.url,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl<'a> PostRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a post, deduplicated on (feed_id, url).
    ///
    /// The conflict target is explicit so that only the dedup key resolves to
    /// `Duplicate`; any other constraint failure is returned as an error.
    pub async fn insert(&self, post: &NewPost) -> Result<UpsertOutcome> {
        let now = Utc::now();
        let id = post.id.to_string();
        let feed_id = post.feed_id.to_string();

        let result = with_lock_retry(|| {
            sqlx::query(
                r#"
                INSERT INTO posts
                (id, feed_id, title, description, url, published_at, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(feed_id, url) DO NOTHING
                "#,
            )
            .bind(&id)
            .bind(&feed_id)
            .bind(&post.title)
            .bind(&post.description)
            .bind(&post.url)
            .bind(post.published_at)
            .bind(now)
            .bind(now)
            .execute(self.db.pool())
        })
        .await?;

        if result.rows_affected() > 0 {
            Ok(UpsertOutcome::Inserted)
        } else {
            Ok(UpsertOutcome::Duplicate)
        }
    }

    /// Latest posts from the feeds a user follows.
    /// Newest publication first; undated posts sort last by ingestion time.
    pub async fn list_for_user(&self, user_id: Uuid, limit: u32) -> Result<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.feed_id, p.title, p.description, p.url,
                   p.published_at, p.created_at, p.updated_at
            FROM posts p
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at IS NULL, p.published_at DESC, p.created_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// Posts of a single feed, in ingestion order
    pub async fn list_by_feed(&self, feed_id: Uuid) -> Result<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(
            r#"
            SELECT id, feed_id, title, description, url, published_at, created_at, updated_at
            FROM posts
            WHERE feed_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(feed_id.to_string())
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    pub async fn count_by_feed(&self, feed_id: Uuid) -> Result<u32> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE feed_id = ?")
            .bind(feed_id.to_string())
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0 as u32)
    }
}
