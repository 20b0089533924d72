use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::retry::with_lock_retry;
use super::Database;
use crate::feed::{Feed, FeedWithOwner, NewFeed};
use crate::{Error, Result};

/// Repository for feed CRUD operations
pub struct FeedRepository<'a> {
    db: &'a Database,
}

#[derive(FromRow)]
pub(super) struct FeedRow {
    id: String,
    name: String,
    url: String,
    user_id: String,
    last_fetched_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct FeedWithOwnerRow {
    #[sqlx(flatten)]
    feed: FeedRow,
    owner_name: String,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            name: row.name,
            url: row.url,
            user_id: Uuid::parse_str(&row.user_id).unwrap_or_default(),
            last_fetched_at: row.last_fetched_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl<'a> FeedRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a new feed owned by `new_feed.user_id`
    pub async fn create(&self, new_feed: &NewFeed) -> Result<Feed> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO feeds (id, name, url, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&new_feed.name)
        .bind(&new_feed.url)
        .bind(new_feed.user_id.to_string())
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| Error::FeedNotFound(id.to_string()))
    }

    /// Find a feed by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Feed>> {
        let row: Option<FeedRow> = sqlx::query_as(
            r#"
            SELECT id, name, url, user_id, last_fetched_at, created_at, updated_at
            FROM feeds
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Feed::from))
    }

    /// Find a feed by URL
    pub async fn find_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let row: Option<FeedRow> = sqlx::query_as(
            r#"
            SELECT id, name, url, user_id, last_fetched_at, created_at, updated_at
            FROM feeds
            WHERE url = ?
            "#,
        )
        .bind(url)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Feed::from))
    }

    /// Get all feeds with the name of the user who added them
    pub async fn list_all(&self) -> Result<Vec<FeedWithOwner>> {
        let rows: Vec<FeedWithOwnerRow> = sqlx::query_as(
            r#"
            SELECT f.id, f.name, f.url, f.user_id, f.last_fetched_at,
                   f.created_at, f.updated_at, u.name AS owner_name
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.name ASC, f.id ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| FeedWithOwner {
                feed: Feed::from(row.feed),
                owner_name: row.owner_name,
            })
            .collect())
    }

    /// The stalest feed: never fetched first, then oldest `last_fetched_at`,
    /// ties broken by id
    pub async fn next_to_poll(&self) -> Result<Option<Feed>> {
        let row: Option<FeedRow> = sqlx::query_as(
            r#"
            SELECT id, name, url, user_id, last_fetched_at, created_at, updated_at
            FROM feeds
            ORDER BY last_fetched_at IS NOT NULL, last_fetched_at ASC, id ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(Feed::from))
    }

    /// Stamp the feed as fetched at `at`. Idempotent.
    pub async fn mark_fetched(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let id_str = id.to_string();

        let result = with_lock_retry(|| {
            sqlx::query(
                r#"
                UPDATE feeds
                SET last_fetched_at = ?,
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(at)
            .bind(at)
            .bind(&id_str)
            .execute(self.db.pool())
        })
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::FeedNotFound(id_str));
        }

        Ok(())
    }

    /// Get total feed count
    pub async fn count(&self) -> Result<u32> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM feeds")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0 as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UserRepository;
    use chrono::Duration;

    async fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(&db).create("alice").await.unwrap();
        (db, user.id)
    }

    async fn add_feed(db: &Database, user_id: Uuid, name: &str) -> Feed {
        FeedRepository::new(db)
            .create(&NewFeed {
                name: name.to_string(),
                url: format!("https://example.com/{}.xml", name),
                user_id,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let (db, user_id) = setup().await;
        let repo = FeedRepository::new(&db);

        let feed = add_feed(&db, user_id, "hn").await;
        assert_eq!(feed.name, "hn");
        assert_eq!(feed.user_id, user_id);
        assert!(feed.last_fetched_at.is_none());

        let by_url = repo.find_by_url("https://example.com/hn.xml").await.unwrap();
        assert_eq!(by_url.map(|f| f.id), Some(feed.id));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_url_is_rejected() {
        let (db, user_id) = setup().await;
        add_feed(&db, user_id, "hn").await;

        let result = FeedRepository::new(&db)
            .create(&NewFeed {
                name: "other name".to_string(),
                url: "https://example.com/hn.xml".to_string(),
                user_id,
            })
            .await;

        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[tokio::test]
    async fn test_list_all_includes_owner() {
        let (db, user_id) = setup().await;
        add_feed(&db, user_id, "b").await;
        add_feed(&db, user_id, "a").await;

        let feeds = FeedRepository::new(&db).list_all().await.unwrap();
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].feed.name, "a");
        assert_eq!(feeds[0].owner_name, "alice");
    }

    #[tokio::test]
    async fn test_next_to_poll_empty() {
        let (db, _) = setup().await;
        assert!(FeedRepository::new(&db).next_to_poll().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_never_fetched_feed_comes_first() {
        let (db, user_id) = setup().await;
        let repo = FeedRepository::new(&db);

        let fetched = add_feed(&db, user_id, "fetched").await;
        let fresh = add_feed(&db, user_id, "fresh").await;
        repo.mark_fetched(fetched.id, Utc::now() - Duration::days(30))
            .await
            .unwrap();

        let next = repo.next_to_poll().await.unwrap().unwrap();
        assert_eq!(next.id, fresh.id);
    }

    #[tokio::test]
    async fn test_oldest_fetch_is_selected() {
        let (db, user_id) = setup().await;
        let repo = FeedRepository::new(&db);

        let hour_ago = add_feed(&db, user_id, "hour").await;
        let five_min_ago = add_feed(&db, user_id, "five").await;
        let now = Utc::now();
        repo.mark_fetched(five_min_ago.id, now - Duration::minutes(5))
            .await
            .unwrap();
        repo.mark_fetched(hour_ago.id, now - Duration::hours(1))
            .await
            .unwrap();

        let next = repo.next_to_poll().await.unwrap().unwrap();
        assert_eq!(next.id, hour_ago.id);
    }

    #[tokio::test]
    async fn test_ties_are_broken_by_id() {
        let (db, user_id) = setup().await;
        let repo = FeedRepository::new(&db);

        let a = add_feed(&db, user_id, "a").await;
        let b = add_feed(&db, user_id, "b").await;
        let expected = if a.id.to_string() < b.id.to_string() { a.id } else { b.id };

        for _ in 0..3 {
            assert_eq!(repo.next_to_poll().await.unwrap().unwrap().id, expected);
        }
    }

    #[tokio::test]
    async fn test_repeated_selection_visits_in_staleness_order() {
        let (db, user_id) = setup().await;
        let repo = FeedRepository::new(&db);

        let base = Utc::now() - Duration::hours(10);
        let mut expected = Vec::new();
        // Inserted out of staleness order on purpose
        for (name, offset) in [("c", 3), ("a", 1), ("d", 4), ("b", 2)] {
            let feed = add_feed(&db, user_id, name).await;
            repo.mark_fetched(feed.id, base + Duration::minutes(offset))
                .await
                .unwrap();
            expected.push((offset, feed.id));
        }
        let never = add_feed(&db, user_id, "never").await;
        expected.sort();

        let mut visited = Vec::new();
        let mut last_seen: Option<DateTime<Utc>> = None;
        for step in 0..5 {
            let next = repo.next_to_poll().await.unwrap().unwrap();
            if step == 0 {
                assert_eq!(next.id, never.id);
                assert!(next.last_fetched_at.is_none());
            } else {
                let ts = next.last_fetched_at.unwrap();
                if let Some(prev) = last_seen {
                    assert!(ts >= prev);
                }
                last_seen = Some(ts);
                visited.push(next.id);
            }
            repo.mark_fetched(next.id, Utc::now()).await.unwrap();
        }

        let expected_ids: Vec<Uuid> = expected.into_iter().map(|(_, id)| id).collect();
        assert_eq!(visited, expected_ids);
    }

    #[tokio::test]
    async fn test_mark_fetched_is_idempotent() {
        let (db, user_id) = setup().await;
        let repo = FeedRepository::new(&db);
        let feed = add_feed(&db, user_id, "x").await;

        let at = Utc::now();
        repo.mark_fetched(feed.id, at).await.unwrap();
        repo.mark_fetched(feed.id, at).await.unwrap();

        let stored = repo.find_by_id(feed.id).await.unwrap().unwrap();
        let drift = stored.last_fetched_at.unwrap() - at;
        assert!(drift.num_milliseconds().abs() < 1);
    }

    #[tokio::test]
    async fn test_mark_fetched_unknown_feed() {
        let (db, _) = setup().await;
        let result = FeedRepository::new(&db)
            .mark_fetched(Uuid::new_v4(), Utc::now())
            .await;
        assert!(matches!(result, Err(Error::FeedNotFound(_))));
    }
}
