use super::ContentRepository;
use crate::error::{AppError, Result};
use crate::models::{ContentItem, ContentVisibility, EngagementCounters, PostType};
use crate::utils::haversine_km;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

const ITEM_COLUMNS: &str = r#"
    p.id, p.author_id, u.username AS author_username, p.post_type, p.topics,
    p.visibility, p.created_at, p.latitude, p.longitude, p.city,
    p.views, p.likes, p.comments, p.shares, p.saves,
    p.click_through_rate, p.avg_dwell_secs
"#;

#[derive(Debug, sqlx::FromRow)]
struct ContentItemRow {
    id: Uuid,
    author_id: Uuid,
    author_username: String,
    post_type: String,
    topics: Vec<String>,
    visibility: String,
    created_at: DateTime<Utc>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    views: i64,
    likes: i64,
    comments: i64,
    shares: i64,
    saves: i64,
    click_through_rate: f64,
    avg_dwell_secs: f64,
}

impl ContentItemRow {
    fn into_item(self) -> ContentItem {
        ContentItem {
            id: self.id,
            author_id: self.author_id,
            author_username: self.author_username,
            post_type: PostType::parse(&self.post_type).unwrap_or(PostType::Text),
            topics: self.topics,
            visibility: ContentVisibility::parse(&self.visibility)
                .unwrap_or(ContentVisibility::Public),
            created_at: self.created_at,
            latitude: self.latitude,
            longitude: self.longitude,
            city: self.city,
            counters: EngagementCounters {
                views: self.views,
                likes: self.likes,
                comments: self.comments,
                shares: self.shares,
                saves: self.saves,
                click_through_rate: self.click_through_rate,
                avg_dwell_secs: self.avg_dwell_secs,
            },
        }
    }
}

fn db_error(context: &str, e: sqlx::Error) -> AppError {
    error!("{}: {}", context, e);
    AppError::Database(e.to_string())
}

fn into_items(rows: Vec<ContentItemRow>) -> Vec<ContentItem> {
    rows.into_iter().map(ContentItemRow::into_item).collect()
}

pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn find_by_authors(
        &self,
        author_ids: &[Uuid],
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ContentItem>> {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.author_id = ANY($1)
              AND p.visibility IN ('public', 'connections')
              AND p.created_at >= $2
            ORDER BY p.created_at DESC
            LIMIT $3
            "#
        );

        let rows = sqlx::query_as::<_, ContentItemRow>(&sql)
            .bind(author_ids)
            .bind(since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Social content query failed", e))?;

        Ok(into_items(rows))
    }

    async fn find_popular(&self, limit: i64) -> Result<Vec<ContentItem>> {
        let sql = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.visibility = 'public'
            ORDER BY (p.likes + p.comments * 2 + p.shares * 3) DESC, p.created_at DESC
            LIMIT $1
            "#
        );

        let rows = sqlx::query_as::<_, ContentItemRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Popular content query failed", e))?;

        Ok(into_items(rows))
    }

    async fn find_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: i64,
    ) -> Result<Vec<ContentItem>> {
        // Coarse bounding box in SQL, exact haversine filter in Rust. The
        // box over-fetches so the exact filter can still fill the cap.
        let lat_delta = radius_km / 111.0;
        let lon_delta = radius_km / (111.0 * latitude.to_radians().cos().abs().max(0.01));

        let sql = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.visibility = 'public'
              AND p.latitude BETWEEN $1 AND $2
              AND p.longitude BETWEEN $3 AND $4
            ORDER BY p.created_at DESC
            LIMIT $5
            "#
        );

        let rows = sqlx::query_as::<_, ContentItemRow>(&sql)
            .bind(latitude - lat_delta)
            .bind(latitude + lat_delta)
            .bind(longitude - lon_delta)
            .bind(longitude + lon_delta)
            .bind(limit * 2)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Nearby content query failed", e))?;

        Ok(into_items(rows)
            .into_iter()
            .filter(|item| match (item.latitude, item.longitude) {
                (Some(lat), Some(lon)) => {
                    haversine_km(latitude, longitude, lat, lon) <= radius_km
                }
                _ => false,
            })
            .take(limit as usize)
            .collect())
    }

    async fn find_by_topics(&self, topics: &[String], limit: i64) -> Result<Vec<ContentItem>> {
        if topics.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.visibility = 'public'
              AND p.topics && $1
            ORDER BY p.created_at DESC
            LIMIT $2
            "#
        );

        let rows = sqlx::query_as::<_, ContentItemRow>(&sql)
            .bind(topics)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Topic content query failed", e))?;

        Ok(into_items(rows))
    }

    async fn find_trending(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<ContentItem>> {
        let sql = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.visibility = 'public'
              AND p.created_at >= $1
            ORDER BY (p.likes + p.comments * 2 + p.shares * 3) DESC, p.created_at DESC
            LIMIT $2
            "#
        );

        let rows = sqlx::query_as::<_, ContentItemRow>(&sql)
            .bind(since)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Trending content query failed", e))?;

        Ok(into_items(rows))
    }

    async fn find_recent(
        &self,
        author_ids: &[Uuid],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ContentItem>> {
        let sql = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.visibility = 'public' OR p.author_id = ANY($1)
            ORDER BY p.created_at DESC
            LIMIT $2 OFFSET $3
            "#
        );

        let rows = sqlx::query_as::<_, ContentItemRow>(&sql)
            .bind(author_ids)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Recent content query failed", e))?;

        Ok(into_items(rows))
    }

    async fn get_by_id(&self, item_id: Uuid) -> Result<Option<ContentItem>> {
        let sql = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.id = $1
            "#
        );

        let row = sqlx::query_as::<_, ContentItemRow>(&sql)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Content lookup failed", e))?;

        Ok(row.map(ContentItemRow::into_item))
    }
}
