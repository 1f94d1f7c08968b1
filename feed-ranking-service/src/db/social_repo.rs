use super::{SocialGraphRepository, SocialProfile};
use crate::error::{AppError, Result};
use crate::models::GeoPoint;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tracing::error;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    last_latitude: Option<f64>,
    last_longitude: Option<f64>,
    city: Option<String>,
    country: Option<String>,
}

pub struct PgSocialGraphRepository {
    pool: PgPool,
}

impl PgSocialGraphRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn edge_set(&self, sql: &str, user_id: Uuid) -> Result<HashSet<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Social edge query failed for {}: {}", user_id, e);
                AppError::Database(e.to_string())
            })?;
        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl SocialGraphRepository for PgSocialGraphRepository {
    async fn social_profile(&self, user_id: Uuid) -> Result<SocialProfile> {
        let user = sqlx::query_as::<_, UserRow>(
            "SELECT id, last_latitude, last_longitude, city, country FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("User lookup failed for {}: {}", user_id, e);
            AppError::Database(e.to_string())
        })?
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", user_id)))?;

        let following = self
            .edge_set(
                "SELECT followee_id FROM follows WHERE follower_id = $1",
                user_id,
            )
            .await?;
        let followers = self
            .edge_set(
                "SELECT follower_id FROM follows WHERE followee_id = $1",
                user_id,
            )
            .await?;

        let last_location = match (user.last_latitude, user.last_longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
                city: user.city,
                country: user.country,
            }),
            _ => None,
        };

        Ok(SocialProfile {
            user_id: user.id,
            following,
            followers,
            last_location,
        })
    }

    async fn mutual_connection_counts(
        &self,
        user_id: Uuid,
        author_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>> {
        if author_ids.is_empty() {
            return Ok(HashMap::new());
        }

        // Connections of the user that themselves follow the author.
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT f2.followee_id, COUNT(*)
            FROM follows f1
            JOIN follows f2 ON f2.follower_id = f1.followee_id
            WHERE f1.follower_id = $1
              AND f2.followee_id = ANY($2)
            GROUP BY f2.followee_id
            "#,
        )
        .bind(user_id)
        .bind(author_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Mutual connection query failed for {}: {}", user_id, e);
            AppError::Database(e.to_string())
        })?;

        Ok(rows.into_iter().collect())
    }
}
