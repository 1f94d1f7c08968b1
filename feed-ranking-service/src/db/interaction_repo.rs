use super::InteractionRepository;
use crate::error::{AppError, Result};
use crate::models::{InteractionMetadata, InteractionRecord, InteractionType, TargetType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct InteractionRow {
    id: Uuid,
    user_id: Uuid,
    target_type: String,
    target_id: Uuid,
    interaction_type: String,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl InteractionRow {
    fn into_record(self) -> Option<InteractionRecord> {
        Some(InteractionRecord {
            id: self.id,
            user_id: self.user_id,
            target_type: TargetType::parse(&self.target_type)?,
            target_id: self.target_id,
            interaction_type: InteractionType::parse(&self.interaction_type)?,
            metadata: serde_json::from_value::<InteractionMetadata>(self.metadata)
                .unwrap_or_default(),
            created_at: self.created_at,
        })
    }
}

pub struct PgInteractionRepository {
    pool: PgPool,
}

impl PgInteractionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InteractionRepository for PgInteractionRepository {
    async fn append(&self, record: &InteractionRecord) -> Result<()> {
        let metadata = serde_json::to_value(&record.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO interactions
                (id, user_id, target_type, target_id, interaction_type, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.target_type.as_str())
        .bind(record.target_id)
        .bind(record.interaction_type.as_str())
        .bind(metadata)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Interaction append failed for {}: {}", record.user_id, e);
            AppError::Database(e.to_string())
        })?;

        Ok(())
    }

    async fn recent_for_user(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<InteractionRecord>> {
        let rows = sqlx::query_as::<_, InteractionRow>(
            r#"
            SELECT id, user_id, target_type, target_id, interaction_type, metadata, created_at
            FROM interactions
            WHERE user_id = $1 AND created_at >= $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Interaction window query failed for {}: {}", user_id, e);
            AppError::Database(e.to_string())
        })?;

        // Rows with unknown type strings are skipped rather than failing the
        // whole window.
        Ok(rows.into_iter().filter_map(InteractionRow::into_record).collect())
    }

    async fn friend_engagement_counts(
        &self,
        following: &[Uuid],
        item_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>> {
        if following.is_empty() || item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT target_id, COUNT(*)
            FROM interactions
            WHERE user_id = ANY($1)
              AND target_id = ANY($2)
              AND interaction_type IN ('like', 'comment', 'share', 'save')
            GROUP BY target_id
            "#,
        )
        .bind(following)
        .bind(item_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Friend engagement query failed: {}", e);
            AppError::Database(e.to_string())
        })?;

        Ok(rows.into_iter().collect())
    }
}
