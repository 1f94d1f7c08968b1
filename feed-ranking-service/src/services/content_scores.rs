use crate::error::Result;
use crate::models::{ContentItem, ContentScoreRecord, ScoreSet};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::AsyncCommands;
use tracing::warn;
use uuid::Uuid;

/// Cached per-item score accessor. Scores are recomputed lazily when absent
/// or older than the freshness threshold.
#[async_trait]
pub trait ContentScoreStore: Send + Sync {
    async fn get_or_compute(&self, item: &ContentItem) -> Result<ContentScoreRecord>;
}

pub struct RedisContentScoreStore {
    redis: redis::Client,
    ttl_days: i64,
}

impl RedisContentScoreStore {
    pub fn new(redis: redis::Client, ttl_days: i64) -> Self {
        Self { redis, ttl_days }
    }

    fn key(item_id: Uuid) -> String {
        format!("cscore:{}", item_id)
    }

    fn is_fresh(&self, record: &ContentScoreRecord, now: DateTime<Utc>) -> bool {
        now - record.last_calculated < Duration::days(self.ttl_days)
    }
}

#[async_trait]
impl ContentScoreStore for RedisContentScoreStore {
    async fn get_or_compute(&self, item: &ContentItem) -> Result<ContentScoreRecord> {
        let now = Utc::now();
        let key = Self::key(item.id);

        // Cache misses and cache errors both fall through to a recompute;
        // the cache is an optimization, not a source of truth.
        match self.redis.get_multiplexed_async_connection().await {
            Ok(mut conn) => {
                let cached: Option<String> = conn.get(&key).await.unwrap_or(None);
                if let Some(json) = cached {
                    if let Ok(record) = serde_json::from_str::<ContentScoreRecord>(&json) {
                        if self.is_fresh(&record, now) {
                            return Ok(record);
                        }
                    }
                }

                let record = compute_score_record(item, now);
                match serde_json::to_string(&record) {
                    Ok(json) => {
                        let ttl_secs = (self.ttl_days * 86_400) as u64;
                        if let Err(e) = conn.set_ex::<_, _, ()>(&key, json, ttl_secs).await {
                            warn!(item_id = %item.id, "Content score cache write failed: {}", e);
                        }
                    }
                    Err(e) => warn!(item_id = %item.id, "Content score serialization failed: {}", e),
                }
                Ok(record)
            }
            Err(e) => {
                warn!(item_id = %item.id, "Content score cache unavailable: {}", e);
                Ok(compute_score_record(item, now))
            }
        }
    }
}

/// Derive the cached score set from an item's raw engagement counters.
pub fn compute_score_record(item: &ContentItem, now: DateTime<Utc>) -> ContentScoreRecord {
    let c = &item.counters;

    let views = c.views.max(0) as f64;
    let likes = c.likes.max(0) as f64;
    let comments = c.comments.max(0) as f64;
    let shares = c.shares.max(0) as f64;
    let saves = c.saves.max(0) as f64;

    // Log-damped counter normalization so viral outliers saturate instead of
    // dominating.
    let popularity = ((1.0 + views).ln() / (1.0 + 100_000.0_f64).ln()).clamp(0.0, 1.0);
    let engagement = ((1.0 + likes + 2.0 * comments + 3.0 * shares + 2.0 * saves).ln()
        / (1.0 + 10_000.0_f64).ln())
    .clamp(0.0, 1.0);
    let virality = ((1.0 + shares).ln() / (1.0 + 1_000.0_f64).ln()).clamp(0.0, 1.0);

    let engagement_rate = ((likes + comments + shares + saves) / views.max(1.0)).clamp(0.0, 1.0);
    let dwell_norm = (c.avg_dwell_secs / 180.0).clamp(0.0, 1.0);
    let quality = (0.5 * engagement_rate
        + 0.3 * c.click_through_rate.clamp(0.0, 1.0)
        + 0.2 * dwell_norm)
        .clamp(0.0, 1.0);

    let recency = recency_score(item.age_hours(now));

    ContentScoreRecord {
        item_id: item.id,
        author_id: item.author_id,
        scores: ScoreSet {
            popularity,
            engagement,
            quality,
            recency,
            virality,
            relevance: 0.5,
            diversity: 0.5,
        },
        metrics: c.clone(),
        last_calculated: now,
    }
}

/// Freshness signal with a 24-hour half-life.
pub fn recency_score(age_hours: f64) -> f64 {
    (-age_hours.max(0.0) / 24.0).exp2().clamp(0.0, 1.0)
}
