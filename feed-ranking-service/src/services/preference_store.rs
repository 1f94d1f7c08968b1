use crate::error::Result;
use crate::models::{PostType, PreferenceRecord, PostTypeAffinity, TopicAffinity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Partial update for the tunable weighting coefficients.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightUpdate {
    pub social_weight: Option<f64>,
    pub location_weight: Option<f64>,
    pub recency_weight: Option<f64>,
}

/// Per-user preference record accessor. Created lazily with zeroed defaults
/// on first access; all histogram/affinity mutations are per-bucket
/// increments so concurrent learners do not overwrite each other's deltas.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_or_create(&self, user_id: Uuid) -> Result<PreferenceRecord>;

    async fn adjust_topic(&self, user_id: Uuid, keyword: &str, delta: f64) -> Result<()>;

    async fn adjust_post_type(&self, user_id: Uuid, post_type: PostType, delta: f64)
        -> Result<()>;

    async fn adjust_hour(&self, user_id: Uuid, hour: u32, delta: f64) -> Result<()>;

    async fn adjust_day(&self, user_id: Uuid, day: u32, delta: f64) -> Result<()>;

    async fn update_weights(&self, user_id: Uuid, update: &WeightUpdate)
        -> Result<PreferenceRecord>;
}

pub struct RedisPreferenceStore {
    redis: redis::Client,
}

impl RedisPreferenceStore {
    pub fn new(redis: redis::Client) -> Self {
        Self { redis }
    }

    fn key(user_id: Uuid) -> String {
        format!("pref:{}", user_id)
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.redis.get_multiplexed_async_connection().await?)
    }

    async fn incr_field(&self, user_id: Uuid, field: &str, delta: f64) -> Result<()> {
        let mut conn = self.conn().await?;
        let key = Self::key(user_id);
        let _: f64 = redis::cmd("HINCRBYFLOAT")
            .arg(&key)
            .arg(field)
            .arg(delta)
            .query_async(&mut conn)
            .await?;
        let _: () = conn
            .hset(&key, "last_updated", Utc::now().to_rfc3339())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for RedisPreferenceStore {
    async fn get_or_create(&self, user_id: Uuid) -> Result<PreferenceRecord> {
        let mut conn = self.conn().await?;
        let key = Self::key(user_id);

        let map: HashMap<String, String> = conn.hgetall(&key).await?;
        if map.is_empty() {
            let record = PreferenceRecord::new(user_id);
            let _: () = conn
                .hset_multiple(
                    &key,
                    &[
                        ("social_weight", record.social_weight.to_string()),
                        ("location_weight", record.location_weight.to_string()),
                        ("recency_weight", record.recency_weight.to_string()),
                        ("last_updated", record.last_updated.to_rfc3339()),
                    ],
                )
                .await?;
            debug!(user_id = %user_id, "Created default preference record");
            return Ok(record);
        }

        Ok(record_from_map(user_id, &map))
    }

    async fn adjust_topic(&self, user_id: Uuid, keyword: &str, delta: f64) -> Result<()> {
        let mut conn = self.conn().await?;
        let key = Self::key(user_id);
        let _: f64 = redis::cmd("HINCRBYFLOAT")
            .arg(&key)
            .arg(format!("topic:{}", keyword))
            .arg(delta)
            .query_async(&mut conn)
            .await?;
        let _: i64 = conn.hincr(&key, format!("topicfreq:{}", keyword), 1i64).await?;
        let _: () = conn
            .hset(&key, "last_updated", Utc::now().to_rfc3339())
            .await?;
        Ok(())
    }

    async fn adjust_post_type(
        &self,
        user_id: Uuid,
        post_type: PostType,
        delta: f64,
    ) -> Result<()> {
        self.incr_field(user_id, &format!("ptype:{}", post_type.as_str()), delta)
            .await
    }

    async fn adjust_hour(&self, user_id: Uuid, hour: u32, delta: f64) -> Result<()> {
        self.incr_field(user_id, &format!("hour:{}", hour % 24), delta).await
    }

    async fn adjust_day(&self, user_id: Uuid, day: u32, delta: f64) -> Result<()> {
        self.incr_field(user_id, &format!("day:{}", day % 7), delta).await
    }

    async fn update_weights(
        &self,
        user_id: Uuid,
        update: &WeightUpdate,
    ) -> Result<PreferenceRecord> {
        // Materialize defaults first so a partial update never observes a
        // half-written record.
        let _ = self.get_or_create(user_id).await?;

        let mut conn = self.conn().await?;
        let key = Self::key(user_id);

        if let Some(social) = update.social_weight {
            let _: () = conn.hset(&key, "social_weight", social.to_string()).await?;
        }
        if let Some(location) = update.location_weight {
            let _: () = conn
                .hset(&key, "location_weight", location.to_string())
                .await?;
        }
        if let Some(recency) = update.recency_weight {
            let _: () = conn.hset(&key, "recency_weight", recency.to_string()).await?;
        }
        let _: () = conn
            .hset(&key, "last_updated", Utc::now().to_rfc3339())
            .await?;

        self.get_or_create(user_id).await
    }
}

/// Rebuild a `PreferenceRecord` from its flat hash representation.
fn record_from_map(user_id: Uuid, map: &HashMap<String, String>) -> PreferenceRecord {
    let mut record = PreferenceRecord::new(user_id);
    let mut frequencies: HashMap<String, u64> = HashMap::new();

    for (field, value) in map {
        if let Some(keyword) = field.strip_prefix("topicfreq:") {
            frequencies.insert(keyword.to_string(), value.parse().unwrap_or(0));
        }
    }

    for (field, value) in map {
        let parsed: f64 = match value.parse() {
            Ok(v) => v,
            Err(_) => {
                if field == "last_updated" {
                    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
                        record.last_updated = ts.with_timezone(&Utc);
                    }
                }
                continue;
            }
        };

        if let Some(keyword) = field.strip_prefix("topic:") {
            record.topic_affinities.push(TopicAffinity {
                keyword: keyword.to_string(),
                score: parsed,
                frequency: frequencies.get(keyword).copied().unwrap_or(0),
            });
        } else if let Some(name) = field.strip_prefix("ptype:") {
            if let Some(post_type) = PostType::parse(name) {
                record.post_type_affinities.push(PostTypeAffinity {
                    post_type,
                    score: parsed,
                });
            }
        } else if let Some(hour) = field.strip_prefix("hour:") {
            if let Ok(h) = hour.parse::<usize>() {
                if h < 24 {
                    record.active_hours[h] = parsed;
                }
            }
        } else if let Some(day) = field.strip_prefix("day:") {
            if let Ok(d) = day.parse::<usize>() {
                if d < 7 {
                    record.active_days[d] = parsed;
                }
            }
        } else {
            match field.as_str() {
                "social_weight" => record.social_weight = parsed,
                "location_weight" => record.location_weight = parsed,
                "recency_weight" => record.recency_weight = parsed,
                _ => {}
            }
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_record_from_map_roundtrips_fields() {
        let user_id = Uuid::new_v4();
        let map = map_of(&[
            ("social_weight", "1.5"),
            ("location_weight", "0.8"),
            ("recency_weight", "1.0"),
            ("hour:9", "0.42"),
            ("day:3", "0.2"),
            ("ptype:video", "0.35"),
            ("topic:rust", "0.6"),
            ("topicfreq:rust", "7"),
        ]);

        let record = record_from_map(user_id, &map);

        assert_eq!(record.social_weight, 1.5);
        assert_eq!(record.location_weight, 0.8);
        assert_eq!(record.hour_activity(9), 0.42);
        assert_eq!(record.day_activity(3), 0.2);
        assert_eq!(record.post_type_score(PostType::Video), 0.35);
        assert_eq!(record.topic_score("rust"), 0.6);
        assert_eq!(record.topic_affinities[0].frequency, 7);
    }

    #[test]
    fn test_record_from_map_ignores_out_of_range_buckets() {
        let user_id = Uuid::new_v4();
        let map = map_of(&[("hour:99", "0.5"), ("day:12", "0.5"), ("ptype:audio", "0.5")]);

        let record = record_from_map(user_id, &map);

        assert!(record.active_hours.iter().all(|v| *v == 0.0));
        assert!(record.active_days.iter().all(|v| *v == 0.0));
        assert!(record.post_type_affinities.is_empty());
    }
}
