use crate::db::{ContentRepository, InteractionRepository};
use crate::error::Result;
use crate::models::{
    ContentItem, InteractionMetadata, InteractionRecord, InteractionType, PostType,
    ScoredCandidate, TargetType, MAX_TOPIC_AFFINITIES,
};
use crate::services::preference_store::PreferenceStore;
use chrono::{Datelike, Timelike, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

// Increment steps keep affinity scores damped; a single interaction never
// swings a preference.
const TOPIC_STEP: f64 = 0.1;
const POST_TYPE_STEP: f64 = 0.05;
const HOUR_STEP: f64 = 0.02;

const SHOWN_HOUR_STEP: f64 = 0.01;
const SHOWN_DAY_STEP: f64 = 0.01;
const SHOWN_POST_TYPE_STEP: f64 = 0.02;
const SHOWN_TOPIC_STEP: f64 = 0.01;

/// Consumes tracked interactions and incrementally updates the per-user
/// preference record. Fire-and-forget: failures are logged, never
/// propagated to callers.
pub struct PreferenceLearner {
    interactions: Arc<dyn InteractionRepository>,
    content: Arc<dyn ContentRepository>,
    preferences: Arc<dyn PreferenceStore>,
}

impl PreferenceLearner {
    pub fn new(
        interactions: Arc<dyn InteractionRepository>,
        content: Arc<dyn ContentRepository>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            interactions,
            content,
            preferences,
        }
    }

    /// Append one interaction record and fold it into the preference
    /// record.
    pub async fn record_interaction(
        &self,
        user_id: Uuid,
        target_type: TargetType,
        target_id: Uuid,
        interaction_type: InteractionType,
        mut metadata: InteractionMetadata,
    ) {
        let now = Utc::now();
        if metadata.time_of_day.is_none() {
            metadata.time_of_day = Some(now.hour());
        }
        if metadata.day_of_week.is_none() {
            metadata.day_of_week = Some(now.weekday().num_days_from_sunday());
        }

        // Resolve the target item once; it feeds both the denormalized
        // author id on the record and the affinity updates.
        let target_item = if target_type == TargetType::Post {
            match self.content.get_by_id(target_id).await {
                Ok(item) => item,
                Err(e) => {
                    debug!(target_id = %target_id, "Target lookup failed during tracking: {}", e);
                    None
                }
            }
        } else {
            None
        };

        if metadata.author_id.is_none() {
            metadata.author_id = target_item.as_ref().map(|item| item.author_id);
        }

        let record = InteractionRecord {
            id: Uuid::new_v4(),
            user_id,
            target_type,
            target_id,
            interaction_type,
            metadata,
            created_at: now,
        };

        if let Err(e) = self.interactions.append(&record).await {
            warn!(user_id = %user_id, "Interaction append failed: {}", e);
            return;
        }

        let weight = interaction_type.weight();

        if let Some(item) = &target_item {
            if let Err(e) = self.apply_content_affinities(user_id, item, weight).await {
                warn!(user_id = %user_id, "Preference affinity update failed: {}", e);
            }
        }

        if let Some(hour) = record.metadata.time_of_day {
            if let Err(e) = self
                .preferences
                .adjust_hour(user_id, hour, weight * HOUR_STEP)
                .await
            {
                warn!(user_id = %user_id, "Preference hour update failed: {}", e);
            }
        }

        debug!(
            user_id = %user_id,
            interaction = %interaction_type,
            target = %target_id,
            "Interaction recorded"
        );
    }

    async fn apply_content_affinities(
        &self,
        user_id: Uuid,
        item: &ContentItem,
        weight: f64,
    ) -> Result<()> {
        let record = self.preferences.get_or_create(user_id).await?;
        let mut slots_left = MAX_TOPIC_AFFINITIES.saturating_sub(record.topic_affinities.len());

        for topic in &item.topics {
            if record.has_topic(topic) {
                self.preferences
                    .adjust_topic(user_id, topic, weight * TOPIC_STEP)
                    .await?;
            } else if slots_left > 0 {
                slots_left -= 1;
                self.preferences
                    .adjust_topic(user_id, topic, weight * TOPIC_STEP)
                    .await?;
            }
            // Over-cap new topics are dropped, not evicted.
        }

        self.preferences
            .adjust_post_type(user_id, item.post_type, weight * POST_TYPE_STEP)
            .await?;

        Ok(())
    }

    /// Record which items a ranking response surfaced, nudging the temporal
    /// and content histograms toward what was shown. A deliberately mild
    /// feedback loop.
    pub async fn record_shown(&self, user_id: Uuid, shown: &[ScoredCandidate]) {
        if shown.is_empty() {
            return;
        }

        let now = Utc::now();
        let hour = now.hour();
        let day = now.weekday().num_days_from_sunday();

        for (position, candidate) in shown.iter().enumerate() {
            let record = InteractionRecord {
                id: Uuid::new_v4(),
                user_id,
                target_type: TargetType::Post,
                target_id: candidate.item.id,
                interaction_type: InteractionType::RecommendationShown,
                metadata: InteractionMetadata {
                    feed_position: Some(position as u32),
                    time_of_day: Some(hour),
                    day_of_week: Some(day),
                    author_id: Some(candidate.item.author_id),
                    ..Default::default()
                },
                created_at: now,
            };
            if let Err(e) = self.interactions.append(&record).await {
                warn!(user_id = %user_id, "Shown-item append failed: {}", e);
            }
        }

        if let Err(e) = self.preferences.adjust_hour(user_id, hour, SHOWN_HOUR_STEP).await {
            warn!(user_id = %user_id, "Shown hour update failed: {}", e);
        }
        if let Err(e) = self.preferences.adjust_day(user_id, day, SHOWN_DAY_STEP).await {
            warn!(user_id = %user_id, "Shown day update failed: {}", e);
        }

        let total = shown.len() as f64;
        let mut type_counts: HashMap<PostType, usize> = HashMap::new();
        let mut topic_counts: HashMap<String, usize> = HashMap::new();
        for candidate in shown {
            *type_counts.entry(candidate.item.post_type).or_insert(0) += 1;
            for topic in &candidate.item.topics {
                *topic_counts.entry(topic.clone()).or_insert(0) += 1;
            }
        }

        for (post_type, count) in type_counts {
            let delta = count as f64 / total * SHOWN_POST_TYPE_STEP;
            if let Err(e) = self.preferences.adjust_post_type(user_id, post_type, delta).await {
                warn!(user_id = %user_id, "Shown type update failed: {}", e);
            }
        }

        let total_topics: usize = topic_counts.values().sum();
        if total_topics > 0 {
            let record = match self.preferences.get_or_create(user_id).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(user_id = %user_id, "Preference read failed during shown update: {}", e);
                    return;
                }
            };
            let mut slots_left =
                MAX_TOPIC_AFFINITIES.saturating_sub(record.topic_affinities.len());

            for (topic, count) in topic_counts {
                let is_new = !record.has_topic(&topic);
                if is_new {
                    if slots_left == 0 {
                        continue;
                    }
                    slots_left -= 1;
                }
                let delta = count as f64 / total_topics as f64 * SHOWN_TOPIC_STEP;
                if let Err(e) = self.preferences.adjust_topic(user_id, &topic, delta).await {
                    warn!(user_id = %user_id, "Shown topic update failed: {}", e);
                }
            }
        }

        debug!(user_id = %user_id, shown = shown.len(), "Shown feedback recorded");
    }
}
