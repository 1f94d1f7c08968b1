use crate::config::RankingConfig;
use crate::db::{InteractionRepository, SocialGraphRepository};
use crate::error::Result;
use crate::models::{GeoPoint, RankingContext, TargetType};
use crate::services::preference_store::PreferenceStore;
use chrono::{Datelike, Duration, Timelike, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Assembles the per-request `RankingContext`. Fails only when the user's
/// identity record cannot be resolved; preference and history lookups
/// degrade to defaults.
pub struct ContextBuilder {
    graph: Arc<dyn SocialGraphRepository>,
    interactions: Arc<dyn InteractionRepository>,
    preferences: Arc<dyn PreferenceStore>,
    window_days: i64,
    max_interactions: i64,
}

impl ContextBuilder {
    pub fn new(
        graph: Arc<dyn SocialGraphRepository>,
        interactions: Arc<dyn InteractionRepository>,
        preferences: Arc<dyn PreferenceStore>,
        config: &RankingConfig,
    ) -> Self {
        Self {
            graph,
            interactions,
            preferences,
            window_days: config.interaction_window_days,
            max_interactions: config.max_recent_interactions,
        }
    }

    pub async fn build(
        &self,
        user_id: Uuid,
        location_override: Option<GeoPoint>,
    ) -> Result<RankingContext> {
        let profile = self.graph.social_profile(user_id).await?;

        let preferences = match self.preferences.get_or_create(user_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(user_id = %user_id, "Preference lookup failed, using defaults: {}", e);
                crate::models::PreferenceRecord::new(user_id)
            }
        };

        let since = Utc::now() - Duration::days(self.window_days);
        let recent_interactions = match self
            .interactions
            .recent_for_user(user_id, since, self.max_interactions)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                warn!(user_id = %user_id, "Interaction window lookup failed: {}", e);
                Vec::new()
            }
        };

        let interacted_item_ids: HashSet<Uuid> = recent_interactions
            .iter()
            .filter(|r| r.target_type == TargetType::Post)
            .map(|r| r.target_id)
            .collect();

        let location = location_override.or(profile.last_location);

        let now = Utc::now();
        let context = RankingContext {
            user_id,
            following: profile.following,
            followers: profile.followers,
            preferences,
            recent_interactions,
            interacted_item_ids,
            hour_of_day: now.hour(),
            day_of_week: now.weekday().num_days_from_sunday(),
            location,
        };

        debug!(
            user_id = %user_id,
            following = context.following.len(),
            interactions = context.recent_interactions.len(),
            has_location = context.location.is_some(),
            "Ranking context built"
        );

        Ok(context)
    }
}
