use crate::db::{InteractionRepository, SocialGraphRepository};
use crate::models::{
    ContentItem, RankingContext, ScoreBreakdown, ScoreSet, ScoredCandidate, TargetType,
};
use crate::services::content_scores::{recency_score, ContentScoreStore};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

// Fixed combination weights of the engine, not per-user tunables.
const SOCIAL_WEIGHT: f64 = 0.30;
const BEHAVIORAL_WEIGHT: f64 = 0.25;
const CONTENT_WEIGHT: f64 = 0.20;
const LOCATION_WEIGHT: f64 = 0.15;
const TEMPORAL_WEIGHT: f64 = 0.10;

/// Neutral location factor when either side lacks coordinates.
const LOCATION_NEUTRAL: f64 = 0.1;

/// Per-request social annotations batch-fetched before scoring. Missing
/// entries read as zero, so a failed fetch degrades to neutral.
#[derive(Debug, Clone, Default)]
pub struct SocialSignals {
    /// Author id -> count of the user's connections also connected to the
    /// author.
    pub mutual_connections: HashMap<Uuid, i64>,
    /// Item id -> count of engagements on the item by followed users.
    pub friend_engagement: HashMap<Uuid, i64>,
}

/// Computes the normalized [0,1] relevance score for each candidate from
/// five weighted sub-scores.
pub struct RelevanceScorer {
    graph: Arc<dyn SocialGraphRepository>,
    interactions: Arc<dyn InteractionRepository>,
    scores: Arc<dyn ContentScoreStore>,
}

impl RelevanceScorer {
    pub fn new(
        graph: Arc<dyn SocialGraphRepository>,
        interactions: Arc<dyn InteractionRepository>,
        scores: Arc<dyn ContentScoreStore>,
    ) -> Self {
        Self {
            graph,
            interactions,
            scores,
        }
    }

    /// Score and sort candidates, best first. Never fails: signal fetches
    /// degrade to neutral and a failed content-score lookup substitutes the
    /// fixed neutral score set.
    pub async fn score_candidates(
        &self,
        context: &RankingContext,
        candidates: Vec<ContentItem>,
    ) -> Vec<ScoredCandidate> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let signals = self.gather_signals(context, &candidates).await;
        let now = Utc::now();

        let mut scored = Vec::with_capacity(candidates.len());
        for item in candidates {
            let score_set = match self.scores.get_or_compute(&item).await {
                Ok(record) => record.scores,
                Err(e) => {
                    warn!(item_id = %item.id, "Content score lookup failed, using neutral: {}", e);
                    ScoreSet::neutral()
                }
            };
            scored.push(score_candidate(item, context, &signals, &score_set, now));
        }

        // NaN-safe descending sort.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        debug!(
            user_id = %context.user_id,
            scored = scored.len(),
            top_score = scored.first().map(|c| c.score),
            "Scoring complete"
        );

        scored
    }

    async fn gather_signals(
        &self,
        context: &RankingContext,
        candidates: &[ContentItem],
    ) -> SocialSignals {
        let author_ids: Vec<Uuid> = {
            let mut ids: Vec<Uuid> = candidates.iter().map(|c| c.author_id).collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        };
        let item_ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();
        let following: Vec<Uuid> = context.following.iter().copied().collect();

        let mutual_connections = match self
            .graph
            .mutual_connection_counts(context.user_id, &author_ids)
            .await
        {
            Ok(counts) => counts,
            Err(e) => {
                warn!(user_id = %context.user_id, "Mutual connection fetch failed: {}", e);
                HashMap::new()
            }
        };

        let friend_engagement = if following.is_empty() {
            HashMap::new()
        } else {
            match self
                .interactions
                .friend_engagement_counts(&following, &item_ids)
                .await
            {
                Ok(counts) => counts,
                Err(e) => {
                    warn!(user_id = %context.user_id, "Friend engagement fetch failed: {}", e);
                    HashMap::new()
                }
            }
        };

        SocialSignals {
            mutual_connections,
            friend_engagement,
        }
    }
}

fn score_candidate(
    item: ContentItem,
    context: &RankingContext,
    signals: &SocialSignals,
    score_set: &ScoreSet,
    now: DateTime<Utc>,
) -> ScoredCandidate {
    let breakdown = ScoreBreakdown {
        social: social_factor(&item, context, signals),
        behavioral: behavioral_factor(&item, context),
        content: content_factor(&item, context, score_set, now),
        location: location_factor(&item, context),
        temporal: temporal_factor(&item, context, now),
    };

    let total = (SOCIAL_WEIGHT * breakdown.social
        + BEHAVIORAL_WEIGHT * breakdown.behavioral
        + CONTENT_WEIGHT * breakdown.content
        + LOCATION_WEIGHT * breakdown.location
        + TEMPORAL_WEIGHT * breakdown.temporal)
        .clamp(0.0, 1.0);

    ScoredCandidate {
        item,
        score: total,
        breakdown,
    }
}

/// Relationship signal: follow edges, mutual connections, and engagement by
/// the user's connections, damped by the per-user social weight.
pub fn social_factor(item: &ContentItem, context: &RankingContext, signals: &SocialSignals) -> f64 {
    let mut score = if context.following.contains(&item.author_id) {
        0.8
    } else if context.followers.contains(&item.author_id) {
        0.6
    } else {
        0.0
    };

    let mutuals = signals
        .mutual_connections
        .get(&item.author_id)
        .copied()
        .unwrap_or(0)
        .max(0) as f64;
    score += (mutuals * 0.05).min(0.3);

    let friend_engagement = signals
        .friend_engagement
        .get(&item.id)
        .copied()
        .unwrap_or(0)
        .max(0) as f64;
    score += (friend_engagement * 0.1).min(0.4);

    (score * context.preferences.social_weight).clamp(0.0, 1.0)
}

/// Learned-preference signal: type and topic affinities plus historical
/// engagement with the author.
pub fn behavioral_factor(item: &ContentItem, context: &RankingContext) -> f64 {
    let prefs = &context.preferences;

    let type_affinity = prefs.post_type_score(item.post_type).max(0.0);

    let topic_affinity: f64 = item
        .topics
        .iter()
        .map(|t| prefs.topic_score(t).max(0.0))
        .sum();

    let author_engagement = average_author_engagement(context, item.author_id);

    (0.3 * type_affinity + 0.2 * topic_affinity + 0.5 * author_engagement).clamp(0.0, 1.0)
}

/// Mean interaction weight across the user's recent interactions with this
/// author, clamped to [0,1].
fn average_author_engagement(context: &RankingContext, author_id: Uuid) -> f64 {
    let weights: Vec<f64> = context
        .recent_interactions
        .iter()
        .filter(|r| {
            r.target_type == TargetType::Post && r.metadata.author_id == Some(author_id)
        })
        .map(|r| r.interaction_type.weight())
        .collect();

    if weights.is_empty() {
        return 0.0;
    }

    (weights.iter().sum::<f64>() / weights.len() as f64).clamp(0.0, 1.0)
}

/// Item-quality signal from the cached score record plus a freshness term
/// damped by the per-user recency weight.
pub fn content_factor(
    item: &ContentItem,
    context: &RankingContext,
    score_set: &ScoreSet,
    now: DateTime<Utc>,
) -> f64 {
    let freshness = recency_score(item.age_hours(now));

    (0.3 * score_set.quality
        + 0.3 * score_set.engagement
        + 0.2 * score_set.popularity
        + 0.2 * freshness * context.preferences.recency_weight)
        .clamp(0.0, 1.0)
}

/// Distance-tiered proximity bonus. Missing coordinates on either side read
/// as neutral, not zero.
pub fn location_factor(item: &ContentItem, context: &RankingContext) -> f64 {
    let (user_loc, item_lat, item_lon) = match (&context.location, item.latitude, item.longitude) {
        (Some(user_loc), Some(lat), Some(lon)) => (user_loc, lat, lon),
        _ => return LOCATION_NEUTRAL,
    };

    let distance_km =
        crate::utils::haversine_km(user_loc.latitude, user_loc.longitude, item_lat, item_lon);

    let mut score = if distance_km < 10.0 {
        0.8
    } else if distance_km < 50.0 {
        0.6
    } else if distance_km < 200.0 {
        0.3
    } else {
        0.0
    };

    if let (Some(user_city), Some(item_city)) = (&user_loc.city, &item.city) {
        if user_city == item_city {
            score += 0.5;
        }
    }

    (score * context.preferences.location_weight).clamp(0.0, 1.0)
}

/// Activity-rhythm signal: the user's hour/day histograms plus a linear
/// one-week age decay.
pub fn temporal_factor(item: &ContentItem, context: &RankingContext, now: DateTime<Utc>) -> f64 {
    let prefs = &context.preferences;

    let hour_activity = prefs.hour_activity(context.hour_of_day).max(0.0);
    let day_activity = prefs.day_activity(context.day_of_week).max(0.0);

    let age_hours = item.age_hours(now);
    let freshness = (1.0 - age_hours / 168.0).max(0.0);

    (0.3 * hour_activity + 0.3 * day_activity + 0.4 * freshness).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ContentVisibility, EngagementCounters, GeoPoint, InteractionMetadata, InteractionRecord,
        InteractionType, PostType, PreferenceRecord, TopicAffinity,
    };
    use chrono::Duration;
    use std::collections::HashSet;

    fn test_context() -> RankingContext {
        let user_id = Uuid::new_v4();
        RankingContext {
            user_id,
            following: HashSet::new(),
            followers: HashSet::new(),
            preferences: PreferenceRecord::new(user_id),
            recent_interactions: Vec::new(),
            interacted_item_ids: HashSet::new(),
            hour_of_day: 12,
            day_of_week: 3,
            location: None,
        }
    }

    fn test_item(author_id: Uuid, age_hours: i64) -> ContentItem {
        ContentItem {
            id: Uuid::new_v4(),
            author_id,
            author_username: "author".to_string(),
            post_type: PostType::Text,
            topics: vec!["rust".to_string()],
            visibility: ContentVisibility::Public,
            created_at: Utc::now() - Duration::hours(age_hours),
            latitude: None,
            longitude: None,
            city: None,
            counters: EngagementCounters::default(),
        }
    }

    #[test]
    fn test_total_is_clamped_weighted_sum() {
        let author = Uuid::new_v4();
        let mut context = test_context();
        context.following.insert(author);
        let item = test_item(author, 2);

        let signals = SocialSignals::default();
        let score_set = ScoreSet::neutral();
        let now = Utc::now();

        let candidate = score_candidate(item, &context, &signals, &score_set, now);

        let expected = (0.30 * candidate.breakdown.social
            + 0.25 * candidate.breakdown.behavioral
            + 0.20 * candidate.breakdown.content
            + 0.15 * candidate.breakdown.location
            + 0.10 * candidate.breakdown.temporal)
            .clamp(0.0, 1.0);

        assert!((candidate.score - expected).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&candidate.score));
        for factor in [
            candidate.breakdown.social,
            candidate.breakdown.behavioral,
            candidate.breakdown.content,
            candidate.breakdown.location,
            candidate.breakdown.temporal,
        ] {
            assert!((0.0..=1.0).contains(&factor));
        }
    }

    #[test]
    fn test_social_factor_follow_edges() {
        let author = Uuid::new_v4();
        let item = test_item(author, 1);
        let signals = SocialSignals::default();

        let mut context = test_context();
        assert_eq!(social_factor(&item, &context, &signals), 0.0);

        context.followers.insert(author);
        assert!((social_factor(&item, &context, &signals) - 0.6).abs() < 1e-12);

        context.following.insert(author);
        assert!((social_factor(&item, &context, &signals) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_social_factor_bonus_caps() {
        let author = Uuid::new_v4();
        let item = test_item(author, 1);
        let context = test_context();

        let mut signals = SocialSignals::default();
        signals.mutual_connections.insert(author, 100);
        signals.friend_engagement.insert(item.id, 100);

        // 0 base + 0.3 mutual cap + 0.4 friend cap
        assert!((social_factor(&item, &context, &signals) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_social_factor_scaled_by_preference_weight() {
        let author = Uuid::new_v4();
        let item = test_item(author, 1);
        let signals = SocialSignals::default();

        let mut context = test_context();
        context.following.insert(author);
        context.preferences.social_weight = 0.5;

        assert!((social_factor(&item, &context, &signals) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_behavioral_factor_negative_affinities_clamp_to_zero() {
        let author = Uuid::new_v4();
        let item = test_item(author, 1);

        let mut context = test_context();
        context.preferences.topic_affinities.push(TopicAffinity {
            keyword: "rust".to_string(),
            score: -0.9,
            frequency: 3,
        });

        assert_eq!(behavioral_factor(&item, &context), 0.0);
    }

    #[test]
    fn test_behavioral_factor_author_history() {
        let author = Uuid::new_v4();
        let item = test_item(author, 1);

        let mut context = test_context();
        for _ in 0..3 {
            context.recent_interactions.push(InteractionRecord {
                id: Uuid::new_v4(),
                user_id: context.user_id,
                target_type: TargetType::Post,
                target_id: Uuid::new_v4(),
                interaction_type: InteractionType::Like,
                metadata: InteractionMetadata {
                    author_id: Some(author),
                    ..Default::default()
                },
                created_at: Utc::now(),
            });
        }

        // 0.5 * avg(0.3) = 0.15
        assert!((behavioral_factor(&item, &context) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_content_factor_recency_halves_every_24h() {
        let context = test_context();
        let empty = ScoreSet {
            popularity: 0.0,
            engagement: 0.0,
            quality: 0.0,
            recency: 0.0,
            virality: 0.0,
            relevance: 0.0,
            diversity: 0.0,
        };
        let now = Utc::now();

        let fresh = content_factor(&test_item(Uuid::new_v4(), 0), &context, &empty, now);
        let day_old = content_factor(&test_item(Uuid::new_v4(), 24), &context, &empty, now);

        // Only the freshness term is non-zero here, so the ratio is the
        // decay itself.
        assert!((day_old / fresh - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_location_factor_neutral_without_coordinates() {
        let item = test_item(Uuid::new_v4(), 1);
        let context = test_context();
        assert_eq!(location_factor(&item, &context), LOCATION_NEUTRAL);

        let mut located_context = test_context();
        located_context.location = Some(GeoPoint {
            latitude: 40.7,
            longitude: -74.0,
            city: None,
            country: None,
        });
        // Item still has no coordinates.
        assert_eq!(location_factor(&item, &located_context), LOCATION_NEUTRAL);
    }

    #[test]
    fn test_location_factor_distance_tiers_and_city_match() {
        let mut context = test_context();
        context.location = Some(GeoPoint {
            latitude: 40.7128,
            longitude: -74.006,
            city: Some("New York".to_string()),
            country: Some("US".to_string()),
        });

        let mut close = test_item(Uuid::new_v4(), 1);
        close.latitude = Some(40.72);
        close.longitude = Some(-74.0);
        close.city = Some("New York".to_string());

        // 0.8 near bonus + 0.5 city match, clamped to 1.0
        assert_eq!(location_factor(&close, &context), 1.0);

        let mut far = test_item(Uuid::new_v4(), 1);
        far.latitude = Some(34.05);
        far.longitude = Some(-118.24);
        far.city = Some("Los Angeles".to_string());

        assert_eq!(location_factor(&far, &context), 0.0);
    }

    #[test]
    fn test_temporal_factor_week_decay() {
        let context = test_context();
        let now = Utc::now();

        let fresh = temporal_factor(&test_item(Uuid::new_v4(), 0), &context, now);
        let half_week = temporal_factor(&test_item(Uuid::new_v4(), 84), &context, now);
        let stale = temporal_factor(&test_item(Uuid::new_v4(), 300), &context, now);

        assert!((fresh - 0.4).abs() < 1e-3);
        assert!((half_week - 0.2).abs() < 1e-3);
        assert_eq!(stale, 0.0);
    }
}
