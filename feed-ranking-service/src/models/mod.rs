use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Topic affinity list cap per preference record. New topics beyond the cap
/// are dropped, not evicted.
pub const MAX_TOPIC_AFFINITIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Text,
    Image,
    Video,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

impl std::fmt::Display for PostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentVisibility {
    Public,
    Connections,
    Private,
}

impl ContentVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Connections => "connections",
            Self::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "connections" => Some(Self::Connections),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// Raw engagement counters for one content item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementCounters {
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub saves: i64,
    pub click_through_rate: f64,
    pub avg_dwell_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// A content item as returned by the content repository, with author fields
/// populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub post_type: PostType,
    pub topics: Vec<String>,
    pub visibility: ContentVisibility,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub counters: EngagementCounters,
}

impl ContentItem {
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        ((now - self.created_at).num_seconds().max(0) as f64) / 3600.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicAffinity {
    pub keyword: String,
    pub score: f64,
    pub frequency: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostTypeAffinity {
    pub post_type: PostType,
    pub score: f64,
}

/// Per-user heuristic preference model. Mutated only by the preference
/// learner; created lazily with zeroed defaults on first access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRecord {
    pub user_id: Uuid,
    pub topic_affinities: Vec<TopicAffinity>,
    pub post_type_affinities: Vec<PostTypeAffinity>,
    /// Activity weight per hour of day, 24 entries.
    pub active_hours: Vec<f64>,
    /// Activity weight per day of week, 7 entries.
    pub active_days: Vec<f64>,
    pub social_weight: f64,
    pub location_weight: f64,
    pub recency_weight: f64,
    pub last_updated: DateTime<Utc>,
}

impl PreferenceRecord {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            topic_affinities: Vec::new(),
            post_type_affinities: Vec::new(),
            active_hours: vec![0.0; 24],
            active_days: vec![0.0; 7],
            social_weight: 1.0,
            location_weight: 1.0,
            recency_weight: 1.0,
            last_updated: Utc::now(),
        }
    }

    pub fn topic_score(&self, keyword: &str) -> f64 {
        self.topic_affinities
            .iter()
            .find(|t| t.keyword == keyword)
            .map(|t| t.score)
            .unwrap_or(0.0)
    }

    pub fn post_type_score(&self, post_type: PostType) -> f64 {
        self.post_type_affinities
            .iter()
            .find(|t| t.post_type == post_type)
            .map(|t| t.score)
            .unwrap_or(0.0)
    }

    pub fn hour_activity(&self, hour: u32) -> f64 {
        self.active_hours.get(hour as usize).copied().unwrap_or(0.0)
    }

    pub fn day_activity(&self, day: u32) -> f64 {
        self.active_days.get(day as usize).copied().unwrap_or(0.0)
    }

    /// Highest-scoring positive topic keywords, best first.
    pub fn top_topics(&self, n: usize) -> Vec<String> {
        let mut topics: Vec<&TopicAffinity> = self
            .topic_affinities
            .iter()
            .filter(|t| t.score > 0.0)
            .collect();
        topics.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        topics.into_iter().take(n).map(|t| t.keyword.clone()).collect()
    }

    pub fn has_topic(&self, keyword: &str) -> bool {
        self.topic_affinities.iter().any(|t| t.keyword == keyword)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    View,
    Like,
    Comment,
    Share,
    Save,
    Click,
    Follow,
    Hide,
    Report,
    RecommendationShown,
}

impl InteractionType {
    /// Learning weight per interaction kind. Negative weights push the
    /// matching affinities down.
    pub fn weight(&self) -> f64 {
        match self {
            Self::View => 0.1,
            Self::Like => 0.3,
            Self::Comment => 0.5,
            Self::Share => 0.7,
            Self::Save => 0.6,
            Self::Click => 0.4,
            Self::Follow => 0.8,
            Self::Hide => -0.5,
            Self::Report => -1.0,
            Self::RecommendationShown => 0.1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Share => "share",
            Self::Save => "save",
            Self::Click => "click",
            Self::Follow => "follow",
            Self::Hide => "hide",
            Self::Report => "report",
            Self::RecommendationShown => "recommendation_shown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view" => Some(Self::View),
            "like" => Some(Self::Like),
            "comment" => Some(Self::Comment),
            "share" => Some(Self::Share),
            "save" => Some(Self::Save),
            "click" => Some(Self::Click),
            "follow" => Some(Self::Follow),
            "hide" => Some(Self::Hide),
            "report" => Some(Self::Report),
            "recommendation_shown" => Some(Self::RecommendationShown),
            _ => None,
        }
    }

    /// Interactions that count as engagement when aggregating friend
    /// activity on an item.
    pub fn is_engagement(&self) -> bool {
        matches!(self, Self::Like | Self::Comment | Self::Share | Self::Save)
    }
}

impl std::fmt::Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Post,
    User,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "post" => Some(Self::Post),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dwell_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_depth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u32>,
    /// Author of the target content, recorded at tracking time so historical
    /// author engagement can be derived without re-resolving items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

/// Append-only record of one observed user action. Never mutated after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub interaction_type: InteractionType,
    pub metadata: InteractionMetadata,
    pub created_at: DateTime<Utc>,
}

/// Cached quality/engagement/popularity summary for one content item, each
/// component normalized to [0,1].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSet {
    pub popularity: f64,
    pub engagement: f64,
    pub quality: f64,
    pub recency: f64,
    pub virality: f64,
    pub relevance: f64,
    pub diversity: f64,
}

impl ScoreSet {
    /// Fixed fallback used when a score lookup or recompute fails.
    pub fn neutral() -> Self {
        Self {
            popularity: 0.5,
            engagement: 0.5,
            quality: 0.5,
            recency: 0.5,
            virality: 0.5,
            relevance: 0.5,
            diversity: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentScoreRecord {
    pub item_id: Uuid,
    pub author_id: Uuid,
    pub scores: ScoreSet,
    pub metrics: EngagementCounters,
    pub last_calculated: DateTime<Utc>,
}

/// Everything one ranking request needs about the requesting user. Built
/// fresh per request; never persisted.
#[derive(Debug, Clone)]
pub struct RankingContext {
    pub user_id: Uuid,
    pub following: HashSet<Uuid>,
    pub followers: HashSet<Uuid>,
    pub preferences: PreferenceRecord,
    pub recent_interactions: Vec<InteractionRecord>,
    /// Item ids the user already interacted with inside the window; these
    /// are excluded from candidates entirely.
    pub interacted_item_ids: HashSet<Uuid>,
    pub hour_of_day: u32,
    pub day_of_week: u32,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub social: f64,
    pub behavioral: f64,
    pub content: f64,
    pub location: f64,
    pub temporal: f64,
}

/// One candidate joined with its relevance score. Lifetime is a single
/// ranking request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub item: ContentItem,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMetadata {
    pub total_candidates: usize,
    pub diversity_applied: bool,
    pub page: usize,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub items: Vec<ScoredCandidate>,
    pub metadata: FeedMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_weights_table() {
        assert_eq!(InteractionType::View.weight(), 0.1);
        assert_eq!(InteractionType::Like.weight(), 0.3);
        assert_eq!(InteractionType::Comment.weight(), 0.5);
        assert_eq!(InteractionType::Share.weight(), 0.7);
        assert_eq!(InteractionType::Save.weight(), 0.6);
        assert_eq!(InteractionType::Click.weight(), 0.4);
        assert_eq!(InteractionType::Follow.weight(), 0.8);
        assert_eq!(InteractionType::Hide.weight(), -0.5);
        assert_eq!(InteractionType::Report.weight(), -1.0);
    }

    #[test]
    fn test_top_topics_ignores_negative_scores() {
        let mut record = PreferenceRecord::new(Uuid::new_v4());
        record.topic_affinities = vec![
            TopicAffinity {
                keyword: "rust".to_string(),
                score: 0.4,
                frequency: 4,
            },
            TopicAffinity {
                keyword: "spam".to_string(),
                score: -0.8,
                frequency: 9,
            },
            TopicAffinity {
                keyword: "music".to_string(),
                score: 0.9,
                frequency: 2,
            },
        ];

        let top = record.top_topics(10);
        assert_eq!(top, vec!["music".to_string(), "rust".to_string()]);
    }

    #[test]
    fn test_default_record_is_neutral() {
        let record = PreferenceRecord::new(Uuid::new_v4());
        assert_eq!(record.active_hours.len(), 24);
        assert_eq!(record.active_days.len(), 7);
        assert!(record.active_hours.iter().all(|v| *v == 0.0));
        assert_eq!(record.social_weight, 1.0);
        assert_eq!(record.location_weight, 1.0);
        assert_eq!(record.recency_weight, 1.0);
    }

    #[test]
    fn test_interaction_type_roundtrip() {
        for t in [
            InteractionType::View,
            InteractionType::Like,
            InteractionType::Comment,
            InteractionType::Share,
            InteractionType::Save,
            InteractionType::Click,
            InteractionType::Follow,
            InteractionType::Hide,
            InteractionType::Report,
            InteractionType::RecommendationShown,
        ] {
            assert_eq!(InteractionType::parse(t.as_str()), Some(t));
        }
    }
}
