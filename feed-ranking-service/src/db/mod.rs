mod content_repo;
mod interaction_repo;
mod social_repo;

pub use content_repo::PgContentRepository;
pub use interaction_repo::PgInteractionRepository;
pub use social_repo::PgSocialGraphRepository;

use crate::error::Result;
use crate::models::{ContentItem, GeoPoint, InteractionRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Narrow per-need query interface over the content store. The candidate
/// retriever depends only on these methods, not on a query language.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Items authored by the given users, visible to connections, newest
    /// first, within the window.
    async fn find_by_authors(
        &self,
        author_ids: &[Uuid],
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ContentItem>>;

    /// Public items ranked by raw engagement counters.
    async fn find_popular(&self, limit: i64) -> Result<Vec<ContentItem>>;

    /// Public items within `radius_km` of the coordinates.
    async fn find_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: i64,
    ) -> Result<Vec<ContentItem>>;

    /// Public items matching any of the topic keywords, newest first.
    async fn find_by_topics(&self, topics: &[String], limit: i64) -> Result<Vec<ContentItem>>;

    /// Public items created after `since`, ranked by engagement counters.
    async fn find_trending(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<ContentItem>>;

    /// Reverse-chronological followed-or-public items; the fallback feed
    /// query.
    async fn find_recent(
        &self,
        author_ids: &[Uuid],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ContentItem>>;

    async fn get_by_id(&self, item_id: Uuid) -> Result<Option<ContentItem>>;
}

/// A user's resolved social surroundings.
#[derive(Debug, Clone)]
pub struct SocialProfile {
    pub user_id: Uuid,
    pub following: HashSet<Uuid>,
    pub followers: HashSet<Uuid>,
    pub last_location: Option<GeoPoint>,
}

#[async_trait]
pub trait SocialGraphRepository: Send + Sync {
    /// Resolve following/follower id sets and the last known location.
    /// Returns `AppError::NotFound` for an unknown user.
    async fn social_profile(&self, user_id: Uuid) -> Result<SocialProfile>;

    /// Per-author count of the user's connections that also connect to the
    /// author.
    async fn mutual_connection_counts(
        &self,
        user_id: Uuid,
        author_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>>;
}

#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// Append-only write; records are never mutated afterwards.
    async fn append(&self, record: &InteractionRecord) -> Result<()>;

    /// Bounded read of a user's records inside the window, newest first.
    async fn recent_for_user(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<InteractionRecord>>;

    /// Per-item count of engagement interactions by the given (followed)
    /// users.
    async fn friend_engagement_counts(
        &self,
        following: &[Uuid],
        item_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>>;
}
