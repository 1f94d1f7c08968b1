//! In-memory store implementations backing the engine integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use feed_ranking::config::{RankingConfig, RetrievalConfig};
use feed_ranking::db::{
    ContentRepository, InteractionRepository, SocialGraphRepository, SocialProfile,
};
use feed_ranking::error::{AppError, Result};
use feed_ranking::models::{
    ContentItem, ContentScoreRecord, ContentVisibility, EngagementCounters, GeoPoint,
    InteractionRecord, PostType, PostTypeAffinity, PreferenceRecord, TopicAffinity,
};
use feed_ranking::services::content_scores::compute_score_record;
use feed_ranking::services::{ContentScoreStore, FeedRankingEngine, PreferenceStore, WeightUpdate};
use feed_ranking::utils::haversine_km;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

fn engagement(item: &ContentItem) -> i64 {
    item.counters.likes + item.counters.comments * 2 + item.counters.shares * 3
}

#[derive(Default)]
pub struct InMemoryContentRepo {
    items: RwLock<Vec<ContentItem>>,
}

impl InMemoryContentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, item: ContentItem) {
        self.items.write().unwrap().push(item);
    }

    fn sorted_desc(mut items: Vec<ContentItem>) -> Vec<ContentItem> {
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepo {
    async fn find_by_authors(
        &self,
        author_ids: &[Uuid],
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ContentItem>> {
        let authors: HashSet<Uuid> = author_ids.iter().copied().collect();
        let items: Vec<ContentItem> = self
            .items
            .read()
            .unwrap()
            .iter()
            .filter(|i| {
                authors.contains(&i.author_id)
                    && i.visibility != ContentVisibility::Private
                    && i.created_at >= since
            })
            .cloned()
            .collect();
        Ok(Self::sorted_desc(items).into_iter().take(limit as usize).collect())
    }

    async fn find_popular(&self, limit: i64) -> Result<Vec<ContentItem>> {
        let mut items: Vec<ContentItem> = self
            .items
            .read()
            .unwrap()
            .iter()
            .filter(|i| i.visibility == ContentVisibility::Public)
            .cloned()
            .collect();
        items.sort_by_key(|i| std::cmp::Reverse(engagement(i)));
        Ok(items.into_iter().take(limit as usize).collect())
    }

    async fn find_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: i64,
    ) -> Result<Vec<ContentItem>> {
        let items: Vec<ContentItem> = self
            .items
            .read()
            .unwrap()
            .iter()
            .filter(|i| {
                i.visibility == ContentVisibility::Public
                    && match (i.latitude, i.longitude) {
                        (Some(lat), Some(lon)) => {
                            haversine_km(latitude, longitude, lat, lon) <= radius_km
                        }
                        _ => false,
                    }
            })
            .cloned()
            .collect();
        Ok(Self::sorted_desc(items).into_iter().take(limit as usize).collect())
    }

    async fn find_by_topics(&self, topics: &[String], limit: i64) -> Result<Vec<ContentItem>> {
        let wanted: HashSet<&String> = topics.iter().collect();
        let items: Vec<ContentItem> = self
            .items
            .read()
            .unwrap()
            .iter()
            .filter(|i| {
                i.visibility == ContentVisibility::Public
                    && i.topics.iter().any(|t| wanted.contains(t))
            })
            .cloned()
            .collect();
        Ok(Self::sorted_desc(items).into_iter().take(limit as usize).collect())
    }

    async fn find_trending(&self, since: DateTime<Utc>, limit: i64) -> Result<Vec<ContentItem>> {
        let mut items: Vec<ContentItem> = self
            .items
            .read()
            .unwrap()
            .iter()
            .filter(|i| i.visibility == ContentVisibility::Public && i.created_at >= since)
            .cloned()
            .collect();
        items.sort_by_key(|i| std::cmp::Reverse(engagement(i)));
        Ok(items.into_iter().take(limit as usize).collect())
    }

    async fn find_recent(
        &self,
        author_ids: &[Uuid],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ContentItem>> {
        let authors: HashSet<Uuid> = author_ids.iter().copied().collect();
        let items: Vec<ContentItem> = self
            .items
            .read()
            .unwrap()
            .iter()
            .filter(|i| {
                i.visibility == ContentVisibility::Public || authors.contains(&i.author_id)
            })
            .cloned()
            .collect();
        Ok(Self::sorted_desc(items)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn get_by_id(&self, item_id: Uuid) -> Result<Option<ContentItem>> {
        Ok(self
            .items
            .read()
            .unwrap()
            .iter()
            .find(|i| i.id == item_id)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemorySocialGraph {
    profiles: RwLock<HashMap<Uuid, SocialProfile>>,
    mutuals: RwLock<HashMap<(Uuid, Uuid), i64>>,
}

impl InMemorySocialGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user_id: Uuid) {
        self.profiles
            .write()
            .unwrap()
            .entry(user_id)
            .or_insert_with(|| SocialProfile {
                user_id,
                following: HashSet::new(),
                followers: HashSet::new(),
                last_location: None,
            });
    }

    pub fn set_location(&self, user_id: Uuid, location: GeoPoint) {
        self.add_user(user_id);
        if let Some(profile) = self.profiles.write().unwrap().get_mut(&user_id) {
            profile.last_location = Some(location);
        }
    }

    pub fn follow(&self, follower: Uuid, followee: Uuid) {
        self.add_user(follower);
        self.add_user(followee);
        let mut profiles = self.profiles.write().unwrap();
        profiles.get_mut(&follower).unwrap().following.insert(followee);
        profiles.get_mut(&followee).unwrap().followers.insert(follower);
    }

    pub fn set_mutuals(&self, user_id: Uuid, author_id: Uuid, count: i64) {
        self.mutuals.write().unwrap().insert((user_id, author_id), count);
    }
}

#[async_trait]
impl SocialGraphRepository for InMemorySocialGraph {
    async fn social_profile(&self, user_id: Uuid) -> Result<SocialProfile> {
        self.profiles
            .read()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", user_id)))
    }

    async fn mutual_connection_counts(
        &self,
        user_id: Uuid,
        author_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>> {
        let mutuals = self.mutuals.read().unwrap();
        Ok(author_ids
            .iter()
            .filter_map(|author| {
                mutuals
                    .get(&(user_id, *author))
                    .map(|count| (*author, *count))
            })
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryInteractions {
    records: RwLock<Vec<InteractionRecord>>,
}

impl InMemoryInteractions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<InteractionRecord> {
        self.records.read().unwrap().clone()
    }

    pub fn seed(&self, record: InteractionRecord) {
        self.records.write().unwrap().push(record);
    }
}

#[async_trait]
impl InteractionRepository for InMemoryInteractions {
    async fn append(&self, record: &InteractionRecord) -> Result<()> {
        self.records.write().unwrap().push(record.clone());
        Ok(())
    }

    async fn recent_for_user(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<InteractionRecord>> {
        let mut records: Vec<InteractionRecord> = self
            .records
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id && r.created_at >= since)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn friend_engagement_counts(
        &self,
        following: &[Uuid],
        item_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>> {
        let friends: HashSet<Uuid> = following.iter().copied().collect();
        let items: HashSet<Uuid> = item_ids.iter().copied().collect();

        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for record in self.records.read().unwrap().iter() {
            if friends.contains(&record.user_id)
                && items.contains(&record.target_id)
                && record.interaction_type.is_engagement()
            {
                *counts.entry(record.target_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

/// Preference store over a plain map. The topic cap is enforced by the
/// learner, so this fake applies increments unconditionally.
#[derive(Default)]
pub struct InMemoryPreferences {
    records: Mutex<HashMap<Uuid, PreferenceRecord>>,
}

impl InMemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, record: PreferenceRecord) {
        self.records.lock().unwrap().insert(record.user_id, record);
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferences {
    async fn get_or_create(&self, user_id: Uuid) -> Result<PreferenceRecord> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .entry(user_id)
            .or_insert_with(|| PreferenceRecord::new(user_id))
            .clone())
    }

    async fn adjust_topic(&self, user_id: Uuid, keyword: &str, delta: f64) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(user_id)
            .or_insert_with(|| PreferenceRecord::new(user_id));
        match record
            .topic_affinities
            .iter_mut()
            .find(|t| t.keyword == keyword)
        {
            Some(topic) => {
                topic.score += delta;
                topic.frequency += 1;
            }
            None => record.topic_affinities.push(TopicAffinity {
                keyword: keyword.to_string(),
                score: delta,
                frequency: 1,
            }),
        }
        record.last_updated = Utc::now();
        Ok(())
    }

    async fn adjust_post_type(
        &self,
        user_id: Uuid,
        post_type: PostType,
        delta: f64,
    ) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(user_id)
            .or_insert_with(|| PreferenceRecord::new(user_id));
        match record
            .post_type_affinities
            .iter_mut()
            .find(|t| t.post_type == post_type)
        {
            Some(affinity) => affinity.score += delta,
            None => record.post_type_affinities.push(PostTypeAffinity {
                post_type,
                score: delta,
            }),
        }
        record.last_updated = Utc::now();
        Ok(())
    }

    async fn adjust_hour(&self, user_id: Uuid, hour: u32, delta: f64) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(user_id)
            .or_insert_with(|| PreferenceRecord::new(user_id));
        record.active_hours[(hour % 24) as usize] += delta;
        record.last_updated = Utc::now();
        Ok(())
    }

    async fn adjust_day(&self, user_id: Uuid, day: u32, delta: f64) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(user_id)
            .or_insert_with(|| PreferenceRecord::new(user_id));
        record.active_days[(day % 7) as usize] += delta;
        record.last_updated = Utc::now();
        Ok(())
    }

    async fn update_weights(
        &self,
        user_id: Uuid,
        update: &WeightUpdate,
    ) -> Result<PreferenceRecord> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(user_id)
            .or_insert_with(|| PreferenceRecord::new(user_id));
        if let Some(social) = update.social_weight {
            record.social_weight = social;
        }
        if let Some(location) = update.location_weight {
            record.location_weight = location;
        }
        if let Some(recency) = update.recency_weight {
            record.recency_weight = recency;
        }
        record.last_updated = Utc::now();
        Ok(record.clone())
    }
}

/// Score store that recomputes on every call; no cache behavior under test.
pub struct InMemoryScores;

#[async_trait]
impl ContentScoreStore for InMemoryScores {
    async fn get_or_compute(&self, item: &ContentItem) -> Result<ContentScoreRecord> {
        Ok(compute_score_record(item, Utc::now()))
    }
}

pub struct TestHarness {
    pub content: Arc<InMemoryContentRepo>,
    pub graph: Arc<InMemorySocialGraph>,
    pub interactions: Arc<InMemoryInteractions>,
    pub preferences: Arc<InMemoryPreferences>,
    pub engine: FeedRankingEngine,
}

pub fn harness() -> TestHarness {
    let content = Arc::new(InMemoryContentRepo::new());
    let graph = Arc::new(InMemorySocialGraph::new());
    let interactions = Arc::new(InMemoryInteractions::new());
    let preferences = Arc::new(InMemoryPreferences::new());

    let engine = FeedRankingEngine::new(
        content.clone(),
        graph.clone(),
        interactions.clone(),
        preferences.clone(),
        Arc::new(InMemoryScores),
        &RetrievalConfig::default(),
        &RankingConfig::default(),
    );

    TestHarness {
        content,
        graph,
        interactions,
        preferences,
        engine,
    }
}

pub fn make_item(author_id: Uuid, age_hours: i64, topics: &[&str], likes: i64) -> ContentItem {
    ContentItem {
        id: Uuid::new_v4(),
        author_id,
        author_username: "author".to_string(),
        post_type: PostType::Text,
        topics: topics.iter().map(|t| t.to_string()).collect(),
        visibility: ContentVisibility::Public,
        created_at: Utc::now() - Duration::hours(age_hours),
        latitude: None,
        longitude: None,
        city: None,
        counters: EngagementCounters {
            views: likes * 10,
            likes,
            ..Default::default()
        },
    }
}
