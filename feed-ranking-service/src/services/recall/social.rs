use super::CandidateSource;
use crate::db::ContentRepository;
use crate::error::Result;
use crate::models::{ContentItem, RankingContext};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

const SOCIAL_WINDOW_DAYS: i64 = 7;

/// Items authored by followed users within the trailing week.
pub struct SocialSource {
    content: Arc<dyn ContentRepository>,
}

impl SocialSource {
    pub fn new(content: Arc<dyn ContentRepository>) -> Self {
        Self { content }
    }
}

#[async_trait]
impl CandidateSource for SocialSource {
    async fn fetch(&self, context: &RankingContext, limit: i64) -> Result<Vec<ContentItem>> {
        if context.following.is_empty() {
            return Ok(Vec::new());
        }

        let authors: Vec<Uuid> = context.following.iter().copied().collect();
        let since = Utc::now() - Duration::days(SOCIAL_WINDOW_DAYS);
        self.content.find_by_authors(&authors, since, limit).await
    }

    fn name(&self) -> &'static str {
        "social"
    }
}
