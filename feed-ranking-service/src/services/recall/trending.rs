use super::CandidateSource;
use crate::db::ContentRepository;
use crate::error::Result;
use crate::models::{ContentItem, RankingContext};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;

const TRENDING_WINDOW_HOURS: i64 = 24;

/// Public items from the last day ranked by engagement counters.
pub struct TrendingSource {
    content: Arc<dyn ContentRepository>,
}

impl TrendingSource {
    pub fn new(content: Arc<dyn ContentRepository>) -> Self {
        Self { content }
    }
}

#[async_trait]
impl CandidateSource for TrendingSource {
    async fn fetch(&self, _context: &RankingContext, limit: i64) -> Result<Vec<ContentItem>> {
        let since = Utc::now() - Duration::hours(TRENDING_WINDOW_HOURS);
        self.content.find_trending(since, limit).await
    }

    fn name(&self) -> &'static str {
        "trending"
    }
}
