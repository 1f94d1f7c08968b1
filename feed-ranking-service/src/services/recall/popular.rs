use super::CandidateSource;
use crate::db::ContentRepository;
use crate::error::Result;
use crate::models::{ContentItem, RankingContext};
use async_trait::async_trait;
use std::sync::Arc;

/// Public items ranked by raw engagement counters.
pub struct PopularSource {
    content: Arc<dyn ContentRepository>,
}

impl PopularSource {
    pub fn new(content: Arc<dyn ContentRepository>) -> Self {
        Self { content }
    }
}

#[async_trait]
impl CandidateSource for PopularSource {
    async fn fetch(&self, _context: &RankingContext, limit: i64) -> Result<Vec<ContentItem>> {
        self.content.find_popular(limit).await
    }

    fn name(&self) -> &'static str {
        "popular"
    }
}
