use super::CandidateSource;
use crate::db::ContentRepository;
use crate::error::Result;
use crate::models::{ContentItem, RankingContext};
use async_trait::async_trait;
use std::sync::Arc;

const TOP_TOPIC_COUNT: usize = 10;

/// Public items matching the user's strongest positive topic affinities.
pub struct TopicSource {
    content: Arc<dyn ContentRepository>,
}

impl TopicSource {
    pub fn new(content: Arc<dyn ContentRepository>) -> Self {
        Self { content }
    }
}

#[async_trait]
impl CandidateSource for TopicSource {
    async fn fetch(&self, context: &RankingContext, limit: i64) -> Result<Vec<ContentItem>> {
        let topics = context.preferences.top_topics(TOP_TOPIC_COUNT);
        if topics.is_empty() {
            return Ok(Vec::new());
        }

        self.content.find_by_topics(&topics, limit).await
    }

    fn name(&self) -> &'static str {
        "topic"
    }
}
