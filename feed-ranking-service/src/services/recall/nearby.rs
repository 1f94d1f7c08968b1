use super::CandidateSource;
use crate::db::ContentRepository;
use crate::error::Result;
use crate::models::{ContentItem, RankingContext};
use async_trait::async_trait;
use std::sync::Arc;

/// Public items near the resolved request location. Contributes nothing when
/// no location is available.
pub struct NearbySource {
    content: Arc<dyn ContentRepository>,
    radius_km: f64,
}

impl NearbySource {
    pub fn new(content: Arc<dyn ContentRepository>, radius_km: f64) -> Self {
        Self { content, radius_km }
    }
}

#[async_trait]
impl CandidateSource for NearbySource {
    async fn fetch(&self, context: &RankingContext, limit: i64) -> Result<Vec<ContentItem>> {
        let Some(location) = &context.location else {
            return Ok(Vec::new());
        };

        self.content
            .find_near(location.latitude, location.longitude, self.radius_km, limit)
            .await
    }

    fn name(&self) -> &'static str {
        "nearby"
    }
}
