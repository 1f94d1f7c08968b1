mod nearby;
mod popular;
mod social;
mod topic;
mod trending;

pub use nearby::NearbySource;
pub use popular::PopularSource;
pub use social::SocialSource;
pub use topic::TopicSource;
pub use trending::TrendingSource;

use crate::config::RetrievalConfig;
use crate::db::ContentRepository;
use crate::error::{AppError, Result};
use crate::models::{ContentItem, RankingContext};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// One bounded, independently failable candidate source.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch(&self, context: &RankingContext, limit: i64) -> Result<Vec<ContentItem>>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Default)]
pub struct RetrievalStats {
    pub social_count: usize,
    pub popular_count: usize,
    pub nearby_count: usize,
    pub topic_count: usize,
    pub trending_count: usize,
    pub failed_sources: usize,
    pub dropped_seen: usize,
    pub total_candidates: usize,
}

impl RetrievalStats {
    fn record(&mut self, source: &str, count: usize) {
        match source {
            "social" => self.social_count = count,
            "popular" => self.popular_count = count,
            "nearby" => self.nearby_count = count,
            "topic" => self.topic_count = count,
            "trending" => self.trending_count = count,
            _ => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalOutcome {
    pub candidates: Vec<ContentItem>,
    pub stats: RetrievalStats,
}

/// Fans out to all sources concurrently, merges with first-seen-wins
/// deduplication, and drops anything the user already interacted with.
pub struct CandidateRetriever {
    sources: Vec<(Box<dyn CandidateSource>, i64)>,
    source_timeout: Duration,
}

impl CandidateRetriever {
    pub fn new(content: Arc<dyn ContentRepository>, config: &RetrievalConfig) -> Self {
        let sources: Vec<(Box<dyn CandidateSource>, i64)> = vec![
            (Box::new(SocialSource::new(content.clone())), config.social_limit),
            (Box::new(PopularSource::new(content.clone())), config.popular_limit),
            (
                Box::new(NearbySource::new(content.clone(), config.nearby_radius_km)),
                config.nearby_limit,
            ),
            (Box::new(TopicSource::new(content.clone())), config.topic_limit),
            (Box::new(TrendingSource::new(content)), config.trending_limit),
        ];

        Self {
            sources,
            source_timeout: Duration::from_millis(config.source_timeout_ms),
        }
    }

    #[cfg(test)]
    fn with_sources(sources: Vec<(Box<dyn CandidateSource>, i64)>, timeout: Duration) -> Self {
        Self {
            sources,
            source_timeout: timeout,
        }
    }

    pub async fn retrieve(&self, context: &RankingContext) -> Result<RetrievalOutcome> {
        let fetches = self.sources.iter().map(|(source, limit)| async {
            let result = tokio::time::timeout(self.source_timeout, source.fetch(context, *limit)).await;
            (source.name(), result)
        });

        let mut stats = RetrievalStats::default();
        let mut merged: Vec<ContentItem> = Vec::new();
        let mut seen: HashSet<Uuid> = HashSet::new();

        for (name, result) in join_all(fetches).await {
            let items = match result {
                Ok(Ok(items)) => items,
                Ok(Err(e)) => {
                    warn!(source = name, "Candidate source failed: {}", e);
                    crate::metrics::record_source_failure(name);
                    stats.failed_sources += 1;
                    continue;
                }
                Err(_) => {
                    warn!(source = name, timeout_ms = self.source_timeout.as_millis() as u64, "Candidate source timed out");
                    crate::metrics::record_source_failure(name);
                    stats.failed_sources += 1;
                    continue;
                }
            };

            stats.record(name, items.len());

            for item in items {
                if context.interacted_item_ids.contains(&item.id) {
                    stats.dropped_seen += 1;
                    continue;
                }
                if seen.insert(item.id) {
                    merged.push(item);
                }
            }
        }

        if stats.failed_sources == self.sources.len() {
            return Err(AppError::UpstreamUnavailable(
                "all candidate sources failed".to_string(),
            ));
        }

        stats.total_candidates = merged.len();

        info!(
            user_id = %context.user_id,
            social = stats.social_count,
            popular = stats.popular_count,
            nearby = stats.nearby_count,
            topic = stats.topic_count,
            trending = stats.trending_count,
            failed = stats.failed_sources,
            dropped_seen = stats.dropped_seen,
            total = stats.total_candidates,
            "Candidate retrieval completed"
        );

        Ok(RetrievalOutcome {
            candidates: merged,
            stats,
        })
    }
}
