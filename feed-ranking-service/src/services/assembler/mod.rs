use crate::db::{ContentRepository, SocialGraphRepository};
use crate::error::{AppError, Result};
use crate::models::{
    FeedMetadata, FeedResponse, GeoPoint, ScoreBreakdown, ScoredCandidate,
};
use crate::services::context::ContextBuilder;
use crate::services::diversity::DiversityReranker;
use crate::services::learning::PreferenceLearner;
use crate::services::recall::CandidateRetriever;
use crate::services::scoring::RelevanceScorer;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub const MAX_PAGE_LIMIT: usize = 100;
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Pipeline states for one ranking request. `Fallback` is terminal and
/// reachable from any non-terminal state; no state is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    BuildingContext,
    RetrievingCandidates,
    Scoring,
    Diversifying,
    Paginating,
    Done,
    Fallback,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuildingContext => "building_context",
            Self::RetrievingCandidates => "retrieving_candidates",
            Self::Scoring => "scoring",
            Self::Diversifying => "diversifying",
            Self::Paginating => "paginating",
            Self::Done => "done",
            Self::Fallback => "fallback",
        }
    }
}

/// Caller-supplied knobs for one feed request.
#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub limit: usize,
    pub page: usize,
    /// Accepted for API compatibility; ad interleaving happens outside this
    /// subsystem.
    pub include_ads: bool,
    pub diversity_factor: f64,
    pub location: Option<GeoPoint>,
}

impl FeedRequest {
    fn limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_LIMIT)
    }

    fn page(&self) -> usize {
        self.page.max(1)
    }
}

/// Orchestrates context -> retrieval -> scoring -> diversity -> pagination,
/// substituting a chronological fallback feed on any stage failure. The
/// caller never sees a pipeline error; only an unresolvable user identity is
/// surfaced.
pub struct FeedAssembler {
    context_builder: ContextBuilder,
    retriever: CandidateRetriever,
    scorer: RelevanceScorer,
    diversity: DiversityReranker,
    learner: Arc<PreferenceLearner>,
    content: Arc<dyn ContentRepository>,
    graph: Arc<dyn SocialGraphRepository>,
}

impl FeedAssembler {
    pub fn new(
        context_builder: ContextBuilder,
        retriever: CandidateRetriever,
        scorer: RelevanceScorer,
        diversity: DiversityReranker,
        learner: Arc<PreferenceLearner>,
        content: Arc<dyn ContentRepository>,
        graph: Arc<dyn SocialGraphRepository>,
    ) -> Self {
        Self {
            context_builder,
            retriever,
            scorer,
            diversity,
            learner,
            content,
            graph,
        }
    }

    pub async fn get_feed(&self, user_id: Uuid, request: &FeedRequest) -> Result<FeedResponse> {
        match self.run_primary(user_id, request).await {
            Ok(response) => Ok(response),
            // An unknown user is the one error the caller sees.
            Err((PipelineStage::BuildingContext, AppError::NotFound(msg))) => {
                Err(AppError::NotFound(msg))
            }
            Err((stage, e)) => {
                warn!(
                    user_id = %user_id,
                    stage = stage.as_str(),
                    "Pipeline failed, serving fallback feed: {}",
                    e
                );
                crate::metrics::record_fallback();
                self.fallback_feed(user_id, request).await
            }
        }
    }

    async fn run_primary(
        &self,
        user_id: Uuid,
        request: &FeedRequest,
    ) -> std::result::Result<FeedResponse, (PipelineStage, AppError)> {
        self.enter(user_id, PipelineStage::BuildingContext);
        let context = self
            .context_builder
            .build(user_id, request.location.clone())
            .await
            .map_err(|e| (PipelineStage::BuildingContext, e))?;

        self.enter(user_id, PipelineStage::RetrievingCandidates);
        let outcome = self
            .retriever
            .retrieve(&context)
            .await
            .map_err(|e| (PipelineStage::RetrievingCandidates, e))?;

        self.enter(user_id, PipelineStage::Scoring);
        let scored = self.scorer.score_candidates(&context, outcome.candidates).await;

        self.enter(user_id, PipelineStage::Diversifying);
        let factor = request.diversity_factor.clamp(0.0, 1.0);
        let ranked = self.diversity.rerank(scored, factor);

        self.enter(user_id, PipelineStage::Paginating);
        let total_candidates = ranked.len();
        let limit = request.limit();
        let page = request.page();
        let items: Vec<ScoredCandidate> = ranked
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .collect();

        // Shown-feedback runs off the response path; losing it is
        // acceptable, delaying the feed is not.
        let learner = Arc::clone(&self.learner);
        let shown = items.clone();
        tokio::spawn(async move {
            learner.record_shown(user_id, &shown).await;
        });

        self.enter(user_id, PipelineStage::Done);

        Ok(FeedResponse {
            items,
            metadata: FeedMetadata {
                total_candidates,
                diversity_applied: factor > 0.0,
                page,
                limit,
                fallback: None,
            },
        })
    }

    fn enter(&self, user_id: Uuid, stage: PipelineStage) {
        debug!(user_id = %user_id, stage = stage.as_str(), "Pipeline stage");
    }

    /// Reverse-chronological followed-or-public feed, ranked positionally.
    /// Does not re-enter the primary pipeline.
    async fn fallback_feed(&self, user_id: Uuid, request: &FeedRequest) -> Result<FeedResponse> {
        self.enter(user_id, PipelineStage::Fallback);

        let following: Vec<Uuid> = match self.graph.social_profile(user_id).await {
            Ok(profile) => profile.following.into_iter().collect(),
            Err(e) => {
                warn!(user_id = %user_id, "Social profile unavailable for fallback: {}", e);
                Vec::new()
            }
        };

        let limit = request.limit();
        let page = request.page();
        let offset = (page - 1) * limit;

        let items = self
            .content
            .find_recent(&following, limit as i64, offset as i64)
            .await?;

        let candidates: Vec<ScoredCandidate> = items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| ScoredCandidate {
                item,
                score: 1.0 - idx as f64 * 0.01,
                breakdown: ScoreBreakdown::default(),
            })
            .collect();

        debug!(user_id = %user_id, items = candidates.len(), "Fallback feed served");

        Ok(FeedResponse {
            metadata: FeedMetadata {
                total_candidates: candidates.len(),
                diversity_applied: false,
                page,
                limit,
                fallback: Some(true),
            },
            items: candidates,
        })
    }
}
