pub mod assembler;
pub mod content_scores;
pub mod context;
pub mod diversity;
pub mod learning;
pub mod preference_store;
pub mod recall;
pub mod scoring;

pub use assembler::{FeedAssembler, FeedRequest, PipelineStage};
pub use content_scores::{ContentScoreStore, RedisContentScoreStore};
pub use context::ContextBuilder;
pub use diversity::DiversityReranker;
pub use learning::PreferenceLearner;
pub use preference_store::{PreferenceStore, RedisPreferenceStore, WeightUpdate};
pub use recall::{CandidateRetriever, CandidateSource, RetrievalOutcome, RetrievalStats};
pub use scoring::{RelevanceScorer, SocialSignals};

use crate::config::{RankingConfig, RetrievalConfig};
use crate::db::{ContentRepository, InteractionRepository, SocialGraphRepository};
use crate::error::Result;
use crate::models::{
    FeedResponse, InteractionMetadata, InteractionType, PreferenceRecord, TargetType,
};
use std::sync::Arc;
use uuid::Uuid;

/// The ranking engine as one explicit service object. All store
/// dependencies arrive through the constructor; there is no module-level
/// state.
pub struct FeedRankingEngine {
    assembler: FeedAssembler,
    learner: Arc<PreferenceLearner>,
    preferences: Arc<dyn PreferenceStore>,
    default_diversity_factor: f64,
}

impl FeedRankingEngine {
    pub fn new(
        content: Arc<dyn ContentRepository>,
        graph: Arc<dyn SocialGraphRepository>,
        interactions: Arc<dyn InteractionRepository>,
        preferences: Arc<dyn PreferenceStore>,
        scores: Arc<dyn ContentScoreStore>,
        retrieval: &RetrievalConfig,
        ranking: &RankingConfig,
    ) -> Self {
        let context_builder = ContextBuilder::new(
            Arc::clone(&graph),
            Arc::clone(&interactions),
            Arc::clone(&preferences),
            ranking,
        );
        let retriever = CandidateRetriever::new(Arc::clone(&content), retrieval);
        let scorer = RelevanceScorer::new(
            Arc::clone(&graph),
            Arc::clone(&interactions),
            scores,
        );
        let learner = Arc::new(PreferenceLearner::new(
            Arc::clone(&interactions),
            Arc::clone(&content),
            Arc::clone(&preferences),
        ));

        let assembler = FeedAssembler::new(
            context_builder,
            retriever,
            scorer,
            DiversityReranker::new(),
            Arc::clone(&learner),
            content,
            graph,
        );

        Self {
            assembler,
            learner,
            preferences,
            default_diversity_factor: ranking.default_diversity_factor,
        }
    }

    pub fn default_diversity_factor(&self) -> f64 {
        self.default_diversity_factor
    }

    /// Primary entry point: always yields a ranked feed (primary or
    /// fallback) unless the user id itself cannot be resolved.
    pub async fn get_feed(&self, user_id: Uuid, request: &FeedRequest) -> Result<FeedResponse> {
        crate::metrics::record_feed_request();
        let timer = crate::metrics::feed_timer();
        let result = self.assembler.get_feed(user_id, request).await;
        timer.observe_duration();
        result
    }

    /// Interaction tracking entry point; always succeeds from the caller's
    /// perspective.
    pub async fn track_interaction(
        &self,
        user_id: Uuid,
        target_type: TargetType,
        target_id: Uuid,
        interaction_type: InteractionType,
        metadata: InteractionMetadata,
    ) {
        self.learner
            .record_interaction(user_id, target_type, target_id, interaction_type, metadata)
            .await;
    }

    pub async fn get_preferences(&self, user_id: Uuid) -> Result<PreferenceRecord> {
        self.preferences.get_or_create(user_id).await
    }

    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        update: &WeightUpdate,
    ) -> Result<PreferenceRecord> {
        self.preferences.update_weights(user_id, update).await
    }
}
