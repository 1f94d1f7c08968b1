use actix_web::{post, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{InteractionMetadata, InteractionType, TargetType};
use crate::services::FeedRankingEngine;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInteractionRequest {
    pub user_id: Uuid,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub interaction_type: InteractionType,
    #[serde(default)]
    pub metadata: InteractionMetadata,
}

/// Always acknowledges; recording failures are logged inside the learner
/// and never surfaced.
#[post("/interactions")]
pub async fn track_interaction(
    body: web::Json<TrackInteractionRequest>,
    engine: web::Data<FeedRankingEngine>,
) -> Result<HttpResponse> {
    let request = body.into_inner();

    engine
        .track_interaction(
            request.user_id,
            request.target_type,
            request.target_id,
            request.interaction_type,
            request.metadata,
        )
        .await;

    Ok(HttpResponse::Accepted().json(serde_json::json!({ "status": "recorded" })))
}
