use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::GeoPoint;
use crate::services::assembler::DEFAULT_PAGE_LIMIT;
use crate::services::{FeedRankingEngine, FeedRequest};

#[derive(Debug, Deserialize)]
pub struct FeedQueryParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default)]
    pub include_ads: bool,
    pub diversity_factor: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub city: Option<String>,
}

fn default_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

fn default_page() -> usize {
    1
}

#[get("/feed/{user_id}")]
pub async fn get_feed(
    path: web::Path<Uuid>,
    query: web::Query<FeedQueryParams>,
    engine: web::Data<FeedRankingEngine>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();

    let diversity_factor = query
        .diversity_factor
        .unwrap_or_else(|| engine.default_diversity_factor());
    if !(0.0..=1.0).contains(&diversity_factor) {
        return Err(AppError::BadRequest(
            "diversity_factor must be within [0, 1]".to_string(),
        ));
    }

    let location = match (query.lat, query.lon) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint {
            latitude,
            longitude,
            city: query.city.clone(),
            country: None,
        }),
        _ => None,
    };

    let request = FeedRequest {
        limit: query.limit,
        page: query.page,
        include_ads: query.include_ads,
        diversity_factor,
        location,
    };

    debug!(
        user_id = %user_id,
        limit = request.limit,
        page = request.page,
        diversity_factor = request.diversity_factor,
        "Feed request"
    );

    let response = engine.get_feed(user_id, &request).await?;
    Ok(HttpResponse::Ok().json(response))
}
