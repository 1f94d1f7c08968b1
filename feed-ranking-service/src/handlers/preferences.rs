use actix_web::{get, put, web, HttpResponse};
use uuid::Uuid;

use crate::error::Result;
use crate::services::{FeedRankingEngine, WeightUpdate};

#[get("/preferences/{user_id}")]
pub async fn get_preferences(
    path: web::Path<Uuid>,
    engine: web::Data<FeedRankingEngine>,
) -> Result<HttpResponse> {
    let record = engine.get_preferences(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[put("/preferences/{user_id}")]
pub async fn update_preferences(
    path: web::Path<Uuid>,
    body: web::Json<WeightUpdate>,
    engine: web::Data<FeedRankingEngine>,
) -> Result<HttpResponse> {
    let record = engine
        .update_preferences(path.into_inner(), &body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(record))
}
