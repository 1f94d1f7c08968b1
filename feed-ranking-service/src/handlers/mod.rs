mod feed;
mod interactions;
mod preferences;

pub use feed::get_feed;
pub use interactions::track_interaction;
pub use preferences::{get_preferences, update_preferences};

use actix_web::{get, HttpResponse};

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[get("/metrics")]
pub async fn metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(crate::metrics::gather())
}
