use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feed_ranking::config::Config;
use feed_ranking::db::{PgContentRepository, PgInteractionRepository, PgSocialGraphRepository};
use feed_ranking::handlers::{
    get_feed, get_preferences, health, metrics, track_interaction, update_preferences,
};
use feed_ranking::services::{
    FeedRankingEngine, RedisContentScoreStore, RedisPreferenceStore,
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting {} v{}",
        config.service.service_name,
        env!("CARGO_PKG_VERSION")
    );

    let pool = match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database connection failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("Database migration failed: {}", e);
        std::process::exit(1);
    }

    let redis_client = match redis::Client::open(config.redis.url.clone()) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Redis client initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    let content = Arc::new(PgContentRepository::new(pool.clone()));
    let graph = Arc::new(PgSocialGraphRepository::new(pool.clone()));
    let interactions = Arc::new(PgInteractionRepository::new(pool));
    let preferences = Arc::new(RedisPreferenceStore::new(redis_client.clone()));
    let scores = Arc::new(RedisContentScoreStore::new(
        redis_client,
        config.ranking.content_score_ttl_days,
    ));

    let engine = web::Data::new(FeedRankingEngine::new(
        content,
        graph,
        interactions,
        preferences,
        scores,
        &config.retrieval,
        &config.ranking,
    ));

    let port = config.service.http_port;
    info!("Listening on 0.0.0.0:{}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(engine.clone())
            .service(get_feed)
            .service(track_interaction)
            .service(get_preferences)
            .service(update_preferences)
            .service(health)
            .service(metrics)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
