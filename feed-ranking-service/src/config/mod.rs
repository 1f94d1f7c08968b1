use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub retrieval: RetrievalConfig,
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub http_port: u16,
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// Per-source candidate caps and the shared per-source timeout.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    pub social_limit: i64,
    pub popular_limit: i64,
    pub nearby_limit: i64,
    pub topic_limit: i64,
    pub trending_limit: i64,
    pub nearby_radius_km: f64,
    pub source_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    pub default_diversity_factor: f64,
    pub interaction_window_days: i64,
    pub max_recent_interactions: i64,
    pub content_score_ttl_days: i64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            social_limit: 100,
            popular_limit: 50,
            nearby_limit: 30,
            topic_limit: 40,
            trending_limit: 20,
            nearby_radius_km: 50.0,
            source_timeout_ms: 400,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            default_diversity_factor: 0.3,
            interaction_window_days: 7,
            max_recent_interactions: 1000,
            content_score_ttl_days: 30,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Ok(Config {
            service: ServiceConfig {
                http_port: env::var("HTTP_PORT")
                    .unwrap_or_else(|_| "8014".to_string())
                    .parse()?,
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "feed-ranking-service".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            retrieval: RetrievalConfig {
                social_limit: env_i64("SOCIAL_SOURCE_LIMIT", 100)?,
                popular_limit: env_i64("POPULAR_SOURCE_LIMIT", 50)?,
                nearby_limit: env_i64("NEARBY_SOURCE_LIMIT", 30)?,
                topic_limit: env_i64("TOPIC_SOURCE_LIMIT", 40)?,
                trending_limit: env_i64("TRENDING_SOURCE_LIMIT", 20)?,
                nearby_radius_km: env::var("NEARBY_RADIUS_KM")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()?,
                source_timeout_ms: env::var("SOURCE_TIMEOUT_MS")
                    .unwrap_or_else(|_| "400".to_string())
                    .parse()?,
            },
            ranking: RankingConfig {
                default_diversity_factor: env::var("DEFAULT_DIVERSITY_FACTOR")
                    .unwrap_or_else(|_| "0.3".to_string())
                    .parse()?,
                interaction_window_days: env_i64("INTERACTION_WINDOW_DAYS", 7)?,
                max_recent_interactions: env_i64("MAX_RECENT_INTERACTIONS", 1000)?,
                content_score_ttl_days: env_i64("CONTENT_SCORE_TTL_DAYS", 30)?,
            },
        })
    }
}

fn env_i64(key: &str, default: i64) -> Result<i64, std::num::ParseIntError> {
    env::var(key).unwrap_or_else(|_| default.to_string()).parse()
}
