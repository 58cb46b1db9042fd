use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Phrases the summarizer emits when it could not produce a real summary.
const DEFAULT_SUMMARY_SENTINELS: &[&str] = &["요약 부족으로 재생성 불가", "모델 무응답"];

/// Application configuration loaded from environment variables.
/// Fails at startup if a required variable is missing or a tunable does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub ai: AiConfig,
    pub enrichment: EnrichmentConfig,
    pub batch: BatchConfig,
    pub matching: MatchConfig,
    pub recommend: RecommendConfig,
}

/// Transport settings for the AI server (summarizer, embedder, judge).
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub workers: usize,
    pub queue_depth: usize,
    /// A summary must be strictly longer than this many characters.
    pub min_summary_chars: usize,
    pub summary_sentinels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub item_delay: Duration,
    pub pause_every: usize,
    pub pause: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub top_k: usize,
    pub rerank_delay: Duration,
    pub max_judge_input_chars: usize,
}

#[derive(Debug, Clone)]
pub struct RecommendConfig {
    pub limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let ai = AiConfig::default();
        let enrichment = EnrichmentConfig::default();
        let batch = BatchConfig::default();
        let matching = MatchConfig::default();
        let recommend = RecommendConfig::default();

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            ai: AiConfig {
                base_url: std::env::var("AI_SERVER_URL").unwrap_or(ai.base_url),
                connect_timeout: env_secs("AI_CONNECT_TIMEOUT_SECS", ai.connect_timeout)?,
                request_timeout: env_secs("AI_REQUEST_TIMEOUT_SECS", ai.request_timeout)?,
            },
            enrichment: EnrichmentConfig {
                workers: env_or("ENRICH_WORKERS", enrichment.workers)?,
                queue_depth: env_or("ENRICH_QUEUE_DEPTH", enrichment.queue_depth)?,
                min_summary_chars: env_or("SUMMARY_MIN_CHARS", enrichment.min_summary_chars)?,
                summary_sentinels: std::env::var("SUMMARY_SENTINELS")
                    .map(|raw| parse_list(&raw))
                    .unwrap_or(enrichment.summary_sentinels),
            },
            batch: BatchConfig {
                item_delay: env_millis("BATCH_ITEM_DELAY_MS", batch.item_delay)?,
                pause_every: env_or("BATCH_PAUSE_EVERY", batch.pause_every)?,
                pause: env_millis("BATCH_PAUSE_MS", batch.pause)?,
                max_attempts: env_or("BATCH_MAX_ATTEMPTS", batch.max_attempts)?,
                backoff_base: env_millis("BATCH_BACKOFF_BASE_MS", batch.backoff_base)?,
            },
            matching: MatchConfig {
                top_k: env_or("MATCH_TOP_K", matching.top_k)?,
                rerank_delay: env_millis("RERANK_DELAY_MS", matching.rerank_delay)?,
                max_judge_input_chars: env_or("RERANK_MAX_CHARS", matching.max_judge_input_chars)?,
            },
            recommend: RecommendConfig {
                limit: env_or("RECOMMEND_LIMIT", recommend.limit)?,
            },
        })
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            queue_depth: 100,
            min_summary_chars: 30,
            summary_sentinels: default_sentinels(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_millis(1500),
            pause_every: 10,
            pause: Duration::from_millis(5000),
            max_attempts: 2,
            backoff_base: Duration::from_millis(2000),
        }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            rerank_delay: Duration::from_millis(300),
            max_judge_input_chars: 1000,
        }
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self { limit: 15 }
    }
}

fn default_sentinels() -> Vec<String> {
    DEFAULT_SUMMARY_SENTINELS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn env_secs(key: &str, default: Duration) -> Result<Duration> {
    env_or(key, default.as_secs()).map(Duration::from_secs)
}

fn env_millis(key: &str, default: Duration) -> Result<Duration> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    env_or(key, default_ms).map(Duration::from_millis)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'"))
}

/// Splits a comma-separated list, dropping blank items.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
