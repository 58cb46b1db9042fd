//! AI client, the single point of entry for calls to the AI server.
//!
//! The matching core only sees the three collaborator traits below. `AiClient`
//! implements all of them over HTTP/JSON; tests substitute stubs.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::AiConfig;

#[cfg(test)]
pub mod stub;

const SUMMARIZE_PATH: &str = "/ai/summarize";
const EMBED_PATH: &str = "/ai/embed";
const MATCH_ONE_PATH: &str = "/ai/match-one";

/// Reason used when the judge returns a score without an explanation.
const DEFAULT_REASON: &str = "analysis complete";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("AI server returned empty content")]
    EmptyContent,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Judge output: a 0 to 100 fit score and a one-line reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub score: f64,
    pub reason: String,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, AiError>;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError>;
}

#[async_trait]
pub trait PairwiseJudge: Send + Sync {
    async fn judge(&self, resume: &str, posting: &str) -> Result<JudgeVerdict, AiError>;
}

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct MatchOneRequest<'a> {
    resume: &'a str,
    job: &'a str,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    vector: Option<Vec<f32>>,
}

/// HTTP client for the AI server. Cheap to clone; connections are pooled by reqwest.
#[derive(Clone)]
pub struct AiClient {
    client: Client,
    base_url: String,
}

impl AiClient {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Posts a JSON body and returns the decoded JSON response.
    /// Non-2xx statuses become `AiError::Api`. No retries here: callers own their retry policy.
    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, AiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = response.json().await?;
        debug!("AI call {} succeeded", path);
        Ok(value)
    }
}

#[async_trait]
impl Summarizer for AiClient {
    async fn summarize(&self, text: &str) -> Result<String, AiError> {
        let value = self.post_json(SUMMARIZE_PATH, &TextRequest { text }).await?;
        let parsed: SummaryResponse = serde_json::from_value(value)?;
        parsed.summary.ok_or(AiError::EmptyContent)
    }
}

#[async_trait]
impl Embedder for AiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let value = self.post_json(EMBED_PATH, &TextRequest { text }).await?;
        let parsed: EmbedResponse = serde_json::from_value(value)?;
        match parsed.vector {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(AiError::EmptyContent),
        }
    }
}

#[async_trait]
impl PairwiseJudge for AiClient {
    async fn judge(&self, resume: &str, posting: &str) -> Result<JudgeVerdict, AiError> {
        let value = self
            .post_json(MATCH_ONE_PATH, &MatchOneRequest { resume, job: posting })
            .await?;
        parse_verdict(&value)
    }
}

/// Reads `{score, reason}` from a judge payload.
///
/// `score` may be a JSON number or a numeric string; it is clamped to 0..=100.
/// A missing `reason` gets a default text. A missing or non-numeric score is invalid.
pub fn parse_verdict(value: &Value) -> Result<JudgeVerdict, AiError> {
    let score = match value.get("score") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|s| s.is_finite())
    .ok_or_else(|| AiError::InvalidResponse(format!("missing or non-numeric score in {value}")))?;

    let reason = match value.get("reason") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Null) | None => DEFAULT_REASON.to_string(),
        Some(Value::String(_)) => DEFAULT_REASON.to_string(),
        Some(other) => other.to_string(),
    };

    Ok(JudgeVerdict {
        score: score.clamp(0.0, 100.0),
        reason,
    })
}
