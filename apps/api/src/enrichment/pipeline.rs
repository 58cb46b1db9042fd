//! Enrichment pipeline: derives `(summary, embedding)` for one posting.
//!
//! Flow: compose full text → summarize → validate → embed (summary, else full text)
//!       → hand back whichever values are valid.
//!
//! Nothing in here returns an error. Every external failure is logged and
//! degrades to "value not produced".

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ai_client::{Embedder, Summarizer};
use crate::config::{BatchConfig, EnrichmentConfig};
use crate::enrichment::text::{compose_full_text, summary_is_settled, validate_summary};
use crate::matching::vector::{decode_embedding, encode_embedding};
use crate::models::posting::JobPosting;
use crate::store::{EmbeddingWrite, JobStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichMode {
    /// Skip work that a previous run already completed.
    IfMissing,
    /// Recompute both values, e.g. after the posting text changed.
    Force,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum EnrichmentOutcome {
    /// Every text field is empty; no external call was made.
    NoContent,
    /// Summary passes the length guard and an embedding exists.
    AlreadyEnriched,
    Processed { summary: bool, embedding: bool },
}

impl EnrichmentOutcome {
    /// True when at least one value was produced.
    pub fn produced_anything(&self) -> bool {
        matches!(self, EnrichmentOutcome::Processed { summary, embedding } if *summary || *embedding)
    }

    pub fn issued_calls(&self) -> bool {
        matches!(self, EnrichmentOutcome::Processed { .. })
    }
}

/// Bounded retry with exponential backoff: `backoff_base`, `2 * backoff_base`, ...
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// Single attempt. Used on the background path, which never waits on retries.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            backoff_base: Duration::ZERO,
        }
    }

    pub fn from_batch(config: &BatchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base,
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Runs `op` until it succeeds or attempts run out. Failures are logged, never returned.
    pub async fn run<T, F, Fut>(&self, label: &str, posting_id: i64, mut op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, String>>,
    {
        let attempts = self.max_attempts.max(1);
        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Some(value),
                Err(reason) => {
                    warn!(
                        posting_id,
                        attempt, attempts, "{label} failed: {reason}"
                    );
                    if attempt < attempts {
                        let delay = self.backoff_for(attempt);
                        debug!("Retrying {label} for posting {posting_id} in {}ms", delay.as_millis());
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        None
    }
}

/// Result of one enrichment run: the updated posting plus the values to persist.
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub posting: JobPosting,
    pub outcome: EnrichmentOutcome,
    new_summary: Option<String>,
    new_embedding: Option<String>,
    /// Set when a new summary replaced the text the stored vector was built from.
    clear_embedding: bool,
}

impl Enrichment {
    fn unchanged(posting: JobPosting, outcome: EnrichmentOutcome) -> Self {
        Self {
            posting,
            outcome,
            new_summary: None,
            new_embedding: None,
            clear_embedding: false,
        }
    }

    /// Writes the produced values. Returns `Ok(false)` when there was nothing to write.
    pub async fn persist(&self, store: &dyn JobStore) -> anyhow::Result<bool> {
        if self.new_summary.is_none() && self.new_embedding.is_none() {
            return Ok(false);
        }
        let embedding = match (&self.new_embedding, self.clear_embedding) {
            (Some(e), _) => EmbeddingWrite::Set(e),
            (None, true) => EmbeddingWrite::Clear,
            (None, false) => EmbeddingWrite::Keep,
        };
        store
            .save_enrichment(self.posting.id, self.new_summary.as_deref(), embedding)
            .await?;
        Ok(true)
    }
}

/// Owns the summarizer/embedder pair and the validation rules.
#[derive(Clone)]
pub struct Enricher {
    summarizer: Arc<dyn Summarizer>,
    embedder: Arc<dyn Embedder>,
    config: EnrichmentConfig,
}

impl Enricher {
    pub fn new(
        summarizer: Arc<dyn Summarizer>,
        embedder: Arc<dyn Embedder>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            summarizer,
            embedder,
            config,
        }
    }

    /// Enriches one posting. Primary fields are never modified; only `summary`
    /// and `embedding` may change, and only to valid values.
    pub async fn enrich(&self, posting: JobPosting, mode: EnrichMode, retry: &RetryPolicy) -> Enrichment {
        let settled_summary = summary_is_settled(posting.summary.as_deref(), &self.config)
            .then(|| posting.summary.clone())
            .flatten();
        let has_embedding = posting
            .embedding
            .as_deref()
            .and_then(decode_embedding)
            .is_some();

        if mode == EnrichMode::IfMissing {
            if let Some(summary) = settled_summary {
                if has_embedding {
                    debug!("Posting {} already enriched; skipping", posting.id);
                    return Enrichment::unchanged(posting, EnrichmentOutcome::AlreadyEnriched);
                }
                // Summary is good; only the embedding is missing.
                let embedding = self.request_embedding(posting.id, &summary, retry).await;
                return self.finish(posting, None, embedding);
            }
        }

        let full_text = compose_full_text(&posting);
        if full_text.is_empty() {
            warn!("Posting {} has no text; enrichment skipped", posting.id);
            return Enrichment::unchanged(posting, EnrichmentOutcome::NoContent);
        }
        debug!("Posting {} full text: {} chars", posting.id, full_text.chars().count());

        let summary = self.request_summary(posting.id, &full_text, retry).await;
        let embed_input = summary.as_deref().unwrap_or(&full_text);
        let embedding = self.request_embedding(posting.id, embed_input, retry).await;

        self.finish(posting, summary, embedding)
    }

    fn finish(
        &self,
        mut posting: JobPosting,
        summary: Option<String>,
        embedding: Option<Vec<f32>>,
    ) -> Enrichment {
        let outcome = EnrichmentOutcome::Processed {
            summary: summary.is_some(),
            embedding: embedding.is_some(),
        };
        let new_embedding = embedding.map(|v| encode_embedding(&v));
        // An old vector next to a new summary would look enriched forever;
        // dropping it lets the next batch pass re-embed.
        let clear_embedding =
            summary.is_some() && new_embedding.is_none() && posting.embedding.is_some();

        if let Some(s) = &summary {
            posting.summary = Some(s.clone());
        }
        if let Some(e) = &new_embedding {
            posting.embedding = Some(e.clone());
        }
        if clear_embedding {
            warn!("Posting {}: summary replaced but embedding failed; clearing stale embedding", posting.id);
            posting.embedding = None;
        }

        info!("Enrichment finished for posting {}: {:?}", posting.id, outcome);
        Enrichment {
            posting,
            outcome,
            new_summary: summary,
            new_embedding,
            clear_embedding,
        }
    }

    async fn request_summary(&self, posting_id: i64, text: &str, retry: &RetryPolicy) -> Option<String> {
        let summarizer = self.summarizer.as_ref();
        let config = &self.config;
        retry
            .run("summarize", posting_id, || async move {
                let raw = summarizer.summarize(text).await.map_err(|e| e.to_string())?;
                validate_summary(&raw, config).map_err(|r| format!("summary rejected: {r:?}"))
            })
            .await
    }

    async fn request_embedding(&self, posting_id: i64, text: &str, retry: &RetryPolicy) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref();
        retry
            .run("embed", posting_id, || async move {
                let vector = embedder.embed(text).await.map_err(|e| e.to_string())?;
                if vector.is_empty() {
                    return Err("embedder returned an empty vector".to_string());
                }
                Ok(vector)
            })
            .await
    }
}
