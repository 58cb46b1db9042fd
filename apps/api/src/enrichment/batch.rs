//! Batch maintenance: enrich every posting that still lacks a summary or embedding.
//!
//! Re-entrant by construction: postings that are already enriched are skipped
//! without any external call, so a run can be repeated after an interruption.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::BatchConfig;
use crate::enrichment::pipeline::{EnrichMode, Enricher, EnrichmentOutcome, RetryPolicy};
use crate::store::JobStore;

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Runs one batch pass. Only the initial listing can fail the whole run;
/// per-posting failures are counted and the pass continues.
pub async fn run_batch(
    store: &dyn JobStore,
    enricher: &Enricher,
    config: &BatchConfig,
) -> anyhow::Result<BatchReport> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let postings = store.list_postings().await?;
    let total = postings.len();
    let retry = RetryPolicy::from_batch(config);

    info!("Batch {run_id}: enriching up to {total} postings");

    let (mut succeeded, mut skipped, mut failed) = (0usize, 0usize, 0usize);

    for (index, posting) in postings.into_iter().enumerate() {
        if config.pause_every > 0 && index > 0 && index % config.pause_every == 0 {
            info!(
                "Batch {run_id}: {index}/{total} done, pausing {}ms",
                config.pause.as_millis()
            );
            tokio::time::sleep(config.pause).await;
        }

        let posting_id = posting.id;
        let result = enricher.enrich(posting, EnrichMode::IfMissing, &retry).await;

        match result.outcome {
            EnrichmentOutcome::NoContent | EnrichmentOutcome::AlreadyEnriched => {
                skipped += 1;
                continue;
            }
            outcome if outcome.produced_anything() => match result.persist(store).await {
                Ok(_) => succeeded += 1,
                Err(e) => {
                    error!("Batch {run_id}: saving posting {posting_id} failed: {e:#}");
                    failed += 1;
                }
            },
            _ => {
                warn!("Batch {run_id}: posting {posting_id} produced no summary or embedding");
                failed += 1;
            }
        }

        // Throttle only after items that actually hit the AI server.
        if result.outcome.issued_calls() {
            tokio::time::sleep(config.item_delay).await;
        }
    }

    let report = BatchReport {
        run_id,
        total,
        succeeded,
        skipped,
        failed,
        started_at,
        finished_at: Utc::now(),
    };
    info!(
        "Batch {run_id} finished: succeeded={}, skipped={}, failed={}, total={}",
        report.succeeded, report.skipped, report.failed, report.total
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::ai_client::stub::{StubEmbedder, StubSummarizer};
    use crate::config::EnrichmentConfig;
    use crate::models::posting::JobPosting;
    use crate::store::memory::InMemoryStore;

    const SUMMARY: &str = "Backend role building payment APIs in Java and Spring.";

    fn posting(id: i64) -> JobPosting {
        JobPosting {
            id,
            company_id: 1,
            title: Some(format!("Engineer #{id}")),
            content: Some("Operate services.".to_string()),
            ..Default::default()
        }
    }

    fn fast_config() -> BatchConfig {
        BatchConfig {
            item_delay: Duration::from_millis(1500),
            pause_every: 10,
            pause: Duration::from_millis(5000),
            max_attempts: 2,
            backoff_base: Duration::from_millis(2000),
        }
    }

    fn enricher(summarizer: Arc<StubSummarizer>, embedder: Arc<StubEmbedder>) -> Enricher {
        Enricher::new(summarizer, embedder, EnrichmentConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_counts_success_skip_and_failure() {
        let enriched = JobPosting {
            summary: Some(SUMMARY.to_string()),
            embedding: Some("[1.0]".to_string()),
            ..posting(2)
        };
        let empty = JobPosting {
            id: 3,
            company_id: 1,
            ..Default::default()
        };
        let store = InMemoryStore::with_postings(vec![posting(1), enriched, empty]);
        let summarizer = Arc::new(StubSummarizer::fixed(SUMMARY));
        let embedder = Arc::new(StubEmbedder::fixed(vec![0.5]));

        let report = run_batch(&store, &enricher(summarizer.clone(), embedder), &fast_config())
            .await
            .unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(summarizer.calls(), 1);
        assert_eq!(store.posting(1).unwrap().summary.as_deref(), Some(SUMMARY));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_survives_outage_and_retries_each_call() {
        let store = InMemoryStore::with_postings(vec![posting(1), posting(2)]);
        let summarizer = Arc::new(StubSummarizer::failing());
        let embedder = Arc::new(StubEmbedder::failing());

        let report = run_batch(&store, &enricher(summarizer.clone(), embedder.clone()), &fast_config())
            .await
            .unwrap();

        assert_eq!(report.failed, 2);
        assert_eq!(report.succeeded, 0);
        // Two attempts per call, two calls per posting.
        assert_eq!(summarizer.calls(), 4);
        assert_eq!(embedder.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_save_failure_does_not_abort() {
        let store = InMemoryStore::with_postings(vec![posting(1), posting(2)]);
        store.fail_writes.store(true, Ordering::SeqCst);
        let summarizer = Arc::new(StubSummarizer::fixed(SUMMARY));

        let report = run_batch(
            &store,
            &enricher(summarizer.clone(), Arc::new(StubEmbedder::fixed(vec![1.0]))),
            &fast_config(),
        )
        .await
        .unwrap();

        assert_eq!(report.failed, 2);
        assert_eq!(summarizer.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_is_idempotent_on_rerun() {
        let store = InMemoryStore::with_postings((1..=3).map(posting).collect());
        let summarizer = Arc::new(StubSummarizer::fixed(SUMMARY));
        let embedder = Arc::new(StubEmbedder::fixed(vec![0.5, 0.5]));
        let enricher = enricher(summarizer.clone(), embedder.clone());

        let first = run_batch(&store, &enricher, &fast_config()).await.unwrap();
        assert_eq!(first.succeeded, 3);

        let second = run_batch(&store, &enricher, &fast_config()).await.unwrap();
        assert_eq!(second.skipped, 3);
        assert_eq!(summarizer.calls(), 3);
        assert_eq!(embedder.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_reembeds_after_forced_summary_lost_its_vector() {
        let stale = JobPosting {
            summary: Some("Old summary describing a payments backend role.".to_string()),
            embedding: Some("[1.0, 0.0]".to_string()),
            ..posting(1)
        };
        let store = InMemoryStore::with_postings(vec![stale.clone()]);
        let new_summary = "Data engineering role owning batch pipelines and the warehouse.";

        let forced = enricher(
            Arc::new(StubSummarizer::fixed(new_summary)),
            Arc::new(StubEmbedder::failing()),
        )
        .enrich(stale, EnrichMode::Force, &RetryPolicy::once())
        .await;
        forced.persist(&store).await.unwrap();

        let embedder = Arc::new(StubEmbedder::fixed(vec![0.0, 1.0]));
        let report = run_batch(
            &store,
            &enricher(Arc::new(StubSummarizer::fixed(SUMMARY)), embedder.clone()),
            &fast_config(),
        )
        .await
        .unwrap();

        assert_eq!(report.skipped, 0);
        assert_eq!(report.succeeded, 1);
        assert_eq!(embedder.inputs.lock().unwrap()[0], new_summary);
        let saved = store.posting(1).unwrap();
        assert_eq!(saved.summary.as_deref(), Some(new_summary));
        assert_eq!(saved.embedding.as_deref(), Some("[0.0,1.0]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_throttles_between_items_and_pauses_periodically() {
        let store = InMemoryStore::with_postings((1..=11).map(posting).collect());
        let started = tokio::time::Instant::now();

        run_batch(
            &store,
            &enricher(
                Arc::new(StubSummarizer::fixed(SUMMARY)),
                Arc::new(StubEmbedder::fixed(vec![1.0])),
            ),
            &fast_config(),
        )
        .await
        .unwrap();

        // 11 item delays plus one pause before the 11th item.
        let expected = Duration::from_millis(11 * 1500 + 5000);
        assert!(started.elapsed() >= expected);
    }
}
