//! Background enrichment queue.
//!
//! Submissions go into a bounded channel; a dispatcher task drains it and runs
//! at most `workers` jobs concurrently. When the channel is full (or closed for
//! shutdown) a submission is rejected immediately and reported as `Deferred`.
//! Callers never block and never see an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::EnrichmentConfig;
use crate::enrichment::pipeline::{EnrichMode, Enricher, RetryPolicy};
use crate::store::JobStore;

/// What triggered the enrichment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichReason {
    #[default]
    Created,
    /// Content changed; stored summary and embedding are stale.
    Updated,
}

impl EnrichReason {
    fn mode(self) -> EnrichMode {
        match self {
            EnrichReason::Created => EnrichMode::IfMissing,
            EnrichReason::Updated => EnrichMode::Force,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentJob {
    pub posting_id: i64,
    pub reason: EnrichReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    Queued,
    /// Queue saturated or shutting down. A later batch run will pick the posting up.
    Deferred,
}

/// Handle to the running queue. Shared through `AppState`.
pub struct EnrichmentQueue {
    tx: mpsc::Sender<EnrichmentJob>,
    accepting: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl EnrichmentQueue {
    /// Spawns the dispatcher on the current runtime.
    pub fn start(store: Arc<dyn JobStore>, enricher: Enricher, config: &EnrichmentConfig) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let workers = config.workers.max(1);

        let dispatcher = tokio::spawn(dispatch(rx, shutdown_rx, store, Arc::new(enricher), workers));
        info!(
            "Enrichment queue started (workers: {}, depth: {})",
            workers,
            config.queue_depth.max(1)
        );

        Arc::new(Self {
            tx,
            accepting: AtomicBool::new(true),
            shutdown_tx,
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }

    /// Non-blocking submit. Never fails from the caller's point of view.
    pub fn submit(&self, job: EnrichmentJob) -> SubmitOutcome {
        if !self.accepting.load(Ordering::SeqCst) {
            warn!("Enrichment for posting {} deferred: queue is shutting down", job.posting_id);
            return SubmitOutcome::Deferred;
        }

        match self.tx.try_send(job) {
            Ok(()) => {
                debug!("Enrichment for posting {} queued ({:?})", job.posting_id, job.reason);
                SubmitOutcome::Queued
            }
            Err(TrySendError::Full(_)) => {
                warn!("Enrichment for posting {} deferred: queue full", job.posting_id);
                SubmitOutcome::Deferred
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Enrichment for posting {} deferred: queue closed", job.posting_id);
                SubmitOutcome::Deferred
            }
        }
    }

    /// Stops accepting submissions, then waits until buffered and in-flight jobs finish.
    pub async fn shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);

        let handle = self.dispatcher.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Enrichment dispatcher ended abnormally: {e}");
            }
        }
        info!("Enrichment queue drained");
    }
}

async fn dispatch(
    mut rx: mpsc::Receiver<EnrichmentJob>,
    mut shutdown_rx: watch::Receiver<bool>,
    store: Arc<dyn JobStore>,
    enricher: Arc<Enricher>,
    workers: usize,
) {
    let permits = Arc::new(Semaphore::new(workers));
    let mut in_flight = JoinSet::new();
    let mut closing = false;

    loop {
        let job = tokio::select! {
            job = rx.recv() => job,
            changed = shutdown_rx.changed(), if !closing => {
                // Closing the receiver rejects new sends but keeps buffered jobs readable.
                if changed.is_err() || *shutdown_rx.borrow() {
                    closing = true;
                    rx.close();
                }
                continue;
            }
        };

        let Some(job) = job else { break };

        let permit = match permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let store = store.clone();
        let enricher = enricher.clone();
        in_flight.spawn(async move {
            run_job(store.as_ref(), &enricher, job).await;
            drop(permit);
        });

        // Reap finished tasks so the set does not grow unbounded.
        while let Some(done) = in_flight.try_join_next() {
            if let Err(e) = done {
                error!("Enrichment task panicked: {e}");
            }
        }
    }

    while let Some(done) = in_flight.join_next().await {
        if let Err(e) = done {
            error!("Enrichment task panicked: {e}");
        }
    }
}

/// One isolated unit of work: load, enrich, persist. Errors stop here.
async fn run_job(store: &dyn JobStore, enricher: &Enricher, job: EnrichmentJob) {
    info!("Enrichment started for posting {} ({:?})", job.posting_id, job.reason);

    let posting = match store.get_posting(job.posting_id).await {
        Ok(Some(posting)) => posting,
        Ok(None) => {
            warn!("Posting {} not found; enrichment dropped", job.posting_id);
            return;
        }
        Err(e) => {
            error!("Failed to load posting {}: {e:#}", job.posting_id);
            return;
        }
    };

    let result = enricher
        .enrich(posting, job.reason.mode(), &RetryPolicy::once())
        .await;

    match result.persist(store).await {
        Ok(true) => info!("Enrichment saved for posting {}", job.posting_id),
        Ok(false) => debug!("Nothing to save for posting {}", job.posting_id),
        Err(e) => error!("Failed to save enrichment for posting {}: {e:#}", job.posting_id),
    }
}
