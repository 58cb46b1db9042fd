use std::sync::Arc;

use crate::ai_client::{Embedder, PairwiseJudge};
use crate::config::Config;
use crate::enrichment::pipeline::Enricher;
use crate::enrichment::worker::EnrichmentQueue;
use crate::store::JobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    /// Used for resume query vectors; postings are embedded through `enricher`.
    pub embedder: Arc<dyn Embedder>,
    pub judge: Arc<dyn PairwiseJudge>,
    pub enricher: Enricher,
    pub queue: Arc<EnrichmentQueue>,
    pub config: Config,
}
