//! Axum route handlers for posting enrichment.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::enrichment::batch::{run_batch, BatchReport};
use crate::enrichment::worker::{EnrichReason, EnrichmentJob, SubmitOutcome};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EnrichRequest {
    #[serde(default)]
    pub reason: EnrichReason,
}

#[derive(Debug, Serialize)]
pub struct EnrichResponse {
    pub posting_id: i64,
    pub status: SubmitOutcome,
}

/// POST /api/v1/postings/:id/enrichment
///
/// Hands the posting to the background queue and returns immediately.
/// `deferred` means the queue was saturated; the next batch run covers it.
pub async fn handle_submit_enrichment(
    State(state): State<AppState>,
    Path(posting_id): Path<i64>,
    body: Option<Json<EnrichRequest>>,
) -> Result<(StatusCode, Json<EnrichResponse>), AppError> {
    let reason = body.map(|Json(req)| req.reason).unwrap_or_default();

    if state.store.get_posting(posting_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Posting {posting_id} not found")));
    }

    let status = state.queue.submit(EnrichmentJob { posting_id, reason });
    Ok((
        StatusCode::ACCEPTED,
        Json(EnrichResponse { posting_id, status }),
    ))
}

/// POST /api/v1/admin/enrichment/batch
///
/// Runs a full maintenance pass in the request. Long-running by nature.
pub async fn handle_run_batch(State(state): State<AppState>) -> Result<Json<BatchReport>, AppError> {
    info!("Batch enrichment requested");
    let report = run_batch(state.store.as_ref(), &state.enricher, &state.config.batch).await?;
    Ok(Json(report))
}
