//! Axum route handlers for resume-to-posting matching.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::AppError;
use crate::matching::retrieval::MatchCandidate;
use crate::matching::service::match_resume_to_postings;
use crate::state::AppState;

/// GET /api/v1/resumes/:id/matches
///
/// Runs retrieval and the serialized AI rerank inside the request, so it can
/// take several seconds for a full top-K.
pub async fn handle_resume_matches(
    State(state): State<AppState>,
    Path(resume_id): Path<i64>,
) -> Result<Json<Vec<MatchCandidate>>, AppError> {
    let matches = match_resume_to_postings(
        state.store.as_ref(),
        state.embedder.as_ref(),
        state.judge.as_ref(),
        &state.config.matching,
        resume_id,
    )
    .await?;
    Ok(Json(matches))
}
