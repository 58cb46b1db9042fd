//! Axum route handlers for heuristic job recommendations.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::AppError;
use crate::models::profile::CandidateProfile;
use crate::recommendation::scoring::{recommended_jobs_for, RecommendationResult};
use crate::state::AppState;

/// GET /api/v1/users/:id/recommended-jobs
///
/// Scores every posting against the user's stored profile.
pub async fn handle_user_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<RecommendationResult>>, AppError> {
    let profile = state
        .store
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

    recommend(&state, &profile).await
}

/// POST /api/v1/recommendations
///
/// Same ranking for an ad hoc profile supplied in the body.
pub async fn handle_profile_recommendations(
    State(state): State<AppState>,
    Json(profile): Json<CandidateProfile>,
) -> Result<Json<Vec<RecommendationResult>>, AppError> {
    recommend(&state, &profile).await
}

async fn recommend(
    state: &AppState,
    profile: &CandidateProfile,
) -> Result<Json<Vec<RecommendationResult>>, AppError> {
    let postings = state.store.list_postings().await?;
    Ok(Json(recommended_jobs_for(
        profile,
        &postings,
        &state.config.recommend,
    )))
}
