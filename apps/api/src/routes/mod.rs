pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::enrichment::handlers as enrichment;
use crate::matching::handlers as matching;
use crate::recommendation::handlers as recommendation;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Enrichment
        .route(
            "/api/v1/postings/:id/enrichment",
            post(enrichment::handle_submit_enrichment),
        )
        .route(
            "/api/v1/admin/enrichment/batch",
            post(enrichment::handle_run_batch),
        )
        // Matching
        .route(
            "/api/v1/resumes/:id/matches",
            get(matching::handle_resume_matches),
        )
        // Recommendations
        .route(
            "/api/v1/users/:id/recommended-jobs",
            get(recommendation::handle_user_recommendations),
        )
        .route(
            "/api/v1/recommendations",
            post(recommendation::handle_profile_recommendations),
        )
        .with_state(state)
}
