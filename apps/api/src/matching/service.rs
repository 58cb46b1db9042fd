use std::collections::HashMap;

use tracing::{info, warn};

use crate::ai_client::{Embedder, PairwiseJudge};
use crate::config::MatchConfig;
use crate::errors::AppError;
use crate::matching::rerank::rerank;
use crate::matching::retrieval::{retrieve, MatchCandidate};
use crate::models::posting::JobPosting;
use crate::store::JobStore;

/// Two-stage match for one resume: vector retrieval over every posting, then
/// a serialized AI rerank of the top candidates.
///
/// Only an unknown resume or a store failure is an error. A resume with no
/// text, or an embedder outage, yields an empty list.
pub async fn match_resume_to_postings(
    store: &dyn JobStore,
    embedder: &dyn Embedder,
    judge: &dyn PairwiseJudge,
    config: &MatchConfig,
    resume_id: i64,
) -> Result<Vec<MatchCandidate>, AppError> {
    let resume = store
        .get_resume(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;

    let Some(query_text) = resume.matching_text() else {
        warn!("Resume {resume_id} has no summary or content; nothing to match");
        return Ok(Vec::new());
    };

    let query = match embedder.embed(query_text).await {
        Ok(vector) if !vector.is_empty() => vector,
        Ok(_) => {
            warn!("Embedder returned an empty vector for resume {resume_id}");
            return Ok(Vec::new());
        }
        Err(e) => {
            warn!("Embedding resume {resume_id} failed: {e}");
            return Ok(Vec::new());
        }
    };

    let postings = store.list_postings().await?;
    let retrieval = retrieve(&query, &postings, config.top_k);
    info!(
        "Resume {resume_id}: {} candidates retrieved from {} postings ({} excluded)",
        retrieval.candidates.len(),
        postings.len(),
        retrieval.excluded()
    );

    let by_id: HashMap<i64, &JobPosting> = postings.iter().map(|p| (p.id, p)).collect();
    Ok(rerank(judge, query_text, retrieval.candidates, &by_id, config).await)
}
