//! Stage one of matching: rank every embedded posting by cosine similarity to the resume.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{debug, warn};

use crate::matching::vector::{cosine, decode_embedding};
use crate::models::posting::JobPosting;

/// One ranked posting. `ai_score` and `reason` stay empty until rerank fills them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub posting_id: i64,
    pub company_id: i64,
    pub title: Option<String>,
    pub company_name: Option<String>,
    pub retrieval_score: f64,
    pub ai_score: f64,
    pub reason: String,
}

impl MatchCandidate {
    fn retrieved(posting: &JobPosting, retrieval_score: f64) -> Self {
        Self {
            posting_id: posting.id,
            company_id: posting.company_id,
            title: posting.title.clone(),
            company_name: posting.company_name.clone(),
            retrieval_score,
            ai_score: 0.0,
            reason: String::new(),
        }
    }
}

/// Top candidates plus counts of postings that could not be compared.
#[derive(Debug, Default)]
pub struct Retrieval {
    pub candidates: Vec<MatchCandidate>,
    pub missing: usize,
    pub unparseable: usize,
    pub mismatched: usize,
}

impl Retrieval {
    pub fn excluded(&self) -> usize {
        self.missing + self.unparseable + self.mismatched
    }
}

/// Scores `postings` against `query` and keeps the best `top_k`.
///
/// Postings without a usable embedding, or whose dimension differs from the
/// query, are left out. A mismatch is a per-posting data problem and never
/// fails the whole retrieval.
pub fn retrieve(query: &[f32], postings: &[JobPosting], top_k: usize) -> Retrieval {
    let mut retrieval = Retrieval::default();

    for posting in postings {
        let raw = match posting.embedding.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => {
                retrieval.missing += 1;
                continue;
            }
        };
        let Some(vector) = decode_embedding(raw) else {
            debug!("Posting {} has an unparseable embedding", posting.id);
            retrieval.unparseable += 1;
            continue;
        };
        match cosine(query, &vector) {
            Ok(score) => retrieval
                .candidates
                .push(MatchCandidate::retrieved(posting, score)),
            Err(e) => {
                warn!("Posting {} skipped in retrieval: {e}", posting.id);
                retrieval.mismatched += 1;
            }
        }
    }

    retrieval.candidates.sort_by(|a, b| {
        b.retrieval_score
            .partial_cmp(&a.retrieval_score)
            .unwrap_or(Ordering::Equal)
            .then(a.posting_id.cmp(&b.posting_id))
    });
    retrieval.candidates.truncate(top_k);
    retrieval
}
