//! Stage two of matching: ask the pairwise judge about each retrieved candidate.
//!
//! Calls run one at a time with a fixed pause between them so the judge's
//! rate limit is never exceeded. A judge failure costs only that candidate's
//! score; the list always comes back at full length.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::ai_client::PairwiseJudge;
use crate::config::MatchConfig;
use crate::matching::retrieval::MatchCandidate;
use crate::models::posting::JobPosting;

const REASON_MISSING_POSTING: &str = "posting not found; not evaluated";
const REASON_MISSING_SUMMARY: &str = "posting has no summary; not evaluated";

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Fills `ai_score` and `reason` for every candidate and returns them in final order:
/// AI score desc, retrieval score desc, posting id asc.
pub async fn rerank(
    judge: &dyn PairwiseJudge,
    resume_text: &str,
    mut candidates: Vec<MatchCandidate>,
    postings: &HashMap<i64, &JobPosting>,
    config: &MatchConfig,
) -> Vec<MatchCandidate> {
    let resume_input = truncate_chars(resume_text, config.max_judge_input_chars);
    let mut judged = 0usize;

    for candidate in candidates.iter_mut() {
        let summary = match postings.get(&candidate.posting_id) {
            None => {
                candidate.ai_score = 0.0;
                candidate.reason = REASON_MISSING_POSTING.to_string();
                continue;
            }
            Some(posting) => posting.summary.as_deref().filter(|s| !s.trim().is_empty()),
        };
        let Some(summary) = summary else {
            debug!("Posting {} has no summary; rerank skipped", candidate.posting_id);
            candidate.ai_score = 0.0;
            candidate.reason = REASON_MISSING_SUMMARY.to_string();
            continue;
        };

        let posting_input = truncate_chars(summary, config.max_judge_input_chars);
        match judge.judge(resume_input, posting_input).await {
            Ok(verdict) => {
                candidate.ai_score = verdict.score;
                candidate.reason = verdict.reason;
                judged += 1;
            }
            Err(e) => {
                warn!("Judge failed for posting {}: {e}", candidate.posting_id);
                candidate.ai_score = 0.0;
                candidate.reason = format!("AI evaluation failed: {e}");
            }
        }

        tokio::time::sleep(config.rerank_delay).await;
    }

    candidates.sort_by(|a, b| {
        b.ai_score
            .partial_cmp(&a.ai_score)
            .unwrap_or(Ordering::Equal)
            .then(
                b.retrieval_score
                    .partial_cmp(&a.retrieval_score)
                    .unwrap_or(Ordering::Equal),
            )
            .then(a.posting_id.cmp(&b.posting_id))
    });

    info!("Rerank finished: {judged}/{} candidates judged", candidates.len());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::ai_client::stub::StubJudge;

    fn candidate(id: i64, retrieval_score: f64) -> MatchCandidate {
        MatchCandidate {
            posting_id: id,
            company_id: 1,
            title: None,
            company_name: None,
            retrieval_score,
            ai_score: 0.0,
            reason: String::new(),
        }
    }

    fn posting(id: i64, summary: Option<&str>) -> JobPosting {
        JobPosting {
            id,
            company_id: 1,
            summary: summary.map(str::to_string),
            ..Default::default()
        }
    }

    fn config() -> MatchConfig {
        MatchConfig {
            top_k: 10,
            rerank_delay: Duration::from_millis(300),
            max_judge_input_chars: 1000,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerank_orders_by_ai_score_then_retrieval() {
        let postings = [
            posting(1, Some("java backend")),
            posting(2, Some("react frontend")),
            posting(3, Some("kotlin backend")),
        ];
        let by_id: HashMap<i64, &JobPosting> = postings.iter().map(|p| (p.id, p)).collect();
        let judge = StubJudge::by_posting_summary(&[
            ("java backend", 70.0),
            ("react frontend", 20.0),
            ("kotlin backend", 70.0),
        ]);

        let ranked = rerank(
            &judge,
            "resume",
            vec![candidate(1, 0.6), candidate(2, 0.9), candidate(3, 0.8)],
            &by_id,
            &config(),
        )
        .await;

        let order: Vec<i64> = ranked.iter().map(|c| c.posting_id).collect();
        assert_eq!(order, vec![3, 1, 2]);
        assert_eq!(judge.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_judge_falls_back_to_retrieval_order() {
        let postings = [
            posting(1, Some("first")),
            posting(2, Some("second")),
            posting(3, Some("third")),
        ];
        let by_id: HashMap<i64, &JobPosting> = postings.iter().map(|p| (p.id, p)).collect();
        let judge = StubJudge::unreachable();

        let ranked = rerank(
            &judge,
            "resume",
            vec![candidate(2, 0.4), candidate(1, 0.9), candidate(3, 0.7)],
            &by_id,
            &config(),
        )
        .await;

        let order: Vec<i64> = ranked.iter().map(|c| c.posting_id).collect();
        assert_eq!(order, vec![1, 3, 2]);
        assert!(ranked.iter().all(|c| c.ai_score == 0.0));
        assert!(ranked.iter().all(|c| !c.reason.is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_summary_or_posting_skips_the_call() {
        let postings = [posting(1, None), posting(2, Some("   "))];
        let by_id: HashMap<i64, &JobPosting> = postings.iter().map(|p| (p.id, p)).collect();
        let judge = StubJudge::unreachable();

        let ranked = rerank(
            &judge,
            "resume",
            vec![candidate(1, 0.5), candidate(2, 0.4), candidate(3, 0.3)],
            &by_id,
            &config(),
        )
        .await;

        assert_eq!(ranked.len(), 3);
        assert_eq!(judge.calls(), 0);
        assert_eq!(ranked[0].reason, REASON_MISSING_SUMMARY);
        assert_eq!(ranked[2].reason, REASON_MISSING_POSTING);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inputs_are_truncated_and_calls_are_spaced() {
        let long_summary = "가".repeat(1500);
        let postings = [posting(1, Some(&long_summary)), posting(2, Some("short"))];
        let by_id: HashMap<i64, &JobPosting> = postings.iter().map(|p| (p.id, p)).collect();
        let judge = StubJudge::by_posting_summary(&[("short", 50.0)]);
        let resume = "r".repeat(1200);

        let started = tokio::time::Instant::now();
        rerank(
            &judge,
            &resume,
            vec![candidate(1, 0.5), candidate(2, 0.4)],
            &by_id,
            &config(),
        )
        .await;

        assert!(started.elapsed() >= Duration::from_millis(600));
        let inputs = judge.inputs.lock().unwrap();
        assert_eq!(inputs[0].0.chars().count(), 1000);
        assert_eq!(inputs[0].1.chars().count(), 1000);
        assert_eq!(inputs[1].1, "short");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
