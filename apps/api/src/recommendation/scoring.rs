//! Heuristic recommender: ranks postings against a coarse candidate profile.
//!
//! Pure and deterministic: one bulk read upstream, no AI calls here.
//! Each signal contributes a fixed number of points; a capped popularity
//! bonus breaks near-ties in favour of postings people actually open.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::debug;

use crate::config::RecommendConfig;
use crate::models::posting::{JobPosting, PostingCard};
use crate::models::profile::CandidateProfile;

const POSITION_WEIGHT: f64 = 35.0;
const EDUCATION_POINTS: f64 = 20.0;
const CAREER_POINTS: f64 = 20.0;
const LOCATION_POINTS: f64 = 15.0;
const VIEWS_PER_BONUS_POINT: f64 = 300.0;
const MAX_POPULARITY_BONUS: f64 = 10.0;

/// Positions that share a group count as related even without a substring match.
const POSITION_GROUPS: &[&[&str]] = &[
    &["backend", "back-end", "server", "백엔드", "서버"],
    &["frontend", "front-end", "web", "프론트엔드", "프론트"],
    &["data", "ml", "ai", "machine learning", "데이터", "머신러닝"],
    &["devops", "infra", "sre", "cloud", "인프라", "클라우드"],
    &["mobile", "android", "ios", "모바일", "안드로이드"],
];

/// Career texts that accept any applicant.
const OPEN_CAREER_MARKERS: &[&str] = &["any", "entry", "new grad", "무관", "신입"];

/// Associate precedes bachelor so "초대졸" is consumed before "대졸" can match inside it.
const EDUCATION_LEVELS: &[(u8, &[&str])] = &[
    (5, &["doctor", "doctorate", "phd", "ph.d", "박사"]),
    (4, &["master", "masters", "석사"]),
    (2, &["associate", "associates", "초대졸", "전문대"]),
    (3, &["bachelor", "bachelors", "university", "대졸", "대학교", "학사"]),
    (1, &["high school", "highschool", "고졸", "고등학교"]),
];

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResult {
    pub posting: PostingCard,
    pub score: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Signals
// ────────────────────────────────────────────────────────────────────────────

fn normalized(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

fn mutual_substring(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

fn ascii_words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Whole-word (or whole-phrase) match for ASCII keywords, so "any" does not
/// hit "company". Hangul keywords are matched as substrings since Korean
/// attaches particles and suffixes directly to the word.
fn mentions(text: &str, keyword: &str) -> bool {
    if !keyword.is_ascii() {
        return text.contains(keyword);
    }
    let phrase = ascii_words(keyword);
    if phrase.is_empty() {
        return false;
    }
    ascii_words(text)
        .windows(phrase.len())
        .any(|window| window == phrase.as_slice())
}

/// 1.0 exact, 0.7 substring either way, 0.5 same keyword group, else 0.
pub fn position_similarity(candidate: Option<&str>, posting: Option<&str>) -> f64 {
    let (Some(a), Some(b)) = (normalized(candidate), normalized(posting)) else {
        return 0.0;
    };
    if a == b {
        return 1.0;
    }
    if mutual_substring(&a, &b) {
        return 0.7;
    }
    let shares_group = POSITION_GROUPS.iter().any(|group| {
        group.iter().any(|k| mentions(&a, k)) && group.iter().any(|k| mentions(&b, k))
    });
    if shares_group {
        0.5
    } else {
        0.0
    }
}

/// Every education level named in `text`, in table order.
fn education_levels(text: Option<&str>) -> Vec<u8> {
    let Some(mut rest) = normalized(text) else {
        return Vec::new();
    };
    let mut levels = Vec::new();
    for (level, keywords) in EDUCATION_LEVELS {
        for keyword in keywords.iter() {
            if mentions(&rest, keyword) {
                levels.push(*level);
                rest = rest.replace(keyword, " ");
            }
        }
    }
    levels
}

/// Candidate side: the highest level mentioned. Blank or unrecognised is 0.
pub fn attained_education_level(text: Option<&str>) -> u8 {
    education_levels(text).into_iter().max().unwrap_or(0)
}

/// Posting side: the lowest level mentioned, since anything above it is a
/// preference ("high school, university preferred" requires high school).
pub fn required_education_level(text: Option<&str>) -> u8 {
    education_levels(text).into_iter().min().unwrap_or(0)
}

fn career_fits(candidate: Option<&str>, posting: Option<&str>) -> bool {
    let posting = normalized(posting);
    if let Some(p) = &posting {
        if OPEN_CAREER_MARKERS.iter().any(|m| mentions(p, m)) {
            return true;
        }
    }
    match (normalized(candidate), posting) {
        (Some(c), Some(p)) => mutual_substring(&c, &p),
        _ => false,
    }
}

fn location_fits(candidate: Option<&str>, posting: Option<&str>) -> bool {
    match (normalized(candidate), normalized(posting)) {
        (Some(c), Some(p)) => mutual_substring(&c, &p),
        _ => false,
    }
}

fn popularity_bonus(views: i64) -> f64 {
    (views.max(0) as f64 / VIEWS_PER_BONUS_POINT).min(MAX_POPULARITY_BONUS)
}

/// Additive score for one posting.
pub fn score_posting(profile: &CandidateProfile, posting: &JobPosting) -> f64 {
    let mut score = POSITION_WEIGHT
        * position_similarity(profile.position.as_deref(), posting.position.as_deref());

    if attained_education_level(profile.education.as_deref())
        >= required_education_level(posting.education.as_deref())
    {
        score += EDUCATION_POINTS;
    }
    if career_fits(profile.career_level.as_deref(), posting.career_level.as_deref()) {
        score += CAREER_POINTS;
    }
    if location_fits(profile.location.as_deref(), posting.location.as_deref()) {
        score += LOCATION_POINTS;
    }

    score + popularity_bonus(posting.views)
}

// ────────────────────────────────────────────────────────────────────────────
// Ranking
// ────────────────────────────────────────────────────────────────────────────

fn rank(mut results: Vec<RecommendationResult>, limit: usize) -> Vec<RecommendationResult> {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(b.posting.views.cmp(&a.posting.views))
            .then(a.posting.id.cmp(&b.posting.id))
    });
    results.truncate(limit);
    results
}

/// Ranks `postings` for `profile`. A profile with no signal at all gets the
/// most viewed postings instead, each with score 0.
pub fn recommended_jobs_for(
    profile: &CandidateProfile,
    postings: &[JobPosting],
    config: &RecommendConfig,
) -> Vec<RecommendationResult> {
    if profile.is_blank() {
        debug!("Blank profile; falling back to popularity order");
        let results = postings
            .iter()
            .map(|p| RecommendationResult {
                posting: PostingCard::from(p),
                score: 0.0,
            })
            .collect();
        return rank(results, config.limit);
    }

    let results = postings
        .iter()
        .map(|p| RecommendationResult {
            posting: PostingCard::from(p),
            score: score_posting(profile, p),
        })
        .collect();
    rank(results, config.limit)
}
