use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A job posting as persisted by the posting-management side, joined with its company name.
///
/// `summary` and `embedding` are owned by the enrichment pipeline; every other
/// field is read-only here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct JobPosting {
    pub id: i64,
    pub company_id: i64,
    pub company_name: Option<String>,
    pub title: Option<String>,
    /// Posting body.
    pub content: Option<String>,
    /// Main responsibilities.
    pub main_job: Option<String>,
    pub qualification: Option<String>,
    pub preference: Option<String>,
    pub position: Option<String>,
    pub career_level: Option<String>,
    pub education: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    /// JSON array of floats, see `matching::vector::encode_embedding`.
    pub embedding: Option<String>,
    pub views: i64,
}

/// The slice of a posting returned in ranked feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingCard {
    pub id: i64,
    pub company_id: i64,
    pub company_name: Option<String>,
    pub title: Option<String>,
    pub position: Option<String>,
    pub career_level: Option<String>,
    pub education: Option<String>,
    pub location: Option<String>,
    pub views: i64,
}

impl From<&JobPosting> for PostingCard {
    fn from(p: &JobPosting) -> Self {
        Self {
            id: p.id,
            company_id: p.company_id,
            company_name: p.company_name.clone(),
            title: p.title.clone(),
            position: p.position.clone(),
            career_level: p.career_level.clone(),
            education: p.education.clone(),
            location: p.location.clone(),
            views: p.views,
        }
    }
}
