use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Coarse candidate profile used by the heuristic recommender.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct CandidateProfile {
    pub education: Option<String>,
    pub career_level: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
}

impl CandidateProfile {
    /// True when no field carries any signal.
    pub fn is_blank(&self) -> bool {
        [
            &self.education,
            &self.career_level,
            &self.position,
            &self.location,
        ]
        .iter()
        .all(|f| f.as_deref().map_or(true, |s| s.trim().is_empty()))
    }
}
