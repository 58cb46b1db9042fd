use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct Resume {
    pub id: i64,
    pub user_id: i64,
    pub content: Option<String>,
    /// Supplied by the resume service; read-only to matching.
    pub summary: Option<String>,
}

impl Resume {
    /// Text used to represent the resume: the summary when present, else the raw content.
    pub fn matching_text(&self) -> Option<&str> {
        [self.summary.as_deref(), self.content.as_deref()]
            .into_iter()
            .flatten()
            .find(|t| !t.trim().is_empty())
    }
}
