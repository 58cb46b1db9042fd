//! Read access to postings, resumes and profiles, plus the enrichment write-back.
//!
//! The tables belong to the posting/resume/user services; this module only
//! reads them and updates the two enrichment columns on `job_posts`.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::models::posting::JobPosting;
use crate::models::profile::CandidateProfile;
use crate::models::resume::Resume;

const POSTING_COLUMNS: &str = r#"
    p.id, p.company_id, c.name AS company_name, p.title, p.content, p.main_job,
    p.qualification, p.preference, p.position, p.career_level, p.education,
    p.location, p.summary, p.embedding, p.views
"#;

/// What to do with the `embedding` column on an enrichment write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingWrite<'a> {
    Keep,
    Set(&'a str),
    /// The stored vector no longer describes the stored summary.
    Clear,
}

impl<'a> EmbeddingWrite<'a> {
    fn value(self) -> Option<&'a str> {
        match self {
            EmbeddingWrite::Set(v) => Some(v),
            EmbeddingWrite::Keep | EmbeddingWrite::Clear => None,
        }
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn list_postings(&self) -> Result<Vec<JobPosting>>;

    async fn get_posting(&self, id: i64) -> Result<Option<JobPosting>>;

    async fn get_resume(&self, id: i64) -> Result<Option<Resume>>;

    async fn get_profile(&self, user_id: i64) -> Result<Option<CandidateProfile>>;

    /// Writes the enrichment columns. A `None` summary leaves that column untouched.
    async fn save_enrichment(
        &self,
        posting_id: i64,
        summary: Option<&str>,
        embedding: EmbeddingWrite<'_>,
    ) -> Result<()>;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Opens the connection pool. Matching reads are bulk and short, so a small pool suffices.
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to PostgreSQL...");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn list_postings(&self) -> Result<Vec<JobPosting>> {
        let sql = format!(
            "SELECT {POSTING_COLUMNS} FROM job_posts p JOIN companies c ON c.id = p.company_id ORDER BY p.id"
        );
        Ok(sqlx::query_as::<_, JobPosting>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_posting(&self, id: i64) -> Result<Option<JobPosting>> {
        let sql = format!(
            "SELECT {POSTING_COLUMNS} FROM job_posts p JOIN companies c ON c.id = p.company_id WHERE p.id = $1"
        );
        Ok(sqlx::query_as::<_, JobPosting>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_resume(&self, id: i64) -> Result<Option<Resume>> {
        Ok(sqlx::query_as::<_, Resume>(
            "SELECT id, user_id, content, summary FROM resumes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn get_profile(&self, user_id: i64) -> Result<Option<CandidateProfile>> {
        Ok(sqlx::query_as::<_, CandidateProfile>(
            "SELECT education, career_level, position, location FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn save_enrichment(
        &self,
        posting_id: i64,
        summary: Option<&str>,
        embedding: EmbeddingWrite<'_>,
    ) -> Result<()> {
        // Only the enrichment columns; primary posting fields are never written here.
        sqlx::query(
            r#"
            UPDATE job_posts
            SET summary = COALESCE($2, summary),
                embedding = CASE WHEN $4 THEN NULL ELSE COALESCE($3, embedding) END
            WHERE id = $1
            "#,
        )
        .bind(posting_id)
        .bind(summary)
        .bind(embedding.value())
        .bind(embedding == EmbeddingWrite::Clear)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
