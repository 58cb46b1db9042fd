//! Full-text composition and summary validation for postings.

use crate::config::EnrichmentConfig;
use crate::models::posting::JobPosting;

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Concatenates the non-empty posting sections in a fixed order.
///
/// Prose sections are separated by blank lines; position, career level and
/// education follow as single-line metadata. Returns an empty string when the
/// posting carries no text at all.
pub fn compose_full_text(p: &JobPosting) -> String {
    let mut text = String::new();

    let headline = [("Title", &p.title), ("Company", &p.company_name)];
    for (label, field) in headline {
        if let Some(value) = non_blank(field) {
            text.push_str(&format!("{label}: {value}\n\n"));
        }
    }

    let sections = [
        ("Description", &p.content),
        ("Responsibilities", &p.main_job),
        ("Qualifications", &p.qualification),
        ("Preferences", &p.preference),
    ];
    for (label, field) in sections {
        if let Some(value) = non_blank(field) {
            text.push_str(&format!("{label}:\n{value}\n\n"));
        }
    }

    let metadata = [
        ("Position", &p.position),
        ("Career level", &p.career_level),
        ("Education", &p.education),
    ];
    for (label, field) in metadata {
        if let Some(value) = non_blank(field) {
            text.push_str(&format!("{label}: {value}\n"));
        }
    }

    text.trim_end().to_string()
}

/// Why a summarizer reply was discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryRejection {
    Blank,
    TooShort(usize),
    Sentinel(String),
}

/// Accepts a summary only if it is non-blank, longer than the configured
/// minimum and free of known failure phrases. Returns the trimmed summary.
pub fn validate_summary(raw: &str, config: &EnrichmentConfig) -> Result<String, SummaryRejection> {
    let summary = raw.trim();
    if summary.is_empty() {
        return Err(SummaryRejection::Blank);
    }

    let chars = summary.chars().count();
    if chars <= config.min_summary_chars {
        return Err(SummaryRejection::TooShort(chars));
    }

    if let Some(sentinel) = config
        .summary_sentinels
        .iter()
        .find(|s| summary.contains(s.as_str()))
    {
        return Err(SummaryRejection::Sentinel(sentinel.clone()));
    }

    Ok(summary.to_string())
}

/// True when a stored summary already satisfies the length guard.
pub fn summary_is_settled(summary: Option<&str>, config: &EnrichmentConfig) -> bool {
    summary.map_or(false, |s| s.trim().chars().count() > config.min_summary_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting() -> JobPosting {
        JobPosting {
            id: 1,
            company_id: 9,
            company_name: Some("Acme".to_string()),
            title: Some("Backend Engineer".to_string()),
            content: Some("Build payment APIs.  ".to_string()),
            main_job: None,
            qualification: Some("Java, Spring".to_string()),
            preference: Some("   ".to_string()),
            position: Some("Backend".to_string()),
            career_level: Some("any".to_string()),
            education: Some("bachelor".to_string()),
            location: Some("Seoul".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_compose_orders_sections_and_skips_empty() {
        let text = compose_full_text(&posting());
        assert_eq!(
            text,
            "Title: Backend Engineer\n\n\
             Company: Acme\n\n\
             Description:\nBuild payment APIs.\n\n\
             Qualifications:\nJava, Spring\n\n\
             Position: Backend\n\
             Career level: any\n\
             Education: bachelor"
        );
    }

    #[test]
    fn test_compose_excludes_location() {
        assert!(!compose_full_text(&posting()).contains("Seoul"));
    }

    #[test]
    fn test_compose_empty_posting_is_empty() {
        let empty = JobPosting {
            title: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(compose_full_text(&empty).is_empty());
    }

    #[test]
    fn test_validate_summary_length_boundary() {
        let config = EnrichmentConfig::default();
        let exactly_30 = "a".repeat(30);
        let thirty_one = "a".repeat(31);
        assert_eq!(
            validate_summary(&exactly_30, &config),
            Err(SummaryRejection::TooShort(30))
        );
        assert_eq!(validate_summary(&thirty_one, &config), Ok(thirty_one.clone()));
    }

    #[test]
    fn test_validate_summary_counts_characters_not_bytes() {
        let config = EnrichmentConfig::default();
        // 20 Hangul syllables are 60 bytes but only 20 characters.
        let short_korean = "가".repeat(20);
        assert!(matches!(
            validate_summary(&short_korean, &config),
            Err(SummaryRejection::TooShort(20))
        ));
    }

    #[test]
    fn test_validate_summary_rejects_sentinel() {
        let config = EnrichmentConfig {
            summary_sentinels: vec!["model did not respond".to_string()],
            ..Default::default()
        };
        let reply = "Summary unavailable: model did not respond, please retry later.";
        assert_eq!(
            validate_summary(reply, &config),
            Err(SummaryRejection::Sentinel("model did not respond".to_string()))
        );
    }

    #[test]
    fn test_validate_summary_rejects_blank() {
        let config = EnrichmentConfig::default();
        assert_eq!(validate_summary(" \n ", &config), Err(SummaryRejection::Blank));
    }

    #[test]
    fn test_summary_is_settled_uses_same_guard() {
        let config = EnrichmentConfig::default();
        assert!(!summary_is_settled(None, &config));
        assert!(!summary_is_settled(Some("short"), &config));
        assert!(summary_is_settled(Some(&"x".repeat(31)), &config));
    }
}
