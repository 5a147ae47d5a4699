use crate::llm::usage::UsageSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

// ============= Paper Types =============

/// Metadata for one arXiv paper as returned by the search API.
///
/// Records are built once by the feed parser and only cloned afterwards;
/// nothing in the crate mutates a record after it has been fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// arXiv identifier, e.g. `2210.03629v3`
    pub id: String,
    pub title: String,
    /// Authors in the order the feed lists them
    pub authors: Vec<String>,
    /// Abstract text
    pub summary: String,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    /// Abstract page URL
    pub abs_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

impl PaperRecord {
    /// Authors joined for display, truncated to `max` names with an "et al." tail.
    pub fn author_line(&self, max: usize) -> String {
        if self.authors.len() <= max {
            return self.authors.join(", ");
        }
        format!(
            "{} et al. ({} authors)",
            self.authors[..max].join(", "),
            self.authors.len()
        )
    }

    /// Publication date as `YYYY-MM-DD`, if known.
    pub fn published_date(&self) -> Option<String> {
        self.published.map(|d| d.format("%Y-%m-%d").to_string())
    }
}

// ============= Tool Types =============

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

// ============= Report Types =============

/// The narrative sections of a report, in the order they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Summary,
    Innovations,
    Critique,
    Synthesis,
}

impl SectionKind {
    /// All sections in report order.
    pub const ORDER: [SectionKind; 4] = [
        SectionKind::Summary,
        SectionKind::Innovations,
        SectionKind::Critique,
        SectionKind::Synthesis,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Summary => "Summary",
            SectionKind::Innovations => "Innovations",
            SectionKind::Critique => "Critique",
            SectionKind::Synthesis => "Synthesis",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub kind: SectionKind,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    /// Role display name -> model identifier
    pub models: BTreeMap<String, String>,
    /// Roles that produced a final turn, in transcript order
    pub contributing_roles: Vec<String>,
    /// Degradations recorded during the run (failed searches, exhausted budget)
    #[serde(default)]
    pub notes: Vec<String>,
    pub analysis_turns: usize,
    pub transcript_turns: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSummary>,
}

/// Final multi-section document produced once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub query: String,
    pub sections: Vec<ReportSection>,
    /// Papers fetched during the run, rendered as the References section
    pub references: Vec<PaperRecord>,
    pub metadata: ReportMetadata,
}

impl Report {
    pub fn section(&self, kind: SectionKind) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("LLM completion error: {0}")]
    Completion(String),

    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported report format: {0}")]
    UnsupportedFormat(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Billing lookup error: {0}")]
    Billing(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error ends the run.
    ///
    /// Search, notification and billing failures degrade the run instead;
    /// tool-level input errors are reported back to the model as tool results.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Configuration(_)
                | AppError::Completion(_)
                | AppError::Storage { .. }
                | AppError::UnsupportedFormat(_)
                | AppError::Internal(_)
        )
    }

    /// Process exit code for a fatal error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Configuration(_) | AppError::UnsupportedFormat(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(authors: &[&str]) -> PaperRecord {
        PaperRecord {
            id: "2210.03629v3".to_string(),
            title: "ReAct".to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            summary: String::new(),
            categories: BTreeSet::new(),
            primary_category: None,
            published: None,
            updated: None,
            abs_url: "http://arxiv.org/abs/2210.03629v3".to_string(),
            pdf_url: None,
        }
    }

    #[test]
    fn test_author_line_truncates() {
        let p = paper(&["Yao", "Zhao", "Yu", "Du"]);
        assert_eq!(p.author_line(3), "Yao, Zhao, Yu et al. (4 authors)");
        assert_eq!(p.author_line(4), "Yao, Zhao, Yu, Du");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(AppError::Configuration("x".into()).is_fatal());
        assert!(AppError::Completion("x".into()).is_fatal());
        assert!(AppError::Storage {
            path: PathBuf::from("/tmp/r.md"),
            source: std::io::Error::other("disk full"),
        }
        .is_fatal());
        assert!(!AppError::Search("x".into()).is_fatal());
        assert!(!AppError::Notification("x".into()).is_fatal());
        assert!(!AppError::Billing("x".into()).is_fatal());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::Configuration("x".into()).exit_code(), 2);
        assert_eq!(AppError::Completion("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_storage_error_distinct_from_format() {
        let storage = AppError::Storage {
            path: PathBuf::from("out/r.md"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(storage.to_string().contains("out/r.md"));
        assert!(matches!(
            AppError::UnsupportedFormat("pdf".into()),
            AppError::UnsupportedFormat(_)
        ));
    }
}
