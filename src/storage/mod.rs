//! Report persistence
//!
//! Reports are written to `<dir>/<YYYYmmdd_HHMMSS>_<slug>.<ext>`. Files are
//! opened with `create_new`, so an existing report is never overwritten: a
//! name collision gets a `-1`, `-2`, ... suffix instead.

pub mod render;

use crate::types::{AppError, Report, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::{AsyncWrite, AsyncWriteExt};

const SLUG_MAX_CHARS: usize = 50;
const MAX_NAME_ATTEMPTS: u32 = 100;
/// Length of the `%Y%m%d_%H%M%S` name prefix
const TIMESTAMP_CHARS: usize = 15;

/// Output format of a saved report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    PlainText,
    /// Markdown
    RichDocument,
    /// JSON
    StructuredRecord,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::PlainText => "txt",
            ReportFormat::RichDocument => "md",
            ReportFormat::StructuredRecord => "json",
        }
    }

    pub fn render(&self, report: &Report) -> Result<String> {
        match self {
            ReportFormat::PlainText => Ok(render::render_text(report)),
            ReportFormat::RichDocument => Ok(render::render_markdown(report)),
            ReportFormat::StructuredRecord => render::render_json(report),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" | "plain" => Ok(ReportFormat::PlainText),
            "md" | "markdown" | "rich" => Ok(ReportFormat::RichDocument),
            "json" | "structured" => Ok(ReportFormat::StructuredRecord),
            other => Err(AppError::UnsupportedFormat(format!(
                "'{}' (expected txt, md or json)",
                other
            ))),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportFormat::PlainText => "text",
            ReportFormat::RichDocument => "markdown",
            ReportFormat::StructuredRecord => "json",
        };
        f.write_str(name)
    }
}

/// File-name fragment derived from the query.
pub fn slugify(query: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in query.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    let slug: String = slug.chars().take(SLUG_MAX_CHARS).collect();
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "report".to_string()
    } else {
        slug.to_string()
    }
}

/// A report file found in the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReport {
    pub path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn storage_err(path: &Path, source: std::io::Error) -> AppError {
        AppError::Storage {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Render and write the report; returns the path of the new file.
    pub async fn save(&self, report: &Report, format: ReportFormat) -> Result<PathBuf> {
        let contents = format.render(report)?;
        self.write_new(
            report.metadata.generated_at,
            &slugify(&report.query),
            format.extension(),
            contents.as_bytes(),
        )
        .await
    }

    async fn write_new(
        &self,
        at: DateTime<Utc>,
        slug: &str,
        extension: &str,
        contents: &[u8],
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Self::storage_err(&self.dir, e))?;

        let stem = format!("{}_{}", at.format("%Y%m%d_%H%M%S"), slug);
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{}.{}", stem, extension)
            } else {
                format!("{}-{}.{}", stem, attempt, extension)
            };
            let path = self.dir.join(name);

            let file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(Self::storage_err(&path, e)),
            };

            Self::fill(&path, file, contents).await?;

            tracing::info!("Report saved to {}", path.display());
            return Ok(path);
        }

        let path = self.dir.join(format!("{}.{}", stem, extension));
        Err(Self::storage_err(
            &path,
            std::io::Error::new(
                ErrorKind::AlreadyExists,
                format!("{} reports with this name already exist", MAX_NAME_ATTEMPTS),
            ),
        ))
    }

    /// Write `contents` into the freshly created `path`, removing it again on
    /// failure so no truncated report is left behind.
    async fn fill<W: AsyncWrite + Unpin>(path: &Path, mut file: W, contents: &[u8]) -> Result<()> {
        let written = async {
            file.write_all(contents).await?;
            file.flush().await
        }
        .await;
        let Err(e) = written else {
            return Ok(());
        };

        drop(file);
        if let Err(cleanup) = tokio::fs::remove_file(path).await {
            tracing::warn!(
                "Could not remove partial report {}: {}",
                path.display(),
                cleanup
            );
        }
        Err(Self::storage_err(path, e))
    }

    /// Saved reports, newest first. A missing directory holds no reports.
    pub async fn list_reports(&self, limit: usize) -> Result<Vec<StoredReport>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(Self::storage_err(&self.dir, e)),
        };

        let mut reports = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::storage_err(&self.dir, e))?
        {
            let path = entry.path();
            let is_report = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e, "md" | "txt" | "json"))
                .unwrap_or(false);
            if !is_report {
                continue;
            }
            let size_bytes = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
            reports.push(StoredReport { path, size_bytes });
        }

        reports.sort_by(|a, b| recency_key(&b.path).cmp(&recency_key(&a.path)));
        reports.truncate(limit);
        Ok(reports)
    }
}

/// Names start with the second they were written in; within one second a
/// collision suffix (`-1`, `-2`, ...) only ever lengthens a later name.
fn recency_key(path: &Path) -> (String, usize, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp: String = name.chars().take(TIMESTAMP_CHARS).collect();
    (stamp, name.len(), name)
}
