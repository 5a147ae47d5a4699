//! Report renderers, one per [`ReportFormat`](super::ReportFormat).

use crate::types::{AppError, PaperRecord, Report, Result, SectionKind};

fn section_body(report: &Report, kind: SectionKind) -> &str {
    report
        .section(kind)
        .map(|s| s.body.trim())
        .filter(|b| !b.is_empty())
        .unwrap_or("_No content was produced for this section._")
}

fn generated(report: &Report) -> String {
    report
        .metadata
        .generated_at
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

fn reference_fields(paper: &PaperRecord) -> Vec<(&'static str, String)> {
    let mut fields = vec![("Authors", paper.author_line(10))];
    if let Some(date) = paper.published_date() {
        fields.push(("Published", date));
    }
    fields.push(("ArXiv ID", paper.id.clone()));
    fields.push(("URL", paper.abs_url.clone()));
    if let Some(pdf) = &paper.pdf_url {
        fields.push(("PDF", pdf.clone()));
    }
    if !paper.categories.is_empty() {
        let cats: Vec<&str> = paper.categories.iter().map(String::as_str).collect();
        fields.push(("Categories", cats.join(", ")));
    }
    fields
}

/// Markdown document with header, the four sections and references.
pub fn render_markdown(report: &Report) -> String {
    let mut out = String::from("# Research Analysis Report\n\n");
    out.push_str(&format!("**Query:** {}\n\n", report.query));
    out.push_str(&format!("**Generated:** {}\n\n", generated(report)));
    if !report.metadata.models.is_empty() {
        out.push_str("**Models:**\n\n");
        for (role, model) in &report.metadata.models {
            out.push_str(&format!("- {}: `{}`\n", role, model));
        }
        out.push('\n');
    }
    out.push_str("---\n\n");

    for kind in SectionKind::ORDER {
        out.push_str(&format!("## {}\n\n", kind.title()));
        out.push_str(section_body(report, kind));
        out.push_str("\n\n");
    }

    out.push_str("---\n\n## References\n\n");
    if report.references.is_empty() {
        out.push_str("_No papers were retrieved during this run._\n");
    }
    for (i, paper) in report.references.iter().enumerate() {
        out.push_str(&format!("**[{}] {}**\n\n", i + 1, paper.title));
        for (label, value) in reference_fields(paper) {
            out.push_str(&format!("- *{}:* {}\n", label, value));
        }
        out.push('\n');
    }

    if !report.metadata.notes.is_empty() {
        out.push_str("\n## Run Notes\n\n");
        for note in &report.metadata.notes {
            out.push_str(&format!("- {}\n", note));
        }
    }
    out
}

/// Plain text rendition with underlined headings.
pub fn render_text(report: &Report) -> String {
    fn heading(out: &mut String, title: &str, rule: char) {
        out.push_str(title);
        out.push('\n');
        out.push_str(&rule.to_string().repeat(title.chars().count()));
        out.push_str("\n\n");
    }

    let mut out = String::new();
    heading(&mut out, "RESEARCH ANALYSIS REPORT", '=');
    out.push_str(&format!("Query:     {}\n", report.query));
    out.push_str(&format!("Generated: {}\n", generated(report)));
    for (role, model) in &report.metadata.models {
        out.push_str(&format!("{}: {}\n", role, model));
    }
    out.push('\n');

    for kind in SectionKind::ORDER {
        heading(&mut out, &kind.title().to_uppercase(), '-');
        out.push_str(section_body(report, kind));
        out.push_str("\n\n");
    }

    heading(&mut out, "REFERENCES", '-');
    for (i, paper) in report.references.iter().enumerate() {
        out.push_str(&format!("[{}] {}\n", i + 1, paper.title));
        for (label, value) in reference_fields(paper) {
            out.push_str(&format!("    {}: {}\n", label, value));
        }
        out.push('\n');
    }

    if !report.metadata.notes.is_empty() {
        heading(&mut out, "RUN NOTES", '-');
        for note in &report.metadata.notes {
            out.push_str(&format!("* {}\n", note));
        }
    }
    out
}

/// Pretty-printed JSON record of the whole report.
pub fn render_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report)
        .map_err(|e| AppError::Internal(format!("Failed to encode report: {}", e)))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::{PaperRecord, Report, ReportMetadata, ReportSection, SectionKind};
    use chrono::{TimeZone, Utc};
    use std::collections::{BTreeMap, BTreeSet};

    pub fn paper(id: &str, title: &str) -> PaperRecord {
        PaperRecord {
            id: id.to_string(),
            title: title.to_string(),
            authors: vec!["Ada Lovelace".into(), "Alan Turing".into()],
            summary: "An abstract.".into(),
            categories: BTreeSet::from(["cs.AI".to_string()]),
            primary_category: Some("cs.AI".into()),
            published: Utc.with_ymd_and_hms(2022, 10, 6, 0, 0, 0).single(),
            updated: None,
            abs_url: format!("http://arxiv.org/abs/{}", id),
            pdf_url: Some(format!("http://arxiv.org/pdf/{}", id)),
        }
    }

    pub fn report(query: &str) -> Report {
        let sections = SectionKind::ORDER
            .iter()
            .map(|k| ReportSection {
                kind: *k,
                body: format!("{} body", k.title()),
            })
            .collect();
        Report {
            query: query.to_string(),
            sections,
            references: vec![paper("2210.03629v3", "ReAct")],
            metadata: ReportMetadata {
                generated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
                models: BTreeMap::from([(
                    "Performance Analyst".to_string(),
                    "deepseek/deepseek-chat".to_string(),
                )]),
                contributing_roles: vec!["Performance Analyst".into()],
                notes: vec![],
                analysis_turns: 4,
                transcript_turns: 6,
                usage: None,
            },
        }
    }
}
