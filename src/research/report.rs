//! Report assembly from a finished transcript and the citation ledger.

use crate::agents::Role;
use crate::llm::UsageSummary;
use crate::research::transcript::{Phase, Transcript};
use crate::types::{PaperRecord, Report, ReportMetadata, ReportSection, SectionKind};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};

/// Papers delivered to the roles during a run, deduplicated by id in
/// first-fetch order.
#[derive(Debug, Default, Clone)]
pub struct CitationLedger {
    seen: HashSet<String>,
    papers: Vec<PaperRecord>,
}

impl CitationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record fetched papers; returns how many were new.
    pub fn record(&mut self, papers: impl IntoIterator<Item = PaperRecord>) -> usize {
        let before = self.papers.len();
        for paper in papers {
            if self.seen.insert(paper.id.clone()) {
                self.papers.push(paper);
            }
        }
        self.papers.len() - before
    }

    pub fn papers(&self) -> &[PaperRecord] {
        &self.papers
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn into_papers(self) -> Vec<PaperRecord> {
        self.papers
    }
}

/// Body of the `## Executive Summary` section of a synthesis, if present;
/// otherwise its first paragraph that is not a heading.
pub fn extract_summary(synthesis: &str) -> String {
    let mut lines = synthesis.lines().skip_while(|l| {
        !(l.trim_start().starts_with('#') && l.to_lowercase().contains("executive summary"))
    });

    if lines.next().is_some() {
        let body: Vec<&str> = lines
            .take_while(|l| !l.trim_start().starts_with('#'))
            .collect();
        let body = body.join("\n").trim().to_string();
        if !body.is_empty() {
            return body;
        }
    }

    synthesis
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty() && !p.starts_with('#'))
        .unwrap_or("")
        .to_string()
}

fn placeholder(role: Role) -> String {
    format!(
        "_The {} did not produce an analysis within the turn budget._",
        role.display_name()
    )
}

/// Everything the coordinator knows at the end of a run.
pub struct ReportInputs<'a> {
    pub query: &'a str,
    pub transcript: &'a Transcript,
    pub ledger: CitationLedger,
    pub models: BTreeMap<String, String>,
    pub notes: Vec<String>,
    pub usage: Option<UsageSummary>,
}

pub fn assemble(inputs: ReportInputs<'_>) -> Report {
    let transcript = inputs.transcript;
    let body_of = |role: Role| {
        transcript
            .final_answer(role)
            .map(|t| t.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| placeholder(role))
    };

    let synthesis = body_of(Role::Synthesis);
    let sections = vec![
        ReportSection {
            kind: SectionKind::Summary,
            body: extract_summary(&synthesis),
        },
        ReportSection {
            kind: SectionKind::Innovations,
            body: body_of(Role::Innovation),
        },
        ReportSection {
            kind: SectionKind::Critique,
            body: body_of(Role::Limitation),
        },
        ReportSection {
            kind: SectionKind::Synthesis,
            body: synthesis,
        },
    ];

    Report {
        query: inputs.query.to_string(),
        sections,
        references: inputs.ledger.into_papers(),
        metadata: ReportMetadata {
            generated_at: Utc::now(),
            models: inputs.models,
            contributing_roles: transcript
                .contributing_roles()
                .iter()
                .map(|r| r.display_name().to_string())
                .collect(),
            notes: inputs.notes,
            analysis_turns: transcript.count_in_phase(Phase::Analysis),
            transcript_turns: transcript.len(),
            usage: inputs.usage,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::transcript::Turn;
    use crate::storage::render::fixtures::paper;

    #[test]
    fn test_ledger_dedups_in_first_fetch_order() {
        let mut ledger = CitationLedger::new();
        assert_eq!(ledger.record(vec![paper("b", "B"), paper("a", "A")]), 2);
        assert_eq!(ledger.record(vec![paper("a", "A again"), paper("c", "C")]), 1);
        let ids: Vec<&str> = ledger.papers().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(ledger.papers()[1].title, "A");
    }

    #[test]
    fn test_extract_executive_summary() {
        let text = "# Research Analysis: ReAct\n\n\
                    ## Executive Summary\nReAct interleaves reasoning and acting.\n\n\
                    ## Innovations & Contributions\n- x";
        assert_eq!(extract_summary(text), "ReAct interleaves reasoning and acting.");
    }

    #[test]
    fn test_extract_summary_falls_back_to_first_paragraph() {
        let text = "# Title\n\nFirst paragraph here.\n\nSecond.";
        assert_eq!(extract_summary(text), "First paragraph here.");
        assert_eq!(extract_summary(""), "");
    }

    #[test]
    fn test_assemble_uses_placeholders() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::user("q"));
        transcript.push(Turn::answer(Role::Innovation, Phase::Analysis, "Good ideas"));
        transcript.push(Turn::answer(
            Role::Synthesis,
            Phase::Synthesis,
            "## Executive Summary\nBalanced.",
        ));
        let report = assemble(ReportInputs {
            query: "q",
            transcript: &transcript,
            ledger: CitationLedger::new(),
            models: BTreeMap::new(),
            notes: vec!["budget".into()],
            usage: None,
        });

        assert_eq!(report.section(SectionKind::Summary).unwrap().body, "Balanced.");
        assert_eq!(report.section(SectionKind::Innovations).unwrap().body, "Good ideas");
        assert!(report
            .section(SectionKind::Critique)
            .unwrap()
            .body
            .contains("Critique Agent did not produce"));
        assert_eq!(report.metadata.analysis_turns, 1);
        assert_eq!(
            report.metadata.contributing_roles,
            vec!["Performance Analyst", "Synthesizer"]
        );
    }
}
