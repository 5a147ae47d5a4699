use crate::{
    agents::{Panel, Role, Step},
    llm::{LLMClientFactory, UsageSummary, UsageTracker},
    notify::{DeliveryOutcome, Notifier},
    research::{
        report::{self, CitationLedger, ReportInputs},
        transcript::{Phase, Transcript, Turn},
    },
    storage::{render::render_markdown, ReportFormat, ReportStore},
    tools::{arxiv::papers_in_payload, ArxivClient, ToolRegistry},
    types::{AppError, Report, Result, ToolCall, ToolDefinition},
    utils::config::RunConfig,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// A tool request costs one turn for the request and one per result, and the
/// role still needs a turn to answer afterwards.
const MIN_SLOTS_FOR_TOOLS: usize = 3;

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: Report,
    pub path: PathBuf,
    /// `None` when delivery was attempted and failed (see `warnings`)
    pub delivery: Option<DeliveryOutcome>,
    pub warnings: Vec<String>,
    pub usage: UsageSummary,
    pub transcript_turns: usize,
}

/// Drives one query through Start, Analysis, Synthesis and Completion.
pub struct ResearchCoordinator {
    panel: Panel,
    tools: ToolRegistry,
    store: ReportStore,
    notifier: Arc<dyn Notifier>,
    format: ReportFormat,
    max_turns: usize,
    email_to: Option<String>,
    models: BTreeMap<String, String>,
    usage: Arc<UsageTracker>,
}

impl ResearchCoordinator {
    pub fn new(
        config: &RunConfig,
        factory: &dyn LLMClientFactory,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let usage = Arc::new(UsageTracker::new());
        let panel = Panel::new(config, factory, usage.clone())?;
        let arxiv = Arc::new(ArxivClient::new(config.search.clone())?);

        let models = Role::ALL
            .iter()
            .map(|r| (r.display_name().to_string(), config.model_for(*r).to_string()))
            .collect();

        Ok(Self {
            panel,
            tools: ToolRegistry::with_arxiv_tools(arxiv),
            store: ReportStore::new(&config.output_dir),
            notifier,
            format: config.report_format,
            max_turns: config.max_turns,
            email_to: config.email_to.clone(),
            models,
            usage,
        })
    }

    /// Run the panel on `query` and persist the report.
    ///
    /// Fails on completion and storage errors; search and delivery problems
    /// only add warnings.
    pub async fn run(&self, query: &str) -> Result<RunSummary> {
        let mut transcript = Transcript::new();
        let mut ledger = CitationLedger::new();
        let mut notes = Vec::new();

        // Start
        tracing::info!(phase = %Phase::Start, "Research query: {}", query);
        transcript.push(Turn::user(query));

        // Analysis
        tracing::info!(
            phase = %Phase::Analysis,
            "Analysis phase, budget {} turns",
            self.max_turns
        );
        let mut used = 0;
        for (i, role) in Role::ANALYSTS.iter().enumerate() {
            // Keep one slot for each analyst still waiting to speak
            let reserve = Role::ANALYSTS.len() - i - 1;
            let available = self.max_turns.saturating_sub(used + reserve);
            if available == 0 {
                let note = format!(
                    "Turn budget of {} exhausted before the {} could answer",
                    self.max_turns,
                    role.display_name()
                );
                tracing::warn!("{}", note);
                notes.push(note);
                continue;
            }
            used += self
                .analyse(*role, available, &mut transcript, &mut ledger, &mut notes)
                .await?;
        }

        // Synthesis
        tracing::info!(
            phase = %Phase::Synthesis,
            "Synthesis over {} turns and {} paper(s)",
            transcript.len(),
            ledger.len()
        );
        let synthesis = self.panel.agent(Role::Synthesis).answer(&transcript).await?;
        transcript.push(Turn::answer(Role::Synthesis, Phase::Synthesis, synthesis));

        // Completion
        tracing::info!(phase = %Phase::Completion, "Assembling report");
        let usage = self.usage.summary();
        let report = report::assemble(ReportInputs {
            query,
            transcript: &transcript,
            ledger,
            models: self.models.clone(),
            notes: notes.clone(),
            usage: Some(usage.clone()),
        });

        let path = self.store.save(&report, self.format).await?;

        let mut warnings = notes;
        let subject = format!("Research Analysis: {}", query);
        let delivery = match self
            .notifier
            .send(&subject, &render_markdown(&report), self.email_to.as_deref())
            .await
        {
            Ok(outcome) => {
                if let DeliveryOutcome::Skipped { reason } = &outcome {
                    tracing::info!("Email delivery skipped: {}", reason);
                }
                Some(outcome)
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!("Report saved but not delivered: {}", e);
                warnings.push(e.to_string());
                None
            }
        };

        Ok(RunSummary {
            report,
            path,
            delivery,
            warnings,
            usage,
            transcript_turns: transcript.len(),
        })
    }

    /// Step `role` until it answers or its `available` turns run out.
    /// Returns the number of turns appended.
    async fn analyse(
        &self,
        role: Role,
        available: usize,
        transcript: &mut Transcript,
        ledger: &mut CitationLedger,
        notes: &mut Vec<String>,
    ) -> Result<usize> {
        let agent = self.panel.agent(role);
        let definitions = self.tools.get_tool_definitions();
        let mut used = 0;
        let mut round = 0;

        loop {
            round += 1;
            let remaining = available - used;
            let offered: &[ToolDefinition] = if remaining >= MIN_SLOTS_FOR_TOOLS {
                &definitions[..]
            } else {
                &[]
            };
            tracing::info!(
                "{} round {} ({} turn(s) left{})",
                role.display_name(),
                round,
                remaining,
                if offered.is_empty() { ", answering without tools" } else { "" }
            );

            match agent.step(transcript, offered).await? {
                Step::Final(text) => {
                    transcript.push(Turn::answer(role, Phase::Analysis, text));
                    return Ok(used + 1);
                }
                Step::ToolRequest { content, mut calls } => {
                    // Room for the request, the results and the answer
                    let max_calls = remaining - 2;
                    if calls.len() > max_calls {
                        tracing::debug!(
                            "Dropping {} tool call(s) from {} to stay within budget",
                            calls.len() - max_calls,
                            role.display_name()
                        );
                        calls.truncate(max_calls);
                    }
                    transcript.push(Turn::tool_request(role, content, calls.clone()));
                    used += 1;

                    for call in &calls {
                        let result = self.resolve(role, call, ledger, notes).await?;
                        transcript.push(Turn::tool_result(call, role, result));
                        used += 1;
                    }
                }
            }
        }
    }

    /// Run one tool call and render its result for the transcript.
    ///
    /// Non-fatal tool errors become the result text; fatal ones end the run.
    async fn resolve(
        &self,
        role: Role,
        call: &ToolCall,
        ledger: &mut CitationLedger,
        notes: &mut Vec<String>,
    ) -> Result<String> {
        tracing::info!("{} calls {}({})", role.display_name(), call.name, call.arguments);
        match self.tools.execute(&call.name, call.arguments.clone()).await {
            Ok(payload) => {
                let added = ledger.record(papers_in_payload(&payload));
                if let Some(diagnostic) = payload.get("diagnostic").and_then(Value::as_str) {
                    let problem = AppError::Search(format!(
                        "{} for the {} returned no papers: {}",
                        call.name,
                        role.display_name(),
                        diagnostic
                    ));
                    tracing::warn!("{}", problem);
                    notes.push(problem.to_string());
                }
                tracing::debug!("{} new paper(s) recorded", added);
                Ok(payload
                    .get("listing")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| payload.to_string()))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!("Tool {} failed for {}: {}", call.name, role.display_name(), e);
                Ok(format!("Error: {}", e))
            }
        }
    }
}
