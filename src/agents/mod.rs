//! The three panel roles
//!
//! Roles are a closed set sequenced by the
//! [`ResearchCoordinator`](crate::research::ResearchCoordinator): the
//! Performance Analyst (innovations) speaks first, the Critique Agent
//! (limitations) second, and the Synthesizer closes the run.

pub mod prompts;

use crate::llm::{LLMClient, LLMClientFactory, LLMResponse, ModelParams, UsageTracker};
use crate::research::transcript::Transcript;
use crate::types::{Result, SectionKind, ToolCall, ToolDefinition};
use crate::utils::config::RunConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Innovations and contributions
    Innovation,
    /// Limitations and risks
    Limitation,
    Synthesis,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Innovation, Role::Limitation, Role::Synthesis];
    /// Roles of the analysis phase, in speaking order
    pub const ANALYSTS: [Role; 2] = [Role::Innovation, Role::Limitation];

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Innovation => "Performance Analyst",
            Role::Limitation => "Critique Agent",
            Role::Synthesis => "Synthesizer",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            Role::Innovation => prompts::PERFORMANCE_ANALYST,
            Role::Limitation => prompts::CRITIQUE_AGENT,
            Role::Synthesis => prompts::SYNTHESIZER,
        }
    }

    pub fn params(&self) -> ModelParams {
        match self {
            Role::Innovation | Role::Limitation => ModelParams::analysis(),
            Role::Synthesis => ModelParams::synthesis(),
        }
    }

    /// Report section written from this role's final turn
    pub fn section(&self) -> SectionKind {
        match self {
            Role::Innovation => SectionKind::Innovations,
            Role::Limitation => SectionKind::Critique,
            Role::Synthesis => SectionKind::Synthesis,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Outcome of one generation step of a role
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The role's answer for this phase
    Final(String),
    /// The role wants tool results before answering
    ToolRequest { content: String, calls: Vec<ToolCall> },
}

/// A role bound to its model client and prompt
pub struct RoleAgent {
    role: Role,
    llm: Arc<dyn LLMClient>,
    usage: Arc<UsageTracker>,
}

impl RoleAgent {
    pub fn new(role: Role, llm: Arc<dyn LLMClient>, usage: Arc<UsageTracker>) -> Self {
        Self { role, llm, usage }
    }

    async fn complete(
        &self,
        transcript: &Transcript,
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let messages = transcript.to_messages(self.role, self.role.system_prompt());
        let response = self.llm.chat(&messages, tools).await?;
        self.usage.record(
            self.llm.model_name(),
            response.usage,
            response.generation_id.as_deref(),
        );

        tracing::debug!(
            role = %self.role,
            finish_reason = %response.finish_reason,
            tool_calls = response.tool_calls.len(),
            "Role step complete"
        );
        Ok(response)
    }

    /// Generate the role's next turn from the transcript so far.
    ///
    /// With no tools offered the answer is always final, even if the model
    /// tries to call a tool anyway.
    pub async fn step(&self, transcript: &Transcript, tools: &[ToolDefinition]) -> Result<Step> {
        let response = self.complete(transcript, tools).await?;

        if tools.is_empty() || response.tool_calls.is_empty() {
            Ok(Step::Final(response.content))
        } else {
            Ok(Step::ToolRequest {
                content: response.content,
                calls: response.tool_calls,
            })
        }
    }

    /// Generate a text-only answer; no tools are offered.
    pub async fn answer(&self, transcript: &Transcript) -> Result<String> {
        Ok(self.complete(transcript, &[]).await?.content)
    }
}

/// The three role agents of one run
pub struct Panel {
    innovation: RoleAgent,
    limitation: RoleAgent,
    synthesis: RoleAgent,
}

impl Panel {
    pub fn new(
        config: &RunConfig,
        factory: &dyn LLMClientFactory,
        usage: Arc<UsageTracker>,
    ) -> Result<Self> {
        let build = |role: Role| -> Result<RoleAgent> {
            let llm = factory.create(config.model_for(role), &role.params())?;
            Ok(RoleAgent::new(role, llm, usage.clone()))
        };
        Ok(Self {
            innovation: build(Role::Innovation)?,
            limitation: build(Role::Limitation)?,
            synthesis: build(Role::Synthesis)?,
        })
    }

    pub fn agent(&self, role: Role) -> &RoleAgent {
        match role {
            Role::Innovation => &self.innovation,
            Role::Limitation => &self.limitation,
            Role::Synthesis => &self.synthesis,
        }
    }
}
