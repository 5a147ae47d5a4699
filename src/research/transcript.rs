//! The shared, append-only conversation of one run.

use crate::agents::Role;
use crate::llm::ChatMessage;
use crate::types::ToolCall;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Phases of a run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Start,
    Analysis,
    Synthesis,
    Completion,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Start => "start",
            Phase::Analysis => "analysis",
            Phase::Synthesis => "synthesis",
            Phase::Completion => "completion",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Speaker {
    User,
    Role(Role),
    /// Result of a tool call made on behalf of `requested_by`
    Tool { tool: String, requested_by: Role },
}

#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub phase: Phase,
    pub content: String,
    /// Set on a role's tool request
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on a tool result; links back to the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn new(speaker: Speaker, phase: Phase, content: impl Into<String>) -> Self {
        Self {
            speaker,
            phase,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(query: &str) -> Self {
        Self::new(Speaker::User, Phase::Start, query)
    }

    /// A role's answer for `phase`
    pub fn answer(role: Role, phase: Phase, content: impl Into<String>) -> Self {
        Self::new(Speaker::Role(role), phase, content)
    }

    pub fn tool_request(role: Role, content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::new(Speaker::Role(role), Phase::Analysis, content)
        }
    }

    pub fn tool_result(call: &ToolCall, requested_by: Role, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call.id.clone()),
            ..Self::new(
                Speaker::Tool {
                    tool: call.name.clone(),
                    requested_by,
                },
                Phase::Analysis,
                content,
            )
        }
    }

    pub fn is_final_of(&self, role: Role) -> bool {
        self.speaker == Speaker::Role(role) && self.tool_calls.is_empty()
    }
}

/// Ordered turns of one run. Turns can be appended and read, never edited.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn count_in_phase(&self, phase: Phase) -> usize {
        self.turns.iter().filter(|t| t.phase == phase).count()
    }

    /// The last answer a role gave, if any.
    pub fn final_answer(&self, role: Role) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.is_final_of(role))
    }

    /// Roles that answered, in the order they first did so.
    pub fn contributing_roles(&self) -> Vec<Role> {
        let mut roles = Vec::new();
        for turn in &self.turns {
            if let Speaker::Role(role) = turn.speaker {
                if turn.tool_calls.is_empty() && !roles.contains(&role) {
                    roles.push(role);
                }
            }
        }
        roles
    }

    /// Chat history as seen by `role`.
    ///
    /// The role's own tool exchanges are replayed as assistant/tool messages.
    /// Other roles' answers arrive as attributed user messages; their tool
    /// results are only shown to the synthesis role.
    pub fn to_messages(&self, role: Role, system_prompt: &str) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(system_prompt)];

        for turn in &self.turns {
            match &turn.speaker {
                Speaker::User => {
                    messages.push(ChatMessage::user(format!(
                        "Research request: {}",
                        turn.content
                    )));
                }
                Speaker::Role(r) if *r == role => {
                    if turn.tool_calls.is_empty() {
                        messages.push(ChatMessage::assistant(&turn.content));
                    } else {
                        messages.push(ChatMessage::assistant_with_tools(
                            &turn.content,
                            turn.tool_calls.clone(),
                        ));
                    }
                }
                Speaker::Role(other) => {
                    if turn.tool_calls.is_empty() {
                        messages.push(ChatMessage::user(format!(
                            "[{}]\n{}",
                            other.display_name(),
                            turn.content
                        )));
                    }
                }
                Speaker::Tool { requested_by, .. } if *requested_by == role => {
                    messages.push(ChatMessage::tool_result(
                        turn.tool_call_id.clone().unwrap_or_default(),
                        &turn.content,
                    ));
                }
                Speaker::Tool { tool, requested_by } => {
                    if role == Role::Synthesis {
                        messages.push(ChatMessage::user(format!(
                            "[{} result for {}]\n{}",
                            tool,
                            requested_by.display_name(),
                            turn.content
                        )));
                    }
                }
            }
        }

        messages
    }
}
