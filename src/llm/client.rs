//! LLM client abstractions
//!
//! Every role talks to the gateway through [`LLMClient`]. Clients are created
//! per role by an [`LLMClientFactory`] so that each role can be bound to its
//! own model and sampling parameters.

use crate::llm::usage::TokenUsage;
use crate::types::{Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Role of a chat message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in a chat completion request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    /// Tool calls made by the assistant in this message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Request this message answers (tool messages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn plain(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(MessageRole::Assistant, content)
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(MessageRole::Assistant, content)
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::plain(MessageRole::Tool, content)
        }
    }
}

/// Sampling parameters bound to a role
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub temperature: f32,
    /// Per-request timeout; exceeding it fails the completion
    pub timeout_secs: u64,
}

impl ModelParams {
    /// Analysis roles: more exploratory sampling.
    pub fn analysis() -> Self {
        Self {
            temperature: 0.7,
            timeout_secs: 120,
        }
    }

    /// Synthesis: steadier sampling and a longer window for the larger context.
    pub fn synthesis() -> Self {
        Self {
            temperature: 0.5,
            timeout_secs: 180,
        }
    }
}

/// Response from an LLM generation request
#[derive(Debug, Clone, Default)]
pub struct LLMResponse {
    /// The text content of the response
    pub content: String,
    /// Any tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// The reason generation stopped (e.g., "stop", "tool_calls", "length")
    pub finish_reason: String,
    /// Token usage, when the gateway reports it
    pub usage: Option<TokenUsage>,
    /// Gateway-assigned id of the completion, used to look up its billed cost
    pub generation_id: Option<String>,
}

/// Generic LLM client trait for provider abstraction
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Run one chat completion over the given history, offering `tools`.
    ///
    /// An empty tool slice means the model must answer in text.
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition])
        -> Result<LLMResponse>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Creates role-bound clients.
pub trait LLMClientFactory: Send + Sync {
    fn create(&self, model: &str, params: &ModelParams) -> Result<Arc<dyn LLMClient>>;
}

/// Connection settings of the OpenAI-compatible gateway
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub api_key: String,
    pub api_base: String,
}

/// Factory producing [`OpenAIClient`](super::openai::OpenAIClient)s against one gateway.
#[derive(Debug, Clone)]
pub struct GatewayClientFactory {
    gateway: GatewayConfig,
}

impl GatewayClientFactory {
    pub fn new(gateway: GatewayConfig) -> Self {
        Self { gateway }
    }
}

impl LLMClientFactory for GatewayClientFactory {
    fn create(&self, model: &str, params: &ModelParams) -> Result<Arc<dyn LLMClient>> {
        Ok(Arc::new(super::openai::OpenAIClient::new(
            &self.gateway,
            model,
            params.clone(),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_serialization() {
        let msg = ChatMessage::user("Hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"user\""));
        assert!(json.contains("Hello"));
        assert!(!json.contains("tool_calls"));
    }

    #[test]
    fn test_tool_result_message() {
        let msg = ChatMessage::tool_result("call_1", "{\"listing\":\"\"}");
        assert_eq!(msg.role, MessageRole::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_assistant_with_tools() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "search_arxiv".to_string(),
            arguments: json!({"query": "react"}),
        };
        let msg = ChatMessage::assistant_with_tools("", vec![call.clone()]);
        assert_eq!(msg.tool_calls, vec![call]);
    }

    #[test]
    fn test_role_params() {
        assert_eq!(ModelParams::analysis().timeout_secs, 120);
        assert_eq!(ModelParams::synthesis().temperature, 0.5);
    }

    #[test]
    fn test_factory_binds_model() {
        let factory = GatewayClientFactory::new(GatewayConfig {
            api_key: "sk-test".to_string(),
            api_base: "http://localhost:9".to_string(),
        });
        let client = factory
            .create("deepseek/deepseek-chat", &ModelParams::analysis())
            .unwrap();
        assert_eq!(client.model_name(), "deepseek/deepseek-chat");
    }
}
