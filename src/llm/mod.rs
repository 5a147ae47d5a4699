//! LLM gateway clients
//!
//! - [`LLMClient`] - the trait every role calls through
//! - [`LLMClientFactory`] - builds one client per role (model + sampling params)
//! - [`OpenAIClient`] - OpenAI-compatible chat completions (OpenRouter by default)
//! - [`UsageTracker`] - token accounting for the run
//! - [`BillingClient`] - charged cost and credits from the gateway

/// Gateway accounting endpoints.
pub mod billing;
/// Core LLM client trait, chat messages and the client factory.
pub mod client;
/// OpenAI-compatible client over `async-openai`.
pub mod openai;
/// Token usage aggregation.
pub mod usage;

pub use billing::{AccountCredits, ActualCost, BillingClient, GenerationCost};
pub use client::{
    ChatMessage, GatewayClientFactory, GatewayConfig, LLMClient, LLMClientFactory, LLMResponse,
    MessageRole, ModelParams,
};
pub use openai::OpenAIClient;
pub use usage::{TokenUsage, UsageSummary, UsageTracker};
