//! OpenAI-compatible chat completions through `async-openai`.
//!
//! Works against OpenRouter (the default gateway) or any endpoint exposing
//! `POST {api_base}/chat/completions`.

use crate::llm::client::{
    ChatMessage, GatewayConfig, LLMClient, LLMResponse, MessageRole, ModelParams,
};
use crate::llm::usage::TokenUsage;
use crate::types::{AppError, Result, ToolCall, ToolDefinition};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessageArgs,
        ChatCompletionRequestUserMessage, ChatCompletionTool, ChatCompletionToolChoiceOption,
        ChatCompletionTools, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, FinishReason, FunctionCall, FunctionObject,
        ToolChoiceOptions,
    },
    Client,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("paper-panel/", env!("CARGO_PKG_VERSION"));

pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
    params: ModelParams,
}

impl OpenAIClient {
    pub fn new(gateway: &GatewayConfig, model: &str, params: ModelParams) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(params.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let config = OpenAIConfig::new()
            .with_api_key(gateway.api_key.as_str())
            .with_api_base(gateway.api_base.trim_end_matches('/'));

        Ok(Self {
            client: Client::with_config(config).with_http_client(http_client),
            model: model.to_string(),
            params,
        })
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<CreateChatCompletionRequest> {
        let messages = messages
            .iter()
            .map(request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(messages)
            .temperature(self.params.temperature);

        if !tools.is_empty() {
            let tools: Vec<ChatCompletionTools> = tools
                .iter()
                .map(|tool| {
                    ChatCompletionTools::Function(ChatCompletionTool {
                        function: FunctionObject {
                            name: tool.name.clone(),
                            description: Some(tool.description.clone()),
                            parameters: Some(tool.parameters.clone()),
                            strict: None,
                        },
                    })
                })
                .collect();
            args.tools(tools)
                .tool_choice(ChatCompletionToolChoiceOption::Mode(ToolChoiceOptions::Auto));
        }

        args.build().map_err(build_error)
    }

    fn completion_error(&self, err: OpenAIError) -> AppError {
        match err {
            OpenAIError::Reqwest(e) if e.is_timeout() => AppError::Completion(format!(
                "Request to {} timed out after {}s",
                self.model, self.params.timeout_secs
            )),
            OpenAIError::ApiError(api) => AppError::Completion(format!("Gateway error: {}", api)),
            // OpenRouter reports some failures as bodies the SDK cannot type
            OpenAIError::JSONDeserialize(_, content) => match gateway_error_message(&content) {
                Some(message) => AppError::Completion(format!("Gateway error: {}", message)),
                None => AppError::Completion(format!("Unexpected gateway response: {}", content)),
            },
            other => AppError::Completion(format!("Gateway request failed: {}", other)),
        }
    }
}

fn build_error(e: OpenAIError) -> AppError {
    AppError::Completion(format!("Failed to build request: {}", e))
}

fn request_message(msg: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let message: ChatCompletionRequestMessage = match msg.role {
        MessageRole::System => {
            ChatCompletionRequestSystemMessage::from(msg.content.as_str()).into()
        }
        MessageRole::User => ChatCompletionRequestUserMessage::from(msg.content.as_str()).into(),
        MessageRole::Assistant => {
            let mut args = ChatCompletionRequestAssistantMessageArgs::default();
            args.content(msg.content.as_str());
            if !msg.tool_calls.is_empty() {
                let calls: Vec<ChatCompletionMessageToolCalls> = msg
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        ChatCompletionMessageToolCalls::Function(ChatCompletionMessageToolCall {
                            id: tc.id.clone(),
                            function: FunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.to_string(),
                            },
                        })
                    })
                    .collect();
                args.tool_calls(calls);
            }
            args.build().map_err(build_error)?.into()
        }
        MessageRole::Tool => ChatCompletionRequestToolMessageArgs::default()
            .content(msg.content.as_str())
            .tool_call_id(msg.tool_call_id.clone().unwrap_or_default())
            .build()
            .map_err(build_error)?
            .into(),
    };
    Ok(message)
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn gateway_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
}

fn finish_reason_name(reason: FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop => "stop",
        FinishReason::Length => "length",
        FinishReason::ToolCalls => "tool_calls",
        FinishReason::ContentFilter => "content_filter",
        FinishReason::FunctionCall => "function_call",
    }
}

/// Map a typed completion onto the crate's response shape.
pub(crate) fn into_llm_response(response: CreateChatCompletionResponse) -> Result<LLMResponse> {
    let usage = response.usage.as_ref().map(|u| {
        TokenUsage::new(u64::from(u.prompt_tokens), u64::from(u.completion_tokens))
    });
    let generation_id = Some(response.id.clone()).filter(|id| !id.is_empty());

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Completion("No choices in gateway response".into()))?;

    let tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter_map(|call| match call {
            ChatCompletionMessageToolCalls::Function(call) => Some(ToolCall {
                id: call.id,
                name: call.function.name,
                // Arguments arrive as a JSON-encoded string
                arguments: serde_json::from_str(&call.function.arguments)
                    .unwrap_or_else(|_| serde_json::json!({})),
            }),
            ChatCompletionMessageToolCalls::Custom(_) => None,
        })
        .collect();

    let finish_reason = match choice.finish_reason {
        Some(reason) => finish_reason_name(reason),
        None if tool_calls.is_empty() => "stop",
        None => "tool_calls",
    }
    .to_string();

    Ok(LLMResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        finish_reason,
        usage,
        generation_id,
    })
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let request = self.build_request(messages, tools)?;

        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending chat completion"
        );

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| self.completion_error(e))?;

        into_llm_response(response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
