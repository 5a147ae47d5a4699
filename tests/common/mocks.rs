//! Mock implementations for testing.
//!
//! Scripted LLM clients, a factory handing them out by model name, and
//! notifiers that record or fail deliveries. Shared by the integration tests
//! so no test talks to a real gateway or SMTP server.

#![allow(dead_code)]

use async_trait::async_trait;
use paper_panel::llm::{ChatMessage, LLMClient, LLMClientFactory, LLMResponse, ModelParams, TokenUsage};
use paper_panel::notify::{DeliveryOutcome, Notifier};
use paper_panel::types::{AppError, Result, ToolCall, ToolDefinition};
use paper_panel::utils::config::RunConfig;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

pub const INNOVATION_MODEL: &str = "mock/innovation";
pub const LIMITATION_MODEL: &str = "mock/limitation";
pub const SYNTHESIS_MODEL: &str = "mock/synthesis";

/// A final answer with a little usage attached.
pub fn answer(content: &str) -> LLMResponse {
    LLMResponse {
        content: content.to_string(),
        tool_calls: vec![],
        finish_reason: "stop".to_string(),
        usage: Some(TokenUsage::new(100, 50)),
        generation_id: None,
    }
}

/// A tool request for `search_arxiv`.
pub fn search_request(id: &str, query: &str) -> LLMResponse {
    LLMResponse {
        content: String::new(),
        tool_calls: vec![ToolCall {
            id: id.to_string(),
            name: "search_arxiv".to_string(),
            arguments: json!({ "query": query, "max_results": 3 }),
        }],
        finish_reason: "tool_calls".to_string(),
        usage: Some(TokenUsage::new(80, 10)),
        generation_id: None,
    }
}

/// A tool request with several calls at once.
pub fn multi_request(calls: &[(&str, &str)]) -> LLMResponse {
    LLMResponse {
        content: "Searching arXiv".to_string(),
        tool_calls: calls
            .iter()
            .map(|(id, query)| ToolCall {
                id: id.to_string(),
                name: "search_arxiv".to_string(),
                arguments: json!({ "query": query }),
            })
            .collect(),
        finish_reason: "tool_calls".to_string(),
        usage: None,
        generation_id: None,
    }
}

/// One recorded call to a scripted client.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<ChatMessage>,
    pub tools_offered: usize,
}

/// LLM client that replays a script of responses.
///
/// Once the script runs out it keeps answering with `fallback`, so a
/// coordinator loop always terminates.
pub struct ScriptedLLMClient {
    model: String,
    script: Mutex<VecDeque<LLMResponse>>,
    fallback: String,
    calls: Mutex<Vec<RecordedCall>>,
    error: Option<String>,
    log: Option<Arc<Mutex<Vec<String>>>>,
}

impl ScriptedLLMClient {
    pub fn new(model: &str, script: Vec<LLMResponse>) -> Self {
        Self {
            model: model.to_string(),
            script: Mutex::new(script.into()),
            fallback: format!("Final answer from {}", model),
            calls: Mutex::new(vec![]),
            error: None,
            log: None,
        }
    }

    /// A client whose every call fails with a completion error.
    pub fn failing(model: &str, message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::new(model, vec![])
        }
    }

    /// Append the model name to `log` on every call.
    pub fn with_log(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl LLMClient for ScriptedLLMClient {
    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<LLMResponse> {
        self.calls.lock().push(RecordedCall {
            messages: messages.to_vec(),
            tools_offered: tools.len(),
        });
        if let Some(log) = &self.log {
            log.lock().push(self.model.clone());
        }
        if let Some(message) = &self.error {
            return Err(AppError::Completion(message.clone()));
        }
        Ok(self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| answer(&self.fallback)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Factory handing out pre-built clients by model name.
#[derive(Default)]
pub struct MockFactory {
    clients: HashMap<String, Arc<ScriptedLLMClient>>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, client: ScriptedLLMClient) -> Self {
        self.clients
            .insert(client.model_name().to_string(), Arc::new(client));
        self
    }

    /// The three roles with the given scripts.
    pub fn panel(
        innovation: Vec<LLMResponse>,
        limitation: Vec<LLMResponse>,
        synthesis: Vec<LLMResponse>,
    ) -> Self {
        Self::new()
            .with(ScriptedLLMClient::new(INNOVATION_MODEL, innovation))
            .with(ScriptedLLMClient::new(LIMITATION_MODEL, limitation))
            .with(ScriptedLLMClient::new(SYNTHESIS_MODEL, synthesis))
    }

    pub fn client(&self, model: &str) -> Arc<ScriptedLLMClient> {
        self.clients[model].clone()
    }
}

impl LLMClientFactory for MockFactory {
    fn create(&self, model: &str, _params: &ModelParams) -> Result<Arc<dyn LLMClient>> {
        self.clients
            .get(model)
            .cloned()
            .map(|c| c as Arc<dyn LLMClient>)
            .ok_or_else(|| AppError::Configuration(format!("no mock client for {}", model)))
    }
}

/// Records deliveries and reports them as delivered.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String, Option<String>)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        subject: &str,
        body: &str,
        recipient: Option<&str>,
    ) -> Result<DeliveryOutcome> {
        self.sent.lock().push((
            subject.to_string(),
            body.to_string(),
            recipient.map(str::to_string),
        ));
        Ok(DeliveryOutcome::Delivered {
            recipient: recipient.unwrap_or("nobody").to_string(),
        })
    }
}

/// Always fails to deliver.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _: &str, _: &str, _: Option<&str>) -> Result<DeliveryOutcome> {
        Err(AppError::Notification(
            "SMTP error: connection refused".to_string(),
        ))
    }
}

/// Run configuration pointing at mock models, `arxiv_base` and `output_dir`.
pub fn test_config(
    arxiv_base: &str,
    output_dir: &Path,
    extra: &[(&str, &str)],
) -> RunConfig {
    let mut vars: HashMap<String, String> = [
        ("OPENROUTER_API_KEY", "sk-test"),
        ("PERFORMANCE_ANALYST_MODEL", INNOVATION_MODEL),
        ("CRITIQUE_AGENT_MODEL", LIMITATION_MODEL),
        ("SYNTHESIZER_MODEL", SYNTHESIS_MODEL),
        ("ARXIV_API_BASE", arxiv_base),
        ("ARXIV_RETRY_ATTEMPTS", "0"),
        ("ARXIV_RETRY_DELAY_MS", "10"),
        ("ARXIV_TIMEOUT_SECS", "5"),
        ("EMAIL_TO", "team@example.com"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    vars.insert(
        "OUTPUT_DIR".to_string(),
        output_dir.to_string_lossy().into_owned(),
    );
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    RunConfig::from_lookup(|k| vars.get(k).cloned()).expect("test config")
}

/// Atom feed with one entry per `(id, title)`.
pub fn atom_feed(entries: &[(&str, &str)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query</title>
  <id>http://arxiv.org/api/test</id>
"#,
    );
    for (id, title) in entries {
        xml.push_str(&format!(
            r#"  <entry>
    <id>http://arxiv.org/abs/{id}</id>
    <updated>2023-03-10T01:00:32Z</updated>
    <published>2022-10-06T01:00:32Z</published>
    <title>{title}</title>
    <summary>Abstract of {title}.</summary>
    <author><name>Shunyu Yao</name></author>
    <author><name>Karthik Narasimhan</name></author>
    <link href="http://arxiv.org/abs/{id}" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/{id}" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
"#
        ));
    }
    xml.push_str("</feed>\n");
    xml
}
