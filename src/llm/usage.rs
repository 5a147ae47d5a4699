//! Token accounting across the gateway calls of one run.

use crate::utils::pricing::rate_for;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Token counts reported by the gateway for a single completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub model: String,
    pub requests: u32,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost_usd: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub models: Vec<ModelUsage>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Sum over models with a known rate
    pub estimated_cost_usd: f64,
    /// Gateway ids of the completions, in call order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generation_ids: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counter {
    requests: u32,
    prompt: u64,
    completion: u64,
}

/// Aggregates usage per model. Shared by reference across the roles of a run.
#[derive(Debug, Default)]
pub struct UsageTracker {
    per_model: Mutex<BTreeMap<String, Counter>>,
    generation_ids: Mutex<Vec<String>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completion. Calls without usage data still count as requests.
    pub fn record(&self, model: &str, usage: Option<TokenUsage>, generation_id: Option<&str>) {
        {
            let mut map = self.per_model.lock();
            let entry = map.entry(model.to_string()).or_default();
            entry.requests += 1;
            if let Some(u) = usage {
                entry.prompt += u.prompt_tokens;
                entry.completion += u.completion_tokens;
            }
        }
        if let Some(id) = generation_id {
            self.generation_ids.lock().push(id.to_string());
        }
    }

    pub fn summary(&self) -> UsageSummary {
        let map = self.per_model.lock();
        let models: Vec<ModelUsage> = map
            .iter()
            .map(|(model, c)| ModelUsage {
                model: model.clone(),
                requests: c.requests,
                prompt_tokens: c.prompt,
                completion_tokens: c.completion,
                estimated_cost_usd: rate_for(model).map(|r| r.cost(c.prompt, c.completion)),
            })
            .collect();

        UsageSummary {
            prompt_tokens: models.iter().map(|m| m.prompt_tokens).sum(),
            completion_tokens: models.iter().map(|m| m.completion_tokens).sum(),
            estimated_cost_usd: models.iter().filter_map(|m| m.estimated_cost_usd).sum(),
            generation_ids: self.generation_ids.lock().clone(),
            models,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_aggregates_per_model() {
        let tracker = UsageTracker::new();
        tracker.record(
            "deepseek/deepseek-chat",
            Some(TokenUsage::new(1_000, 500)),
            Some("gen-1"),
        );
        tracker.record(
            "deepseek/deepseek-chat",
            Some(TokenUsage::new(2_000, 500)),
            Some("gen-2"),
        );
        tracker.record("google/gemini-flash-1.5", None, None);

        let summary = tracker.summary();
        assert_eq!(summary.models.len(), 2);
        assert_eq!(summary.prompt_tokens, 3_000);
        assert_eq!(summary.completion_tokens, 1_000);

        let deepseek = &summary.models[0];
        assert_eq!(deepseek.requests, 2);
        let expected = (3_000.0 * 0.14 + 1_000.0 * 0.28) / 1_000_000.0;
        assert!((deepseek.estimated_cost_usd.unwrap() - expected).abs() < 1e-12);
        assert_eq!(summary.models[1].requests, 1);
        assert_eq!(summary.generation_ids, vec!["gen-1", "gen-2"]);
    }

    #[test]
    fn test_unpriced_model_has_no_cost() {
        let tracker = UsageTracker::new();
        tracker.record("local/model", Some(TokenUsage::new(10, 10)), None);
        let summary = tracker.summary();
        assert!(summary.models[0].estimated_cost_usd.is_none());
        assert_eq!(summary.estimated_cost_usd, 0.0);
    }
}
