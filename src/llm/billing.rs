//! Billed cost and account balance from the gateway's accounting endpoints.
//!
//! OpenRouter reports the charged cost of each completion under
//! `GET {api_base}/generation?id=<id>` and the account balance under
//! `GET {api_base}/credits`. Both wrap their payload in a `data` object.
//! Lookups are advisory: callers surface a failure as a warning.

use crate::llm::client::GatewayConfig;
use crate::types::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("paper-panel/", env!("CARGO_PKG_VERSION"));
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Charged cost of one completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationCost {
    pub id: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub tokens_prompt: u64,
    #[serde(default)]
    pub tokens_completion: u64,
}

/// Charged cost of a run, summed over the completions that could be looked up
#[derive(Debug, Clone, PartialEq)]
pub struct ActualCost {
    pub generations: Vec<GenerationCost>,
    pub total_usd: f64,
    /// Completions whose cost the gateway did not return
    pub unresolved: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AccountCredits {
    pub total_credits: f64,
    pub total_usage: f64,
}

impl AccountCredits {
    pub fn remaining(&self) -> f64 {
        self.total_credits - self.total_usage
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

pub struct BillingClient {
    http_client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl BillingClient {
    /// Needs the gateway key; accounting endpoints reject anonymous calls.
    pub fn new(gateway: &GatewayConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: gateway.api_key.clone(),
            api_base: gateway.api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.api_base, endpoint);
        let response = self
            .http_client
            .get(&url)
            .query(query)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AppError::Billing(format!("{} request failed: {}", endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Billing(format!(
                "{} lookup returned {}",
                endpoint, status
            )));
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            AppError::Billing(format!("Unexpected {} response: {}", endpoint, e))
        })?;
        Ok(envelope.data)
    }

    pub async fn generation(&self, id: &str) -> Result<GenerationCost> {
        self.fetch("generation", &[("id", id)]).await
    }

    /// Sum the charged cost of `ids`. Completions the gateway cannot find are
    /// counted as unresolved; it is an error only if none resolve.
    pub async fn actual_cost(&self, ids: &[String]) -> Result<ActualCost> {
        let mut generations = Vec::with_capacity(ids.len());
        let mut unresolved = 0;

        for id in ids {
            match self.generation(id).await {
                Ok(generation) => generations.push(generation),
                Err(e) => {
                    tracing::warn!("Could not look up cost of generation {}: {}", id, e);
                    unresolved += 1;
                }
            }
        }

        if generations.is_empty() {
            return Err(AppError::Billing(format!(
                "no cost data for any of {} generation(s)",
                ids.len()
            )));
        }

        Ok(ActualCost {
            total_usd: generations.iter().map(|g| g.total_cost).sum(),
            generations,
            unresolved,
        })
    }

    pub async fn credits(&self) -> Result<AccountCredits> {
        self.fetch("credits", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_payload_defaults() {
        let envelope: Envelope<GenerationCost> =
            serde_json::from_str(r#"{"data": {"id": "gen-1", "total_cost": 0.0021}}"#).unwrap();
        assert_eq!(envelope.data.id, "gen-1");
        assert_eq!(envelope.data.total_cost, 0.0021);
        assert_eq!(envelope.data.tokens_prompt, 0);
        assert!(envelope.data.model.is_none());
    }

    #[test]
    fn test_remaining_credits() {
        let credits = AccountCredits {
            total_credits: 10.0,
            total_usage: 2.5,
        };
        assert_eq!(credits.remaining(), 7.5);
    }
}
