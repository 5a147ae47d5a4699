//! Static per-model price table and per-run cost estimates.
//!
//! Rates are USD per one million tokens as published by the gateway. They are
//! only used for estimates (`--cost`) and for the usage summary attached to a
//! report; nothing is billed from these numbers.

use crate::agents::Role;
use crate::utils::config::RunConfig;
use serde::Serialize;

/// Input/output price of one model, USD per 1M tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelRate {
    pub model: &'static str,
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub note: &'static str,
}

impl ModelRate {
    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        (prompt_tokens as f64 * self.input_per_million
            + completion_tokens as f64 * self.output_per_million)
            / 1_000_000.0
    }
}

pub const RATES: &[ModelRate] = &[
    ModelRate {
        model: "deepseek/deepseek-chat",
        input_per_million: 0.14,
        output_per_million: 0.28,
        note: "cheapest, strong analysis",
    },
    ModelRate {
        model: "google/gemini-flash-1.5",
        input_per_million: 0.075,
        output_per_million: 0.30,
        note: "fast, long context",
    },
    ModelRate {
        model: "anthropic/claude-3-haiku",
        input_per_million: 0.25,
        output_per_million: 1.25,
        note: "balanced",
    },
    ModelRate {
        model: "anthropic/claude-3.5-sonnet",
        input_per_million: 3.00,
        output_per_million: 15.00,
        note: "high quality, moderate cost",
    },
    ModelRate {
        model: "openai/gpt-4-turbo",
        input_per_million: 10.00,
        output_per_million: 30.00,
        note: "premium",
    },
];

pub fn rate_for(model: &str) -> Option<&'static ModelRate> {
    RATES.iter().find(|r| r.model == model)
}

/// Typical token volume of one role per run.
pub fn assumed_tokens(role: Role) -> (u64, u64) {
    match role {
        Role::Innovation | Role::Limitation => (5_000, 3_000),
        Role::Synthesis => (10_000, 4_000),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CostLine {
    pub role: Role,
    pub model: String,
    /// `None` when the model is not in the price table
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostEstimate {
    pub lines: Vec<CostLine>,
    /// Sum of the priced lines
    pub low: f64,
}

impl CostEstimate {
    /// Upper bound: long papers and verbose roles roughly double the volume.
    pub fn high(&self) -> f64 {
        self.low * 2.0
    }

    pub fn projected(&self, runs: u32) -> (f64, f64) {
        (self.low * runs as f64, self.high() * runs as f64)
    }

    pub fn unpriced(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| l.cost.is_none())
            .map(|l| l.model.as_str())
            .collect()
    }
}

/// Estimate the price of one run with the configured models.
pub fn estimate_run(config: &RunConfig) -> CostEstimate {
    let lines: Vec<CostLine> = Role::ALL
        .iter()
        .map(|role| {
            let model = config.model_for(*role).to_string();
            let (input, output) = assumed_tokens(*role);
            let cost = rate_for(&model).map(|r| r.cost(input, output));
            CostLine {
                role: *role,
                model,
                cost,
            }
        })
        .collect();

    let low = lines.iter().filter_map(|l| l.cost).sum();
    CostEstimate { lines, low }
}
