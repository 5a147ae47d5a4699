//! # paper-panel
//!
//! A three-role research panel over arXiv. For one research query a
//! Performance Analyst argues the contributions of the work, a Critique Agent
//! argues its limitations, and a Synthesizer combines both into a balanced
//! assessment. The result is saved as a timestamped report and optionally
//! emailed.
//!
//! ## Overview
//!
//! paper-panel can be used in two ways:
//!
//! 1. **As a command-line tool** - Run the `paper-panel` binary
//! 2. **As a library** - Drive a [`ResearchCoordinator`] from your own code
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use paper_panel::{
//!     GatewayClientFactory, NoopNotifier, ResearchCoordinator, RunConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> paper_panel::Result<()> {
//!     let config = RunConfig::from_env()?;
//!     config.validate()?;
//!
//!     let factory = GatewayClientFactory::new(config.gateway()?);
//!     let notifier = Arc::new(NoopNotifier::new("library run"));
//!     let coordinator = ResearchCoordinator::new(&config, &factory, notifier)?;
//!
//!     let summary = coordinator.run("Analyze the ReAct framework").await?;
//!     println!("Report saved to {}", summary.path.display());
//!     Ok(())
//! }
//! ```
//!
//! ### Using the arXiv tools directly
//!
//! ```rust,ignore
//! use paper_panel::{ArxivClient, ToolRegistry};
//! use paper_panel::utils::config::SearchConfig;
//! use std::sync::Arc;
//!
//! let client = Arc::new(ArxivClient::new(SearchConfig::default())?);
//! let registry = ToolRegistry::with_arxiv_tools(client);
//!
//! // Definitions offered to the analysis roles for function calling
//! let tool_definitions = registry.get_tool_definitions();
//! ```
//!
//! ## Modules
//!
//! - [`agents`] - The three panel roles and their prompts
//! - [`cli`] - Command-line parsing and colored output
//! - [`llm`] - Chat-completion gateway client and usage accounting
//! - [`notify`] - Email delivery of finished reports
//! - [`research`] - Conversation orchestration and report assembly
//! - [`storage`] - Report rendering and persistence
//! - [`tools`] - arXiv search client and the tool registry
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration and pricing
//!
//! ## Architecture
//!
//! A run moves through four phases: **Start** records the query, **Analysis**
//! lets each analyst search arXiv and answer within a shared turn budget,
//! **Synthesis** combines the answers, and **Completion** assembles, saves and
//! delivers the report. Configuration is read once from the environment
//! (`.env` is honoured) and passed explicitly afterwards.

#![warn(rustdoc::missing_crate_level_docs)]

/// The three panel roles and their prompts.
pub mod agents;
/// Command-line interface.
pub mod cli;
/// LLM gateway client and usage accounting.
pub mod llm;
/// Report delivery by email.
pub mod notify;
/// Multi-role research coordination.
pub mod research;
/// Report rendering and persistence.
pub mod storage;
/// arXiv tools and registry.
pub mod tools;
/// Core types (papers, reports, errors).
pub mod types;
/// Configuration and pricing utilities.
pub mod utils;

// Re-export commonly used types
pub use agents::{Panel, Role, RoleAgent, Step};
pub use llm::{GatewayClientFactory, LLMClient, LLMClientFactory, LLMResponse, UsageSummary};
pub use notify::{DeliveryOutcome, NoopNotifier, Notifier, SmtpNotifier};
pub use research::{ResearchCoordinator, RunSummary};
pub use storage::{ReportFormat, ReportStore};
pub use tools::{ArxivClient, ToolRegistry};
pub use types::{AppError, PaperRecord, Report, Result};
pub use utils::config::RunConfig;
