//! Panel orchestration
//!
//! A run moves through four phases:
//!
//! 1. **Start** - the query is recorded as the first turn
//! 2. **Analysis** - the Performance Analyst, then the Critique Agent, each
//!    searching arXiv as needed within a shared turn budget
//! 3. **Synthesis** - the Synthesizer reads the whole transcript and writes
//!    the balanced report
//! 4. **Completion** - the report is assembled, saved and optionally emailed
//!
//! ```ignore
//! let config = RunConfig::from_env()?;
//! let factory = GatewayClientFactory::new(config.gateway()?);
//! let notifier = Arc::new(SmtpNotifier::new(config.smtp.clone()));
//! let coordinator = ResearchCoordinator::new(&config, &factory, notifier)?;
//!
//! let summary = coordinator.run("Analyze the ReAct framework").await?;
//! println!("Report saved to {}", summary.path.display());
//! ```

/// Phase-driven run orchestration.
pub mod coordinator;
/// Report assembly and the citation ledger.
pub mod report;
/// Append-only conversation transcript.
pub mod transcript;

pub use coordinator::{ResearchCoordinator, RunSummary};
pub use report::CitationLedger;
pub use transcript::{Phase, Speaker, Transcript, Turn};
