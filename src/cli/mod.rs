//! CLI module for paper-panel
//!
//! Provides command-line interface parsing for the `paper-panel` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use crate::storage::ReportFormat;
use clap::Parser;
use std::path::PathBuf;

/// paper-panel - a three-role research panel over arXiv
///
/// A Performance Analyst, a Critique Agent and a Synthesizer discuss the
/// papers behind a research query and produce a timestamped report.
#[derive(Parser, Debug)]
#[command(
    name = "paper-panel",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "Research panel over arXiv: innovations, critique and synthesis",
    long_about = "Runs a three-role research panel over arXiv for one query.\n\n\
                  The Performance Analyst and the Critique Agent search arXiv and analyse\n\
                  the papers they find; the Synthesizer combines both views. The report is\n\
                  saved under OUTPUT_DIR and emailed when SMTP is configured.",
    after_help = "EXAMPLES:\n    \
                  paper-panel \"Analyze the ReAct framework\"\n    \
                  paper-panel -f json -t 10 \"Chain-of-thought prompting\"\n    \
                  paper-panel --status          # Check the configuration\n    \
                  paper-panel --cost            # Estimate the price of one run"
)]
pub struct Cli {
    /// Research query to analyse
    #[arg(value_name = "QUERY")]
    pub query: Option<String>,

    /// Print configuration status and exit
    #[arg(long, conflicts_with = "cost")]
    pub status: bool,

    /// Print the estimated cost of one run and exit
    #[arg(long)]
    pub cost: bool,

    /// Report format (txt, md or json); overrides REPORT_FORMAT
    #[arg(short, long, value_name = "FMT")]
    pub format: Option<ReportFormat>,

    /// Turn budget for the analysis phase; overrides MAX_TURNS
    #[arg(short = 't', long, value_name = "N")]
    pub max_turns: Option<usize>,

    /// Report directory; overrides OUTPUT_DIR
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Do not email the report even when SMTP is configured
    #[arg(long)]
    pub no_email: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
