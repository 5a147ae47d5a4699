//! Tools the analysis roles can call
//!
//! - [`arxiv`](crate::tools::arxiv) - arXiv client, Atom parsing and the three search tools
//! - [`registry`](crate::tools::registry) - tool registration, definitions and dispatch
//!
//! ```ignore
//! let client = Arc::new(ArxivClient::new(config.search.clone())?);
//! let registry = ToolRegistry::with_arxiv_tools(client);
//! let result = registry.execute("search_arxiv", json!({"query": "ReAct"})).await?;
//! println!("{}", result["listing"]);
//! ```

/// arXiv search client and tool adapters.
pub mod arxiv;
/// Tool registry for managing available tools.
pub mod registry;

pub use arxiv::{ArxivClient, PaperLookup, SearchOutcome};
pub use registry::{Tool, ToolRegistry};
