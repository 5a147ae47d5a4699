/// Run configuration loaded from the environment.
pub mod config;
/// Static price table and run cost estimates.
pub mod pricing;
