//! Run configuration
//!
//! Everything the panel needs is read once at startup from the process
//! environment (after `.env` has been loaded by `dotenvy`) and then passed by
//! reference. Nothing reads the environment after [`RunConfig::from_env`].

use crate::agents::Role;
use crate::llm::GatewayConfig;
use crate::notify::SmtpConfig;
use crate::storage::ReportFormat;
use crate::types::{AppError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_ARXIV_API: &str = "http://export.arxiv.org/api/query";
pub const DEFAULT_INNOVATION_MODEL: &str = "deepseek/deepseek-chat";
pub const DEFAULT_LIMITATION_MODEL: &str = "deepseek/deepseek-chat";
pub const DEFAULT_SYNTHESIS_MODEL: &str = "google/gemini-flash-1.5";
pub const DEFAULT_MAX_TURNS: usize = 20;
pub const DEFAULT_OUTPUT_DIR: &str = "outputs/reports";
/// arXiv refuses larger pages for interactive use; anything above is clamped.
pub const ARXIV_HARD_CAP: usize = 50;

/// Settings of the arXiv search client
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub api_base: String,
    /// Upper bound for `max_results` on any single query
    pub max_results: usize,
    pub timeout: Duration,
    /// Extra attempts after a timeout or connection failure
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_ARXIV_API.to_string(),
            max_results: 10,
            timeout: Duration::from_secs(30),
            retry_attempts: 2,
            retry_delay: Duration::from_millis(3000),
        }
    }
}

/// Model identifier bound to each role
#[derive(Debug, Clone, PartialEq)]
pub struct RoleModels {
    pub innovation: String,
    pub limitation: String,
    pub synthesis: String,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Gateway key; required for a run but not for `--status`/`--cost`
    pub api_key: Option<String>,
    pub api_base: String,
    pub models: RoleModels,
    /// Turn budget of the analysis phase
    pub max_turns: usize,
    pub output_dir: PathBuf,
    pub report_format: ReportFormat,
    pub search: SearchConfig,
    /// Complete SMTP settings, or `None` when any required variable is missing
    pub smtp: Option<SmtpConfig>,
    pub email_to: Option<String>,
    /// Required SMTP variables that are unset; lets `--status` explain a partial setup
    pub smtp_missing: Vec<&'static str>,
}

impl RunConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let report_format = match get("REPORT_FORMAT") {
            Some(raw) => raw.parse::<ReportFormat>()?,
            None => ReportFormat::RichDocument,
        };

        let max_results: usize = parse_var(&get, "ARXIV_MAX_RESULTS", 10)?;
        if max_results == 0 {
            return Err(AppError::Configuration(
                "ARXIV_MAX_RESULTS must be at least 1".to_string(),
            ));
        }
        if max_results > ARXIV_HARD_CAP {
            tracing::warn!(
                "ARXIV_MAX_RESULTS={} exceeds the cap, using {}",
                max_results,
                ARXIV_HARD_CAP
            );
        }

        let search = SearchConfig {
            api_base: get("ARXIV_API_BASE").unwrap_or_else(|| DEFAULT_ARXIV_API.to_string()),
            max_results: max_results.min(ARXIV_HARD_CAP),
            timeout: Duration::from_secs(parse_var(&get, "ARXIV_TIMEOUT_SECS", 30)?),
            retry_attempts: parse_var(&get, "ARXIV_RETRY_ATTEMPTS", 2)?,
            retry_delay: Duration::from_millis(parse_var(&get, "ARXIV_RETRY_DELAY_MS", 3000)?),
        };

        let smtp_timeout = Duration::from_secs(parse_var(&get, "SMTP_TIMEOUT_SECS", 30)?);
        let smtp_port: u16 = parse_var(&get, "SMTP_PORT", 587)?;
        let smtp_missing: Vec<&'static str> =
            ["SMTP_SERVER", "SMTP_USERNAME", "SMTP_PASSWORD", "EMAIL_FROM"]
                .into_iter()
                .filter(|k| get(*k).is_none())
                .collect();
        let smtp = match (
            get("SMTP_SERVER"),
            get("SMTP_USERNAME"),
            get("SMTP_PASSWORD"),
            get("EMAIL_FROM"),
        ) {
            (Some(server), Some(username), Some(password), Some(from)) => Some(SmtpConfig {
                server,
                port: smtp_port,
                username,
                password,
                from,
                timeout: smtp_timeout,
            }),
            _ => None,
        };

        Ok(Self {
            api_key: get("OPENROUTER_API_KEY"),
            api_base: get("LLM_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            models: RoleModels {
                innovation: get("PERFORMANCE_ANALYST_MODEL")
                    .unwrap_or_else(|| DEFAULT_INNOVATION_MODEL.to_string()),
                limitation: get("CRITIQUE_AGENT_MODEL")
                    .unwrap_or_else(|| DEFAULT_LIMITATION_MODEL.to_string()),
                synthesis: get("SYNTHESIZER_MODEL")
                    .unwrap_or_else(|| DEFAULT_SYNTHESIS_MODEL.to_string()),
            },
            max_turns: parse_var(&get, "MAX_TURNS", DEFAULT_MAX_TURNS)?,
            output_dir: PathBuf::from(
                get("OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
            ),
            report_format,
            search,
            smtp,
            email_to: get("EMAIL_TO"),
            smtp_missing,
        })
    }

    pub fn model_for(&self, role: Role) -> &str {
        match role {
            Role::Innovation => &self.models.innovation,
            Role::Limitation => &self.models.limitation,
            Role::Synthesis => &self.models.synthesis,
        }
    }

    /// Gateway settings; fails when the API key is missing.
    pub fn gateway(&self) -> Result<GatewayConfig> {
        let api_key = self.api_key.clone().ok_or_else(|| {
            AppError::Configuration(
                "OPENROUTER_API_KEY is not set (add it to .env or the environment)".to_string(),
            )
        })?;
        Ok(GatewayConfig {
            api_key,
            api_base: self.api_base.clone(),
        })
    }

    /// Check everything a run needs before any network call is made.
    pub fn validate(&self) -> Result<()> {
        self.gateway()?;
        if self.max_turns < 2 {
            return Err(AppError::Configuration(format!(
                "MAX_TURNS must be at least 2 (one answer per analysis role), got {}",
                self.max_turns
            )));
        }
        Ok(())
    }

    pub fn status(&self) -> ConfigStatus {
        let mut entries = vec![
            StatusEntry::new(
                "OPENROUTER_API_KEY",
                if self.api_key.is_some() { "set" } else { "missing" },
                self.api_key.is_some(),
            ),
            StatusEntry::new("Gateway", &self.api_base, true),
        ];
        for role in Role::ALL {
            entries.push(StatusEntry::new(role.display_name(), self.model_for(role), true));
        }
        entries.push(StatusEntry::new(
            "Turn budget",
            &self.max_turns.to_string(),
            self.max_turns >= 2,
        ));
        entries.push(StatusEntry::new(
            "Output",
            &format!(
                "{} ({})",
                self.output_dir.display(),
                self.report_format.extension()
            ),
            true,
        ));
        entries.push(StatusEntry::new(
            "arXiv",
            &format!(
                "{} (max {} results)",
                self.search.api_base, self.search.max_results
            ),
            true,
        ));

        let email = match (&self.smtp, &self.email_to) {
            (Some(smtp), Some(to)) => format!("{} via {}:{}", to, smtp.server, smtp.port),
            (Some(_), None) => "configured, EMAIL_TO not set (delivery skipped)".to_string(),
            (None, _) if self.smtp_missing.len() == 4 => "not configured".to_string(),
            (None, _) => format!("incomplete, missing {}", self.smtp_missing.join(", ")),
        };
        // Email is optional, so it never makes the configuration invalid
        entries.push(StatusEntry::new("Email", &email, true));

        let problems = match self.validate() {
            Ok(()) => vec![],
            Err(e) => vec![e.to_string()],
        };

        ConfigStatus { entries, problems }
    }
}

fn parse_var<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse::<T>().map_err(|_| {
            AppError::Configuration(format!("{} has an invalid value: '{}'", key, raw))
        }),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusEntry {
    pub label: String,
    pub value: String,
    pub ok: bool,
}

impl StatusEntry {
    fn new(label: &str, value: &str, ok: bool) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
            ok,
        }
    }
}

/// Human-readable configuration report for `--status`
#[derive(Debug, Clone)]
pub struct ConfigStatus {
    pub entries: Vec<StatusEntry>,
    pub problems: Vec<String>,
}

impl ConfigStatus {
    /// Status of an environment that could not be read at all.
    pub fn unloadable(error: &AppError) -> Self {
        Self {
            entries: vec![],
            problems: vec![error.to_string()],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<RunConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RunConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("OPENROUTER_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.model_for(Role::Innovation), "deepseek/deepseek-chat");
        assert_eq!(config.model_for(Role::Synthesis), "google/gemini-flash-1.5");
        assert_eq!(config.max_turns, 20);
        assert_eq!(config.report_format, ReportFormat::RichDocument);
        assert_eq!(config.search, SearchConfig::default());
        assert!(config.smtp.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let config = load(&[]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert_eq!(err.exit_code(), 2);
        assert!(!config.status().is_valid());
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let config = load(&[("OPENROUTER_API_KEY", "   ")]).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_invalid_number() {
        let err = load(&[("MAX_TURNS", "many")]).unwrap_err();
        assert!(err.to_string().contains("MAX_TURNS"));
    }

    #[test]
    fn test_unloadable_status_is_invalid() {
        let err = load(&[("OPENROUTER_API_KEY", "k"), ("MAX_TURNS", "abc")]).unwrap_err();
        let status = ConfigStatus::unloadable(&err);
        assert!(!status.is_valid());
        assert_eq!(
            status.problems,
            vec!["Configuration error: MAX_TURNS has an invalid value: 'abc'"]
        );
    }

    #[test]
    fn test_max_results_clamped() {
        let config = load(&[("ARXIV_MAX_RESULTS", "500")]).unwrap();
        assert_eq!(config.search.max_results, ARXIV_HARD_CAP);
        assert!(load(&[("ARXIV_MAX_RESULTS", "0")]).is_err());
    }

    #[test]
    fn test_unknown_report_format() {
        let err = load(&[("REPORT_FORMAT", "pdf")]).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_smtp_requires_all_fields() {
        let partial = load(&[("SMTP_SERVER", "smtp.example.com")]).unwrap();
        assert!(partial.smtp.is_none());
        assert_eq!(partial.smtp_missing.len(), 3);

        let full = load(&[
            ("SMTP_SERVER", "smtp.example.com"),
            ("SMTP_USERNAME", "bot"),
            ("SMTP_PASSWORD", "secret"),
            ("EMAIL_FROM", "bot@example.com"),
            ("EMAIL_TO", "me@example.com"),
        ])
        .unwrap();
        let smtp = full.smtp.unwrap();
        assert_eq!(smtp.port, 587);
        assert_eq!(full.email_to.as_deref(), Some("me@example.com"));
    }

    #[test]
    fn test_turn_budget_floor() {
        let config = load(&[("OPENROUTER_API_KEY", "k"), ("MAX_TURNS", "1")]).unwrap();
        assert!(config.validate().is_err());
    }
}
