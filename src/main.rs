use clap::{error::ErrorKind, CommandFactory};
use paper_panel::{
    cli::{output::Output, Cli},
    llm::{BillingClient, GatewayConfig},
    notify::{DeliveryOutcome, NoopNotifier, Notifier, SmtpNotifier},
    storage::ReportStore,
    utils::{
        config::{ConfigStatus, RunConfig},
        pricing,
    },
    AppError, GatewayClientFactory, ResearchCoordinator, Result,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const PROJECTED_RUNS: u32 = 100;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let default_filter = if cli.verbose {
        "paper_panel=debug"
    } else {
        "paper_panel=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let config = match RunConfig::from_env() {
        Ok(config) => apply_overrides(config, &cli),
        Err(e) if cli.status => {
            tracing::warn!("{}", e);
            output.banner();
            output.header("Configuration");
            return conclude_status(&output, &ConfigStatus::unloadable(&e));
        }
        Err(e) => return fail(&output, &e),
    };

    if cli.status {
        return show_status(&output, &config).await;
    }
    if cli.cost {
        show_cost(&output, &config);
        return ExitCode::SUCCESS;
    }

    let query = match cli.query.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "a research QUERY is required unless --status or --cost is given",
            )
            .exit(),
    };

    match run(&output, &config, &query, cli.no_email).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&output, &e),
    }
}

fn apply_overrides(mut config: RunConfig, cli: &Cli) -> RunConfig {
    if let Some(format) = cli.format {
        config.report_format = format;
    }
    if let Some(max_turns) = cli.max_turns {
        config.max_turns = max_turns;
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    config
}

fn fail(output: &Output, error: &AppError) -> ExitCode {
    tracing::error!("{}", error);
    output.error(&error.to_string());
    if matches!(error, AppError::Configuration(_)) {
        output.hint("Run `paper-panel --status` to check your configuration");
    }
    ExitCode::from(error.exit_code() as u8)
}

async fn show_status(output: &Output, config: &RunConfig) -> ExitCode {
    let status = config.status();

    output.banner();
    output.header("Configuration");
    for entry in &status.entries {
        output.check(&entry.label, &entry.value, entry.ok);
    }

    if config.smtp.is_some() {
        match SmtpNotifier::new(config.smtp.clone()).test_connection().await {
            Ok(_) => output.check("SMTP connection", "reachable", true),
            Err(e) => output.warning(&e.to_string()),
        }
    }

    let store = ReportStore::new(&config.output_dir);
    match store.list_reports(usize::MAX).await {
        Ok(reports) => output.kv("Saved reports", &reports.len().to_string()),
        Err(e) => output.warning(&format!("Could not list reports: {}", e)),
    }

    conclude_status(output, &status)
}

/// Exit 0 for a usable configuration, 1 otherwise.
fn conclude_status(output: &Output, status: &ConfigStatus) -> ExitCode {
    if status.is_valid() {
        output.complete("Configuration is valid");
        ExitCode::SUCCESS
    } else {
        output.subheader("Problems");
        for problem in &status.problems {
            output.list_item(problem);
        }
        output.hint("Set the variables in the environment or in a .env file (see .env.example)");
        ExitCode::FAILURE
    }
}

fn show_cost(output: &Output, config: &RunConfig) {
    let estimate = pricing::estimate_run(config);

    output.banner();
    output.header("Estimated cost per run");
    for line in &estimate.lines {
        let (input, completion) = pricing::assumed_tokens(line.role);
        let price = match line.cost {
            Some(cost) => Output::usd(cost),
            None => "unpriced".to_string(),
        };
        output.kv(
            line.role.display_name(),
            &format!(
                "{} ({}K in / {}K out) {}",
                line.model,
                input / 1000,
                completion / 1000,
                price
            ),
        );
    }

    output.subheader("Totals");
    output.kv(
        "Per run",
        &format!(
            "{} - {}",
            Output::usd(estimate.low),
            Output::usd(estimate.high())
        ),
    );
    let (low, high) = estimate.projected(PROJECTED_RUNS);
    output.kv(
        &format!("{} runs", PROJECTED_RUNS),
        &format!("{} - {}", Output::usd(low), Output::usd(high)),
    );

    let unpriced = estimate.unpriced();
    if !unpriced.is_empty() {
        output.warning(&format!(
            "No rate known for: {} (not included in the totals)",
            unpriced.join(", ")
        ));
    }
}

async fn run(output: &Output, config: &RunConfig, query: &str, no_email: bool) -> Result<()> {
    config.validate()?;

    let factory = GatewayClientFactory::new(config.gateway()?);
    let notifier: Arc<dyn Notifier> = if no_email {
        Arc::new(NoopNotifier::new("disabled with --no-email"))
    } else {
        Arc::new(SmtpNotifier::new(config.smtp.clone()))
    };
    let coordinator = ResearchCoordinator::new(config, &factory, notifier)?;

    output.banner();
    output.info(&format!("Research query: {}", query));
    output.info(&format!(
        "Turn budget {}, report format {}",
        config.max_turns, config.report_format
    ));

    let summary = coordinator.run(query).await?;

    output.header("Report");
    output.success(&format!("Saved to {}", summary.path.display()));
    output.kv("References", &summary.report.references.len().to_string());
    output.kv("Transcript turns", &summary.transcript_turns.to_string());
    output.kv(
        "Contributors",
        &summary.report.metadata.contributing_roles.join(", "),
    );

    match &summary.delivery {
        Some(DeliveryOutcome::Delivered { recipient }) => {
            output.success(&format!("Emailed to {}", recipient))
        }
        Some(DeliveryOutcome::Skipped { reason }) => {
            output.info(&format!("Email skipped: {}", reason))
        }
        None => output.warning("Email delivery failed"),
    }

    if !summary.usage.models.is_empty() {
        output.subheader("Usage");
        for model in &summary.usage.models {
            let cost = model
                .estimated_cost_usd
                .map(Output::usd)
                .unwrap_or_else(|| "unpriced".to_string());
            output.kv(
                &model.model,
                &format!(
                    "{} request(s), {} prompt / {} completion tokens, {}",
                    model.requests, model.prompt_tokens, model.completion_tokens, cost
                ),
            );
        }
        output.kv("Estimated total", &Output::usd(summary.usage.estimated_cost_usd));
    }

    if !summary.usage.generation_ids.is_empty() {
        show_billing(output, &config.gateway()?, &summary.usage.generation_ids).await;
    }

    if !summary.warnings.is_empty() {
        output.subheader("Warnings");
        for warning in &summary.warnings {
            output.warning(warning);
        }
    }

    output.complete("Analysis complete");
    Ok(())
}

/// Charged cost of the run and the remaining balance; failures only warn.
async fn show_billing(output: &Output, gateway: &GatewayConfig, generation_ids: &[String]) {
    let billing = match BillingClient::new(gateway) {
        Ok(billing) => billing,
        Err(e) => {
            output.warning(&format!("Could not fetch actual cost: {}", e));
            return;
        }
    };

    match billing.actual_cost(generation_ids).await {
        Ok(actual) if actual.unresolved == 0 => output.kv(
            "Actual cost",
            &format!(
                "{} ({} completion(s))",
                Output::usd(actual.total_usd),
                actual.generations.len()
            ),
        ),
        Ok(actual) => output.kv(
            "Actual cost",
            &format!(
                "{} ({} of {} completion(s) billed so far)",
                Output::usd(actual.total_usd),
                actual.generations.len(),
                generation_ids.len()
            ),
        ),
        Err(e) => output.warning(&format!("Could not fetch actual cost: {}", e)),
    }

    match billing.credits().await {
        Ok(credits) => output.kv("Credits remaining", &Output::usd(credits.remaining())),
        Err(e) => output.warning(&format!("Could not fetch account credits: {}", e)),
    }
}
