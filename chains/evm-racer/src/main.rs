use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use core_logic::{setup_logger, WorkerRunner, RESULT_TARGET};
use dotenv::dotenv;
use evm_racer::config::{apply_overrides, load_settings};
use evm_racer::report::{self, RaceReport, EXIT_PLAN_FAILED};
use evm_racer::{
    Broadcaster, Cli, GasResolver, NodeConnector, NonceResolver, PlanBuilder, RaceCoordinator,
};
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let guard = setup_logger();
    dotenv().ok();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(target: RESULT_TARGET, "❌ {:#}", e);
            EXIT_PLAN_FAILED
        }
    };

    // Flush the file appender before exiting
    drop(guard);
    process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let settings = load_settings(cli.config.as_deref()).context("Failed to load settings")?;
    let settings = apply_overrides(settings, &cli).context("Invalid command line settings")?;
    info!("Settings: {:?}", settings);

    let connector = Arc::new(NodeConnector::new(&settings)?);
    let gas = GasResolver::new(connector.clone(), settings.fallback_gas_price_gwei);

    let scenario = cli
        .command
        .into_scenario(&gas)
        .await
        .context("Invalid arguments")?;

    let builder = PlanBuilder::new(NonceResolver::new(connector.clone()), settings.chain_id);
    let plan = builder
        .build(&scenario)
        .await
        .with_context(|| format!("Could not build the {} plan", scenario.name()))?;

    let started_at = Utc::now();
    info!(
        target: RESULT_TARGET,
        "{}",
        report::format_banner(scenario.name(), plan.len(), started_at)
    );

    let token = CancellationToken::new();
    let ctrl_c = WorkerRunner::cancel_on_ctrl_c(token.clone());
    let runner = WorkerRunner::new(token).with_deadline(settings.deadline());

    let broadcaster = Broadcaster::new(connector, settings.receipt_poll_interval());
    let outcomes = RaceCoordinator::new(Arc::new(broadcaster), runner)
        .run(plan)
        .await;
    ctrl_c.abort();

    let race_report = RaceReport::new(scenario.name(), started_at, &outcomes);
    for line in race_report.summary_lines() {
        info!(target: RESULT_TARGET, "{}", line);
    }
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&race_report).context("Failed to encode report")?
        );
    }

    Ok(race_report.exit_code())
}
