use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use drill_bounty_sync::{
    action,
    ledger::RpcAccountSource,
    tracker::GithubClient,
    Config, Reconciler, RunSummary,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries workflow commands.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    match run(&config).await {
        Ok(summary) => {
            summary.log();
            report("true");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let message = format!("{err:#}");
            error!(error = %message, "bounty sync failed");
            action::set_failed(&message);
            report("false");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> anyhow::Result<RunSummary> {
    let settings = config.settings();
    let retry = config.retry_policy();
    let timeout = config.request_timeout();

    let tracker = GithubClient::new(config.api_url.clone(), config.token.clone(), timeout, retry)
        .context("building GitHub client")?;
    let accounts = RpcAccountSource::new(config.rpc_endpoint.clone(), timeout, retry)
        .context("building RPC client")?;

    info!(
        repository = %settings.repository,
        program_id = %settings.program_id,
        cluster = %settings.cluster.cluster,
        dry_run = settings.dry_run,
        "starting bounty sync"
    );
    let summary = Reconciler::new(&tracker, &accounts, &settings)
        .run()
        .await
        .with_context(|| format!("reconciling {}", settings.repository))?;
    Ok(summary)
}

fn report(result: &str) {
    if let Err(err) = action::set_output("result", result) {
        warn!(error = %err, "could not write step output");
    }
}
