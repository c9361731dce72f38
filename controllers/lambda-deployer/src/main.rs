//! Lambda Deployer
//!
//! Command-line entry point: parses the deployment request, loads gateway
//! configuration from the environment, and runs one reconciliation or a
//! read-only network listing.
//! Exit codes: 0 done, 1 failed, 2 timeout, 3 cancelled.

use anyhow::Context;
use clap::Parser;
use cloud_client::CloudClient;
use lambda_deployer::cli::{Cli, Command, NetworkCommand};
use lambda_deployer::{discovery, output, Config, DeploymentOutcome, Reconciler};
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let directive = if verbose { "lambda_deployer=debug" } else { "lambda_deployer=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Flip the cancellation flag on Ctrl-C
fn spawn_ctrl_c_handler() -> watch::Receiver<bool> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling after the current step");
            let _ = cancel_tx.send(true);
        }
    });
    cancel_rx
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::from_env()?;
    info!("Configuration:");
    info!("  Gateway URL: {}", config.gateway_url);
    info!("  Region: {}", config.region);

    let client = CloudClient::new(config.gateway_url, config.gateway_token, config.region)
        .context("failed to build gateway client")?;

    match cli.command {
        Command::Deploy(args) => {
            let spec = args.into_spec().context("invalid deploy arguments")?;
            let reconciler = Reconciler::new(Box::new(client))
                .with_wait_policy(config.wait)
                .with_cancellation(spawn_ctrl_c_handler());

            let outcome = DeploymentOutcome::from(reconciler.deploy(&spec).await);
            println!("{}", output::render(&outcome, cli.output)?);
            Ok(ExitCode::from(outcome.exit_code()))
        }
        Command::Network(NetworkCommand::List { vpc_id }) => {
            let inventory = discovery::list_network(&client, vpc_id.as_deref()).await?;
            println!("{}", output::render_inventory(&inventory, cli.output)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}
