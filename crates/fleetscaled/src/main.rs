//! fleetscaled: the fleetscale daemon.
//!
//! Loads the autoscaling options, connects to the cluster, and assembles
//! the autoscaling context:
//! - Cloud provider (built once, shared)
//! - Expander strategy
//! - Cluster state registry
//!
//! # Usage
//!
//! ```text
//! fleetscaled check --config /etc/fleetscale/options.toml
//! fleetscaled run --config /etc/fleetscale/options.toml --snapshot cluster.json
//! ```

mod scan;
mod setup;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use fleetscale_autoscaler::AutoscalerError;
use fleetscale_core::OptionsError;
use fleetscale_core::options::parse_duration;

#[derive(Parser)]
#[command(name = "fleetscaled", about = "fleetscale cluster autoscaler daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the options and print the assembled context.
    Check {
        /// Options file.
        #[arg(long)]
        config: PathBuf,

        /// JSON cluster snapshot to serve as the cluster.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Assemble the context and keep cluster state current until Ctrl-C.
    Run {
        /// Options file.
        #[arg(long)]
        config: PathBuf,

        /// JSON cluster snapshot to serve as the cluster.
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Interval between cluster scans, e.g. "10s".
        #[arg(long, default_value = "10s", value_parser = parse_scan_interval)]
        scan_interval: Duration,
    },
}

/// A scan interval must be positive.
fn parse_scan_interval(s: &str) -> Result<Duration, OptionsError> {
    let interval = parse_duration(s)?;
    if interval.is_zero() {
        return Err(OptionsError::InvalidDuration(
            "scan interval must be greater than zero".to_string(),
        ));
    }
    Ok(interval)
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info,fleetscaled=debug,fleetscale=debug")
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let result = match cli.command {
        Command::Check { config, snapshot } => check(config, snapshot),
        Command::Run {
            config,
            snapshot,
            scan_interval,
        } => run(config, snapshot, scan_interval).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<AutoscalerError>() {
                Some(err) => error!(
                    error = %err,
                    fatal = err.is_fatal(),
                    error_type = ?err.error_type(),
                    "failed to assemble autoscaling context"
                ),
                None => error!(error = %format!("{e:#}"), "fleetscaled failed"),
            }
            ExitCode::FAILURE
        }
    }
}

fn check(config: PathBuf, snapshot: Option<PathBuf>) -> anyhow::Result<()> {
    let options = setup::load_options(&config)?;
    let cluster = setup::connect(snapshot.as_deref())?;
    let ctx = setup::assemble(options, cluster)?;

    println!("{}", serde_json::to_string_pretty(&ctx.summary())?);
    Ok(())
}

async fn run(
    config: PathBuf,
    snapshot: Option<PathBuf>,
    scan_interval: Duration,
) -> anyhow::Result<()> {
    info!("fleetscale daemon starting");

    let options = setup::load_options(&config)?;
    let cluster = setup::connect(snapshot.as_deref())?;
    let ctx = setup::assemble(options, cluster)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scan_ctx = Arc::clone(&ctx);
    let scan_handle = tokio::spawn(async move {
        scan::run(&scan_ctx, scan_interval, shutdown_rx).await;
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    join_scan(scan_handle).await?;

    info!("fleetscale daemon stopped");
    Ok(())
}

/// Wait for the scan task; a panic or cancellation is an error.
async fn join_scan(handle: JoinHandle<()>) -> anyhow::Result<()> {
    if let Err(e) = handle.await {
        error!(error = %e, "scan loop terminated abnormally");
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_interval_must_be_positive() {
        assert_eq!(parse_scan_interval("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_scan_interval("250ms").unwrap(), Duration::from_millis(250));
        assert!(matches!(
            parse_scan_interval("0s"),
            Err(OptionsError::InvalidDuration(_))
        ));
        assert!(parse_scan_interval("0").is_err());
    }

    #[tokio::test]
    async fn scan_task_panic_is_an_error() {
        let handle = tokio::spawn(async { panic!("scan blew up") });
        assert!(join_scan(handle).await.is_err());

        let handle = tokio::spawn(async {});
        assert!(join_scan(handle).await.is_ok());
    }

    #[test]
    fn cli_rejects_zero_scan_interval() {
        let err = Cli::try_parse_from([
            "fleetscaled",
            "run",
            "--config",
            "options.toml",
            "--scan-interval",
            "0s",
        ])
        .err()
        .unwrap();
        assert!(err.to_string().contains("greater than zero"));
    }
}
