//! brokerctl - Entry Point
//!
//! Deploys the broker onto the cluster selected by the kubeconfig and writes
//! the broker descriptor for joining clusters.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use brokerctl::app::run::run;
use brokerctl::app::settings::{parse_args, Settings};
use brokerctl::logs::{init_logging, LogOptions};
use brokerctl::utils::version_info;

use anyhow::Context;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn try_main() -> anyhow::Result<()> {
    let cli_args = parse_args(env::args().skip(1));

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        println!("{}", serde_json::to_string_pretty(&version)?);
        return Ok(());
    }

    // Settings file first, command line on top
    let config_path = cli_args.get("config").map(PathBuf::from);
    let mut settings = Settings::load(config_path.as_deref()).await?;
    settings.apply_args(&cli_args)?;

    init_logging(LogOptions {
        log_level: settings.log_level,
        json_format: settings.log_json,
    })
    .context("failed to initialize logging")?;

    info!(version = %version.version, "Running brokerctl");
    let outcome = run(&settings).await?;

    if let Some(backup) = &outcome.backup_path {
        info!(backup = %backup.display(), "Previous descriptor kept");
    }
    println!("Broker information written to {}", outcome.descriptor_path.display());
    Ok(())
}
