mod cli;
mod config;
mod error;

use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use origin_client::{FfmpegPush, OriginClient};
use relay_engine::SessionOrchestrator;

use crate::cli::{Args, Commands};
use crate::config::AppConfig;
use crate::error::{CliError, Result};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet);
    let config = AppConfig::load(args.config.as_deref())?;

    match args.command {
        Commands::Stream {
            input,
            name,
            output,
            no_cache,
        } => {
            let mut relay = config.relay.clone();
            if no_cache {
                relay.cache_enabled = false;
            }
            relay
                .validate()
                .map_err(|e| CliError::Config(e.to_string()))?;

            let client = reqwest::Client::new();
            let allocator = Arc::new(OriginClient::new(config.origin.clone(), client.clone()));
            let push = Arc::new(FfmpegPush::new());
            if !push.is_available() {
                warn!("ffmpeg not found on PATH; the push stage will fail");
            }

            let orchestrator =
                SessionOrchestrator::new(relay, allocator, push).with_client(client);
            let stream_name = name.unwrap_or_else(|| config.stream_name.clone());
            let report = orchestrator
                .run(&input, &stream_name, &config.profiles)
                .await;

            let rendered = serde_json::to_string_pretty(&report)?;
            println!("{rendered}");
            if let Some(path) = output {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, &rendered)?;
                info!(path = %path.display(), "session report written");
            }

            if !report.allocation.is_completed() {
                process::exit(1);
            }
        }

        Commands::Config { show, reset } => {
            if reset {
                let path = AppConfig::reset(args.config.as_deref())?;
                println!("Configuration reset to defaults at {}", path.display());
            } else if show {
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display the current configuration or --reset to restore defaults"
                );
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .init();
}
