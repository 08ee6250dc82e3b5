use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{DetectorApi, WorkflowController};
use tracing_subscriber::EnvFilter;

mod config;
mod render;
mod shell;

#[derive(Parser, Debug)]
#[command(name = "bedbug-detector", version, about = "Bedbug image detector client")]
struct Args {
    /// Detector API base URL (overrides config and environment)
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Settings file (defaults to ./detector.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze one or more images
    Detect {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Interactive upload/predict session
    Shell,
    /// Check that the detector API is up
    Health,
    /// Show aggregate counts of saved predictions
    Stats,
    /// List saved predictions, newest first
    History {
        #[arg(long)]
        limit: Option<u32>,
    },
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn detect(api: DetectorApi, paths: Vec<PathBuf>) -> bool {
    let mut controller = WorkflowController::new(Arc::new(api));
    let mut all_ok = true;

    for path in paths {
        if let Err(err) = controller.select_path(&path).await {
            eprintln!("{}: {}", path.display(), err.notice());
            all_ok = false;
            continue;
        }
        match controller.predict().await {
            Ok(result) => {
                let name = controller
                    .selected()
                    .map(|selected| selected.file().name().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                println!("{}\n", render::result_card(&name, &result));
            }
            Err(err) => {
                eprintln!("{}: {}", path.display(), err.notice());
                if let Some(hint) = render::failure_hint(&err) {
                    eprintln!("  {hint}");
                }
                all_ok = false;
            }
        }
        controller.clear();
    }

    println!("{}", render::session_history(controller.history()));
    controller.settle_persistence().await;
    all_ok
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let mut settings = config::load_settings(args.config.as_deref())?;
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    init_tracing(&settings.log_filter);

    let api = DetectorApi::new(&settings.api_url)
        .with_context(|| format!("cannot use detector api url '{}'", settings.api_url))?;

    match args.command {
        Command::Detect { paths } => {
            if !detect(api, paths).await {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Shell => {
            shell::run(WorkflowController::new(Arc::new(api))).await?;
        }
        Command::Health => {
            let health = api.health().await.context("health check failed")?;
            println!("{}", render::health(api.base_url(), &health));
            if !health.is_ready() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Stats => {
            let stats = api.stats().await.context("failed to fetch stats")?;
            println!("{}", render::stats(&stats));
        }
        Command::History { limit } => {
            let records = api
                .history(limit.unwrap_or(settings.history_limit))
                .await
                .context("failed to fetch history")?;
            println!("{}", render::backend_history(&records));
        }
    }

    Ok(ExitCode::SUCCESS)
}
