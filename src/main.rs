mod app;
mod bridge;
mod cli;
mod config;
mod domain;
mod extraction;
mod infrastructure;
mod page;
mod presenter;
mod relay;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use infrastructure::{directories, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config, &paths)?;

    let (shutdown, _) = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::ScamSenseApp::initialize(config, shutdown)?;
    let outcome = run(&app, cli.command).await;
    app.shutdown().await;
    outcome
}

async fn run(app: &app::ScamSenseApp, command: Command) -> Result<()> {
    match command {
        Command::Scan(args) => {
            let page = app.load_page(&args.page).await?;
            let report = app.scan(page).await?;

            if let Some(path) = &args.overlay_out {
                match &report.page_with_overlay {
                    Some(html) => {
                        tokio::fs::write(path, html)
                            .await
                            .with_context(|| format!("failed to write {}", path.display()))?;
                        tracing::info!(path = %path.display(), "page with overlay written");
                    }
                    None => tracing::warn!("no overlay was shown; nothing written"),
                }
            }

            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.outcome.status_line());
            }
        }
        Command::Extract(args) => {
            let page = app.load_page(&args).await?;
            let result = app.extract(page).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Health => {
            let report = app.health().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.model_loaded {
                tracing::warn!(error = ?report.error, "classifier is up but its model is not loaded");
            }
        }
    }
    Ok(())
}
