//! cardfeed-ui - terminal client for the card feed
//!
//! Reads commands from stdin (`card`, `enable`, `disable`, `pdf`, ...),
//! prints cards as they arrive from button fetches and the push stream.

use anyhow::{Context, Result};
use cardfeed_common::config::ConfigResolver;
use cardfeed_ui::{app, EventStreamManager, PdfLauncher, SystemViewer, TerminalSink, UiCommand};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Command-line arguments for cardfeed-ui
#[derive(Parser, Debug)]
#[command(name = "cardfeed-ui")]
#[command(about = "Terminal client for the card feed")]
#[command(version)]
struct Args {
    /// Server base URL (overrides CARDFEED_BASE_URL and the config file)
    #[arg(short, long)]
    base_url: Option<String>,

    /// TOML config file
    #[arg(short, long, env = "CARDFEED_CONFIG")]
    config: Option<PathBuf>,

    /// Enable the push stream at startup
    #[arg(long)]
    enable_stream: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting cardfeed-ui v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = ConfigResolver::new()
        .with_base_url(args.base_url)
        .with_config_file(args.config)
        .resolve()
        .context("Failed to resolve configuration")?;
    info!("Server: {}", config.base_url);

    let http = reqwest::Client::builder()
        .connect_timeout(config.request_timeout())
        .build()
        .context("Failed to build HTTP client")?;

    let mut launcher = PdfLauncher::new(http.clone(), &config, SystemViewer);
    let mut manager = EventStreamManager::new(http, config, TerminalSink::new());

    let (command_tx, mut command_rx) = mpsc::channel(16);
    spawn_command_reader(command_tx);

    if args.enable_stream {
        manager.enable_stream();
    }

    eprintln!("{}", UiCommand::HELP);

    tokio::select! {
        _ = app::run(&mut manager, &mut launcher, &mut command_rx) => {}
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    if manager.is_streaming() {
        manager.disable_stream();
    }

    info!("cardfeed-ui stopped ({} cards)", manager.cards().len());
    Ok(())
}

/// Forward stdin lines as commands until EOF
///
/// Runs on a plain thread: a blocked stdin read must not hold up runtime
/// shutdown.
fn spawn_command_reader(tx: mpsc::Sender<UiCommand>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<UiCommand>() {
                Ok(command) => {
                    if tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("{}", e),
            }
        }
    });
}

/// Ctrl+C / SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
