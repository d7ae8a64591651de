use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pktstream::client::FeedClient;
use pktstream::config::{ClientConfig, ServerConfig};
use pktstream::publisher;

/// Synthetic packet feed for live traffic dashboards.
///
/// Without a subcommand the stream publisher runs.
#[derive(Parser)]
#[command(name = "pktstream", version, about)]
struct Cli {
    /// Logging verbosity (trace, debug, info, warn, error). RUST_LOG wins if set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(flatten)]
    server: ServerConfig,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Subscribe to a running feed and log a dashboard line per frame.
    Watch(ClientConfig),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&cli.log_level)
            .with_context(|| format!("invalid log level: {}", cli.log_level))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Some(Command::Watch(config)) => watch_feed(config).await,
        None => serve(cli.server).await,
    }
}

async fn serve(config: ServerConfig) -> Result<()> {
    publisher::serve(&config, shutdown_signal())
        .await
        .with_context(|| format!("running stream publisher on {}", config.addr()))?;
    info!("stream publisher stopped");
    Ok(())
}

async fn watch_feed(config: ClientConfig) -> Result<()> {
    config.validate().context("checking watch options")?;

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    let mut client = FeedClient::from_config(&config);
    info!(url = %config.url, "watching feed");
    client
        .run(stop_rx, |dashboard| info!("{}", dashboard.summary()))
        .await;

    info!(
        frames = client.dashboard().frames_applied(),
        discarded = client.dashboard().frames_discarded(),
        "stopped watching"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("received Ctrl-C, shutting down");
}
