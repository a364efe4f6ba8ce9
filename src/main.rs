use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use huurwatch::AppConfig;
use huurwatch::browser::BrowserSession;
use huurwatch::config::StoreBackend;
use huurwatch::detector::ChangeDetector;
use huurwatch::notify::{AlertChannel, AlertDispatcher, EmailChannel, SmsChannel};
use huurwatch::poller::Poller;
use huurwatch::sites;
use huurwatch::store::{MemoryStore, ResultStore, SqliteStore};

#[derive(Parser)]
#[command(
    name = "huurwatch",
    about = "Watches Dutch rental sites and alerts on new listings"
)]
struct Cli {
    /// Run detection without sending alerts
    #[arg(long)]
    debug: bool,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Directory holding the layered config files
    #[arg(long)]
    config_dir: Option<String>,
}

fn init_tracing(log_dir: Option<&str>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env().add_directive("huurwatch=debug".parse()?);

    // With a log directory the process writes daily rolling files;
    // the guard must stay alive for the duration of the program
    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "huurwatch.log");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}

async fn build_store(config: &AppConfig) -> Result<Arc<dyn ResultStore>> {
    Ok(match config.store.backend {
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&config.store.path).await?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    })
}

fn build_channels(config: &AppConfig) -> Result<Vec<Box<dyn AlertChannel>>> {
    let mut channels: Vec<Box<dyn AlertChannel>> = Vec::new();
    if config.alerts.smtp.enabled {
        channels.push(Box::new(EmailChannel::new(&config.alerts.smtp)?));
    }
    if config.alerts.sms.enabled {
        channels.push(Box::new(SmsChannel::new(&config.alerts.sms)?));
    }
    Ok(channels)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config =
        AppConfig::load(cli.config_dir.as_deref()).context("failed to load configuration")?;
    let _log_guard = init_tracing(config.log_dir.as_deref())?;

    info!("Starting huurwatch...");

    let debug_mode = config.debug_mode || cli.debug;
    if debug_mode {
        warn!("debug mode: alerts are suppressed");
    }

    let store = build_store(&config).await?;
    let channels = build_channels(&config)?;
    if channels.is_empty() && !debug_mode {
        warn!("no alert channels configured, detections will only be logged");
    }
    let dispatcher = AlertDispatcher::new(channels);

    let adapters = sites::from_config(&config);
    anyhow::ensure!(!adapters.is_empty(), "no sites enabled in configuration");

    let browser = Arc::new(
        BrowserSession::launch(config.browser.clone())
            .await
            .context("failed to start the browser session")?,
    );

    let detector = ChangeDetector::new(store, dispatcher, debug_mode);
    let mut poller = Poller::new(
        browser.clone(),
        detector,
        adapters,
        Duration::from_secs(config.poller.interval_secs),
    );
    info!(
        sites = poller.site_count(),
        interval_secs = config.poller.interval_secs,
        "watcher ready"
    );

    if cli.once {
        poller.run_cycle().await;
    } else {
        tokio::select! {
            _ = poller.run() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
            }
        }
    }

    browser.close().await;
    Ok(())
}
