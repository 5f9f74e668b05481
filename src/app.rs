use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::alerts::channels::build_channels;
use crate::core::alerts::dispatcher::Dispatcher;
use crate::core::alerts::engine::AlertEngine;
use crate::core::alerts::envelope::EnvelopeBuilder;
use crate::core::alerts::model::DispatchReport;
use crate::core::alerts::triggers::SignalAdapter;
use crate::core::clock::MonotonicClock;
use crate::core::config::{ConfigManager, Settings};
use crate::core::coordinator::Coordinator;
use crate::core::error::ConfigError;
use crate::core::location::{DeviceLocator, LocationLookup, NoLocation};
use crate::core::watcher::FeedWatcher;

const DEFAULT_SETTINGS_PATH: &str = "guardpost.json";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Entry point for the `guardpost` binary: `guardpost [settings.json]`.
pub fn run() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));
    let settings = ConfigManager::at(settings_path.clone()).load()?;
    log::info!("Loaded settings from {}", settings_path.display());

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(serve(settings))
}

async fn serve(settings: Settings) -> Result<(), AppError> {
    let config = settings.validate()?;

    let client = reqwest::Client::builder()
        .timeout(config.per_channel_timeout)
        .build()?;
    let channels = build_channels(&config.channels, &client)?;

    let locator: Arc<dyn LocationLookup> = if settings.location.enabled {
        Arc::new(DeviceLocator::new(&settings.location, client.clone()))
    } else {
        Arc::new(NoLocation)
    };
    let envelopes = EnvelopeBuilder::new(
        &config.conditions,
        locator,
        Duration::from_millis(settings.location.timeout_ms),
    );

    let (reports_tx, mut reports_rx) = mpsc::unbounded_channel::<DispatchReport>();
    let report_logger = tokio::spawn(async move {
        while let Some(report) = reports_rx.recv().await {
            for failure in report.failures() {
                log::debug!(
                    "{} alert at {:?}: channel {} did not deliver",
                    report.condition,
                    report.timestamp,
                    failure.channel
                );
            }
        }
    });

    let coordinator = Coordinator::new(
        AlertEngine::new(&config.conditions),
        SignalAdapter::new(settings.vision.clone(), settings.pose.clone(), settings.audio.clone()),
        envelopes,
        Dispatcher::new(channels, config.per_channel_timeout),
        Arc::new(MonotonicClock::new()),
        tokio::runtime::Handle::current(),
        Some(reports_tx),
    );

    let watcher = FeedWatcher::start(&settings.feeds, &coordinator);
    log::info!(
        "Watching {} feeds for {} conditions",
        watcher.feed_count(),
        config.conditions.len()
    );
    if settings.feeds.is_empty() {
        log::warn!("No feeds configured, nothing will be evaluated");
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
    }

    coordinator.shutdown();
    watcher.stop().await;
    coordinator.drain().await;

    // Dropping the last coordinator handle closes the report channel
    drop(coordinator);
    if let Err(e) = report_logger.await {
        log::error!("Report logger failed: {}", e);
    }

    Ok(())
}
