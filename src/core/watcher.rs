use std::path::Path;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use super::config::FeedConfig;
use super::coordinator::Coordinator;
use super::feed::FeedTailer;
use super::parser;

/// Runs one producer task per perception feed.
pub struct FeedWatcher {
    tasks: JoinSet<()>,
    shutdown: watch::Sender<bool>,
}

impl FeedWatcher {
    pub fn start(feeds: &[FeedConfig], coordinator: &Coordinator) -> Self {
        let (shutdown, _) = watch::channel(false);
        let mut tasks = JoinSet::new();

        for feed in feeds {
            let feed = feed.clone();
            let coordinator = coordinator.clone();
            let stop = shutdown.subscribe();
            tasks.spawn(async move { watch_feed(feed, coordinator, stop).await });
        }

        Self { tasks, shutdown }
    }

    pub fn feed_count(&self) -> usize {
        self.tasks.len()
    }

    /// Signal every producer to stop and wait for them to exit.
    pub async fn stop(mut self) {
        if self.shutdown.send(true).is_err() {
            log::debug!("All feed tasks already exited");
        }
        while let Some(finished) = self.tasks.join_next().await {
            if let Err(e) = finished {
                log::error!("Feed task failed: {}", e);
            }
        }
    }
}

async fn watch_feed(feed: FeedConfig, coordinator: Coordinator, mut stop: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(Duration::from_millis(feed.poll_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut tailer: Option<FeedTailer> = None;
    let mut reported_missing = false;

    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                if tailer.is_none() {
                    match FeedTailer::open(&feed.path, feed.from_start) {
                        Ok(opened) => {
                            log::info!("Started watching feed: {}", feed.path.display());
                            tailer = Some(opened);
                        }
                        Err(e) => {
                            // The pipeline may not have created the file yet
                            if !reported_missing {
                                log::warn!("Feed {} unavailable: {}", feed.path.display(), e);
                                reported_missing = true;
                            }
                            continue;
                        }
                    }
                }

                if let Some(active) = tailer.as_mut() {
                    match active.read_new_lines() {
                        Ok(lines) => {
                            if !submit_lines(&coordinator, active.path(), &lines) {
                                break;
                            }
                        }
                        Err(e) => {
                            log::warn!("Error reading feed {}: {}", feed.path.display(), e);
                            tailer = None;
                        }
                    }
                }
            }
        }
    }

    log::info!("Stopped watching feed: {}", feed.path.display());
}

/// Returns false once the coordinator stops accepting ticks.
fn submit_lines(coordinator: &Coordinator, path: &Path, lines: &[String]) -> bool {
    for line in lines {
        if !coordinator.is_accepting() {
            return false;
        }
        match parser::parse_frame(line) {
            Ok(Some(frame)) => {
                coordinator.submit_frame(&frame);
            }
            Ok(None) => {}
            Err(e) => log::warn!("Skipping line in {}: {}", path.display(), e),
        }
    }
    if !lines.is_empty() {
        log::debug!("Read {} new lines from {}", lines.len(), path.display());
    }
    coordinator.is_accepting()
}
