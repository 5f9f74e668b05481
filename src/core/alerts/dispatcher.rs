// Fan-out of one envelope to every configured channel.
//
// Channels run concurrently, each on its own task with its own timeout. A
// channel that errors, panics, or overruns is recorded as failed; the others
// still run to completion.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use super::channels::ChannelAdapter;
use super::model::{AlertEnvelope, ChannelOutcome, ChannelReport, DispatchReport, FailureReason};

pub struct Dispatcher {
    channels: Vec<Arc<dyn ChannelAdapter>>,
    per_channel_timeout: Duration,
}

impl Dispatcher {
    pub fn new(channels: Vec<Arc<dyn ChannelAdapter>>, per_channel_timeout: Duration) -> Self {
        Self {
            channels,
            per_channel_timeout,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn per_channel_timeout(&self) -> Duration {
        self.per_channel_timeout
    }

    /// Deliver to all channels and report per-channel outcomes in channel
    /// order. Never fails; "every channel failed" is a report, not an error.
    pub async fn dispatch(&self, envelope: Arc<AlertEnvelope>) -> DispatchReport {
        let limit = self.per_channel_timeout;

        let attempts = self.channels.iter().map(|channel| {
            let channel = Arc::clone(channel);
            let envelope = Arc::clone(&envelope);
            async move {
                let name = channel.name().to_string();
                let kind = channel.kind();
                let task = tokio::spawn(async move { channel.deliver(&envelope).await });

                // On timeout the handle is dropped: the task is detached, not aborted
                let outcome = match tokio::time::timeout(limit, task).await {
                    Ok(Ok(Ok(()))) => ChannelOutcome::Delivered,
                    Ok(Ok(Err(e))) => ChannelOutcome::Failed(FailureReason::Transport(e.to_string())),
                    Ok(Err(join_err)) if join_err.is_panic() => ChannelOutcome::Failed(FailureReason::Panicked),
                    Ok(Err(join_err)) => ChannelOutcome::Failed(FailureReason::Transport(join_err.to_string())),
                    Err(_) => ChannelOutcome::Failed(FailureReason::Timeout(limit)),
                };

                match &outcome {
                    ChannelOutcome::Delivered => log::debug!("Channel {} delivered", name),
                    ChannelOutcome::Failed(reason) => log::warn!("Channel {} failed: {}", name, reason),
                }

                ChannelReport {
                    channel: name,
                    kind,
                    outcome,
                }
            }
        });

        let entries = join_all(attempts).await;
        let report = DispatchReport::new(envelope.condition, envelope.timestamp, entries);

        if report.all_failed() {
            log::error!(
                "All {} channels failed for {} alert",
                report.entries().len(),
                envelope.condition
            );
        } else {
            log::info!(
                "{} alert delivered on {}/{} channels",
                envelope.condition,
                report.delivered_count(),
                report.entries().len()
            );
        }

        report
    }
}
