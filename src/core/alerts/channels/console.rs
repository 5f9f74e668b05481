use async_trait::async_trait;

use super::ChannelAdapter;
use crate::core::alerts::model::{AlertEnvelope, ChannelKind};
use crate::core::error::ChannelError;

/// Announces the alert on the process log.
#[derive(Debug, Default)]
pub struct ConsoleChannel;

impl ConsoleChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelAdapter for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Console
    }

    async fn deliver(&self, envelope: &AlertEnvelope) -> Result<(), ChannelError> {
        log::warn!("[ALERT] {}", envelope.full_text());
        Ok(())
    }
}
