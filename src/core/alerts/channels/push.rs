use async_trait::async_trait;
use serde_json::json;

use super::{check_status, ChannelAdapter};
use crate::core::alerts::model::{AlertEnvelope, ChannelKind};
use crate::core::error::ChannelError;

/// Topic push notification over an HTTP messaging endpoint.
pub struct PushChannel {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    topic: String,
    title: String,
}

impl PushChannel {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        token: Option<String>,
        topic: String,
        title: String,
    ) -> Self {
        Self {
            client,
            endpoint,
            token,
            topic,
            title,
        }
    }
}

#[async_trait]
impl ChannelAdapter for PushChannel {
    fn name(&self) -> &str {
        "push"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Push
    }

    async fn deliver(&self, envelope: &AlertEnvelope) -> Result<(), ChannelError> {
        let body = json!({
            "message": {
                "topic": self.topic,
                "notification": {
                    "title": self.title,
                    "body": envelope.full_text(),
                },
                "data": {
                    "condition": envelope.condition,
                    "raised_at": envelope.raised_at.to_rfc3339(),
                    "map_link": envelope.location.as_ref().map(|l| l.map_link()),
                },
            }
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        check_status(request.send().await?).await?;
        log::info!("Push notification sent to topic {}", self.topic);
        Ok(())
    }
}
