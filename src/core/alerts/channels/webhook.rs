use async_trait::async_trait;
use serde_json::Value;

use super::{check_status, ChannelAdapter};
use crate::core::alerts::model::{AlertEnvelope, ChannelKind};
use crate::core::error::ChannelError;

/// Physical actuation through a webhook (smart lock, siren relay).
pub struct ActuatorChannel {
    client: reqwest::Client,
    url: String,
    payload: Value,
}

impl ActuatorChannel {
    pub fn new(client: reqwest::Client, url: String, payload: Value) -> Self {
        Self { client, url, payload }
    }
}

#[async_trait]
impl ChannelAdapter for ActuatorChannel {
    fn name(&self) -> &str {
        "actuator"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Actuator
    }

    async fn deliver(&self, envelope: &AlertEnvelope) -> Result<(), ChannelError> {
        let response = self.client.post(&self.url).json(&self.payload).send().await?;
        let response = check_status(response).await?;
        log::info!(
            "Actuator triggered for {} ({})",
            envelope.condition,
            response.status()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ConditionId;
    use chrono::Utc;
    use std::time::Duration;

    fn envelope() -> AlertEnvelope {
        AlertEnvelope {
            condition: ConditionId::PanicKeyword,
            message: "Panic".to_string(),
            timestamp: Duration::ZERO,
            raised_at: Utc::now(),
            detail: Some("help".to_string()),
            location: None,
        }
    }

    #[tokio::test]
    async fn test_posts_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/trigger/lock")
            .match_body(mockito::Matcher::Json(serde_json::json!({ "value1": "lock" })))
            .with_status(200)
            .create_async()
            .await;

        let channel = ActuatorChannel::new(
            reqwest::Client::new(),
            format!("{}/trigger/lock", server.url()),
            serde_json::json!({ "value1": "lock" }),
        );
        channel.deliver(&envelope()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/trigger/lock")
            .with_status(401)
            .with_body("bad key")
            .create_async()
            .await;

        let channel = ActuatorChannel::new(
            reqwest::Client::new(),
            format!("{}/trigger/lock", server.url()),
            Value::Null,
        );
        match channel.deliver(&envelope()).await {
            Err(ChannelError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
