//! SMS and voice-call channels over the Twilio REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{check_status, ChannelAdapter};
use crate::core::alerts::model::{AlertEnvelope, ChannelKind};
use crate::core::error::{ChannelError, ConfigError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
    pub to: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Voice used for `<Say>` in calls
    #[serde(default = "default_voice")]
    pub voice: String,
}

fn default_api_base() -> String {
    "https://api.twilio.com".to_string()
}

fn default_voice() -> String {
    "alice".to_string()
}

impl TwilioConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("account_sid", &self.account_sid),
            ("auth_token", &self.auth_token),
            ("from", &self.from),
            ("to", &self.to),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidChannel {
                    channel: "twilio".to_string(),
                    reason: format!("{} is empty", field),
                });
            }
        }
        Ok(())
    }

    fn resource_url(&self, resource: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/{}.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid,
            resource
        )
    }
}

/// Escape text for inclusion in TwiML.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

async fn create_resource(
    client: &reqwest::Client,
    config: &TwilioConfig,
    resource: &str,
    form: &[(&str, &str)],
) -> Result<String, ChannelError> {
    let response = client
        .post(config.resource_url(resource))
        .basic_auth(&config.account_sid, Some(&config.auth_token))
        .form(form)
        .send()
        .await?;
    let payload: Value = check_status(response).await?.json().await?;
    Ok(payload
        .get("sid")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string())
}

pub struct SmsChannel {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl SmsChannel {
    pub fn new(client: reqwest::Client, config: TwilioConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ChannelAdapter for SmsChannel {
    fn name(&self) -> &str {
        "sms"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn deliver(&self, envelope: &AlertEnvelope) -> Result<(), ChannelError> {
        let body = format!("ALERT: {}", envelope.full_text());
        let sid = create_resource(
            &self.client,
            &self.config,
            "Messages",
            &[
                ("To", self.config.to.as_str()),
                ("From", self.config.from.as_str()),
                ("Body", body.as_str()),
            ],
        )
        .await?;
        log::info!("SMS sent: {}", sid);
        Ok(())
    }
}

pub struct VoiceChannel {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl VoiceChannel {
    pub fn new(client: reqwest::Client, config: TwilioConfig) -> Self {
        Self { client, config }
    }

    pub fn twiml(&self, envelope: &AlertEnvelope) -> String {
        let spoken = match envelope.location_text() {
            Some(location) => format!("{} Location: {}", envelope.headline(), location),
            None => envelope.headline(),
        };
        format!(
            "<Response><Say voice=\"{}\">{}</Say></Response>",
            escape_xml(&self.config.voice),
            escape_xml(&spoken)
        )
    }
}

#[async_trait]
impl ChannelAdapter for VoiceChannel {
    fn name(&self) -> &str {
        "voice"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Voice
    }

    async fn deliver(&self, envelope: &AlertEnvelope) -> Result<(), ChannelError> {
        let twiml = self.twiml(envelope);
        let sid = create_resource(
            &self.client,
            &self.config,
            "Calls",
            &[
                ("To", self.config.to.as_str()),
                ("From", self.config.from.as_str()),
                ("Twiml", twiml.as_str()),
            ],
        )
        .await?;
        log::info!("Call initiated: {}", sid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ConditionId;
    use chrono::Utc;
    use mockito::Matcher;
    use std::time::Duration;

    fn config(api_base: String) -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from: "+12165161305".to_string(),
            to: "+15550100".to_string(),
            api_base,
            voice: default_voice(),
        }
    }

    fn envelope() -> AlertEnvelope {
        AlertEnvelope {
            condition: ConditionId::HandsUp,
            message: "Hands-up pose detected!".to_string(),
            timestamp: Duration::from_secs(5),
            raised_at: Utc::now(),
            detail: None,
            location: None,
        }
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
    }

    #[test]
    fn test_twiml() {
        let channel = VoiceChannel::new(reqwest::Client::new(), config(default_api_base()));
        assert_eq!(
            channel.twiml(&envelope()),
            "<Response><Say voice=\"alice\">Hands-up pose detected!</Say></Response>"
        );
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let mut cfg = config(default_api_base());
        cfg.auth_token = " ".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidChannel { .. })));
    }

    #[tokio::test]
    async fn test_sms_posts_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/2010-04-01/Accounts/AC123/Messages.json")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("To".to_string(), "+15550100".to_string()),
                Matcher::UrlEncoded("Body".to_string(), "ALERT: Hands-up pose detected!".to_string()),
            ]))
            .with_status(201)
            .with_body(r#"{"sid":"SM1"}"#)
            .create_async()
            .await;

        let channel = SmsChannel::new(reqwest::Client::new(), config(server.url()));
        channel.deliver(&envelope()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_call_failure_reports_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/2010-04-01/Accounts/AC123/Calls.json")
            .with_status(400)
            .with_body(r#"{"message":"invalid To"}"#)
            .create_async()
            .await;

        let channel = VoiceChannel::new(reqwest::Client::new(), config(server.url()));
        let result = channel.deliver(&envelope()).await;
        assert!(matches!(result, Err(ChannelError::Status { status: 400, .. })));
    }
}
