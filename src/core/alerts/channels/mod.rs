//! Delivery channels for alert envelopes.
//!
//! Every channel owns its own transport and credentials; the dispatcher only
//! sees the `ChannelAdapter` capability.

pub mod console;
pub mod push;
pub mod siren;
pub mod store;
pub mod twilio;
pub mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{AlertEnvelope, ChannelKind};
use crate::core::error::{ChannelError, ConfigError};

pub use console::ConsoleChannel;
pub use push::PushChannel;
pub use siren::SirenChannel;
pub use store::StoreChannel;
pub use twilio::{SmsChannel, TwilioConfig, VoiceChannel};
pub use webhook::ActuatorChannel;

#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ChannelKind;

    /// Deliver one envelope. Called at most once per confirmed event.
    async fn deliver(&self, envelope: &AlertEnvelope) -> Result<(), ChannelError>;
}

/// Channel configuration as it appears in settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    Console,
    Store {
        path: PathBuf,
    },
    Push {
        endpoint: String,
        #[serde(default)]
        token: Option<String>,
        #[serde(default = "default_topic")]
        topic: String,
        #[serde(default = "default_push_title")]
        title: String,
    },
    Sms(TwilioConfig),
    Voice(TwilioConfig),
    Actuator {
        url: String,
        #[serde(default = "default_actuator_payload")]
        payload: Value,
    },
    Siren {
        sound_path: PathBuf,
    },
}

fn default_topic() -> String {
    "security_alerts".to_string()
}

fn default_push_title() -> String {
    "Security Alert".to_string()
}

fn default_actuator_payload() -> Value {
    serde_json::json!({ "value1": "lock" })
}

impl ChannelConfig {
    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::Console => ChannelKind::Console,
            Self::Store { .. } => ChannelKind::Store,
            Self::Push { .. } => ChannelKind::Push,
            Self::Sms(_) => ChannelKind::Sms,
            Self::Voice(_) => ChannelKind::Voice,
            Self::Actuator { .. } => ChannelKind::Actuator,
            Self::Siren { .. } => ChannelKind::Siren,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |channel: &str, reason: &str| ConfigError::InvalidChannel {
            channel: channel.to_string(),
            reason: reason.to_string(),
        };
        match self {
            Self::Push { endpoint, .. } if endpoint.is_empty() => Err(invalid("push", "endpoint is empty")),
            Self::Actuator { url, .. } if url.is_empty() => Err(invalid("actuator", "url is empty")),
            Self::Sms(twilio) | Self::Voice(twilio) => twilio.validate(),
            Self::Siren { .. } if !cfg!(feature = "siren") => {
                Err(ConfigError::UnsupportedChannel("siren".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Instantiate channels in configured order, sharing one HTTP client.
pub fn build_channels(
    configs: &[ChannelConfig],
    client: &reqwest::Client,
) -> Result<Vec<Arc<dyn ChannelAdapter>>, ConfigError> {
    configs
        .iter()
        .map(|config| -> Result<Arc<dyn ChannelAdapter>, ConfigError> {
            config.validate()?;
            Ok(match config {
                ChannelConfig::Console => Arc::new(ConsoleChannel::new()),
                ChannelConfig::Store { path } => Arc::new(StoreChannel::new(path.clone())),
                ChannelConfig::Push {
                    endpoint,
                    token,
                    topic,
                    title,
                } => Arc::new(PushChannel::new(
                    client.clone(),
                    endpoint.clone(),
                    token.clone(),
                    topic.clone(),
                    title.clone(),
                )),
                ChannelConfig::Sms(twilio) => Arc::new(SmsChannel::new(client.clone(), twilio.clone())),
                ChannelConfig::Voice(twilio) => Arc::new(VoiceChannel::new(client.clone(), twilio.clone())),
                ChannelConfig::Actuator { url, payload } => {
                    Arc::new(ActuatorChannel::new(client.clone(), url.clone(), payload.clone()))
                }
                ChannelConfig::Siren { sound_path } => Arc::new(SirenChannel::new(sound_path.clone())),
            })
        })
        .collect()
}

/// Turn a non-2xx response into a channel error carrying the body.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ChannelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ChannelError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_config_json() {
        let json = r#"[
            {"type": "console"},
            {"type": "store", "path": "alerts.jsonl"},
            {"type": "actuator", "url": "https://maker.example/trigger/lock"},
            {"type": "sms", "account_sid": "AC1", "auth_token": "t", "from": "+1", "to": "+2"}
        ]"#;
        let configs: Vec<ChannelConfig> = serde_json::from_str(json).unwrap();

        assert_eq!(configs[0], ChannelConfig::Console);
        assert_eq!(configs[1].kind(), ChannelKind::Store);
        match &configs[2] {
            ChannelConfig::Actuator { payload, .. } => {
                assert_eq!(payload, &serde_json::json!({ "value1": "lock" }));
            }
            other => panic!("unexpected config {:?}", other),
        }
        assert_eq!(configs[3].kind(), ChannelKind::Sms);
    }

    #[test]
    fn test_build_channels_keeps_order() {
        let configs = vec![
            ChannelConfig::Console,
            ChannelConfig::Store {
                path: PathBuf::from("alerts.jsonl"),
            },
            ChannelConfig::Actuator {
                url: "http://localhost/lock".to_string(),
                payload: default_actuator_payload(),
            },
        ];
        let channels = build_channels(&configs, &reqwest::Client::new()).unwrap();
        let names: Vec<&str> = channels.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["console", "store", "actuator"]);
    }

    #[test]
    fn test_invalid_channel_rejected() {
        let configs = vec![ChannelConfig::Actuator {
            url: String::new(),
            payload: Value::Null,
        }];
        assert!(matches!(
            build_channels(&configs, &reqwest::Client::new()),
            Err(ConfigError::InvalidChannel { .. })
        ));
    }

    #[cfg(not(feature = "siren"))]
    #[test]
    fn test_siren_requires_feature() {
        let config = ChannelConfig::Siren {
            sound_path: PathBuf::from("alarm.mp3"),
        };
        assert!(matches!(config.validate(), Err(ConfigError::UnsupportedChannel(_))));
    }
}
