use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::alerts::channels::ChannelConfig;
use super::alerts::model::Condition;
use super::alerts::triggers::{AudioConfig, PoseConfig, VisionConfig};
use super::error::ConfigError;
use super::model::ConditionId;

/// Per-condition timing as written in settings.
///
/// Durations are optional here so a missing value can be reported clearly
/// instead of silently defaulting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub hold_seconds: Option<f64>,
    pub cooldown_seconds: Option<f64>,
    /// Overrides the built-in alert text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl ConditionSettings {
    fn timed(hold_seconds: f64, cooldown_seconds: f64) -> Self {
        Self {
            enabled: true,
            hold_seconds: Some(hold_seconds),
            cooldown_seconds: Some(cooldown_seconds),
            message: None,
        }
    }
}

fn default_conditions() -> BTreeMap<ConditionId, ConditionSettings> {
    BTreeMap::from([
        (ConditionId::Loitering, ConditionSettings::timed(5.0, 10.0)),
        (ConditionId::HandsUp, ConditionSettings::timed(5.0, 3.0)),
        (ConditionId::Crouch, ConditionSettings::timed(5.0, 3.0)),
        (ConditionId::LyingDown, ConditionSettings::timed(0.0, 3.0)),
        (ConditionId::PanicKeyword, ConditionSettings::timed(0.0, 10.0)),
        (ConditionId::WeaponVisible, ConditionSettings::timed(0.0, 10.0)),
        (ConditionId::MaskedFace, ConditionSettings::timed(0.0, 10.0)),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherSettings {
    pub per_channel_timeout_ms: u64,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            per_channel_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub enabled: bool,
    pub adb_path: Option<PathBuf>,
    pub ip_lookup_url: Option<String>,
    pub reverse_geocode_url: Option<String>,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            adb_path: Some(PathBuf::from("adb")),
            ip_lookup_url: Some("http://ip-api.com/json".to_string()),
            reverse_geocode_url: Some("https://nominatim.openstreetmap.org/reverse".to_string()),
            user_agent: "guardpost-location".to_string(),
            timeout_ms: 5_000,
        }
    }
}

/// A perception feed file written by an upstream pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub path: PathBuf,
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
    /// Replay existing lines instead of starting at end of file
    #[serde(default)]
    pub from_start: bool,
}

fn default_poll_ms() -> u64 {
    100
}

fn default_channels() -> Vec<ChannelConfig> {
    vec![
        ChannelConfig::Console,
        ChannelConfig::Store {
            path: PathBuf::from("alerts.jsonl"),
        },
    ]
}

/// Application settings as persisted in settings.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_conditions")]
    pub conditions: BTreeMap<ConditionId, ConditionSettings>,
    #[serde(default)]
    pub dispatcher: DispatcherSettings,
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelConfig>,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub pose: PoseConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            conditions: default_conditions(),
            dispatcher: DispatcherSettings::default(),
            channels: default_channels(),
            vision: VisionConfig::default(),
            pose: PoseConfig::default(),
            audio: AudioConfig::default(),
            location: LocationConfig::default(),
            feeds: Vec::new(),
        }
    }
}

/// Settings that passed validation; everything the engine needs at start.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub conditions: Vec<Condition>,
    pub per_channel_timeout: Duration,
    pub channels: Vec<ChannelConfig>,
}

fn parse_duration(condition: ConditionId, field: &'static str, value: Option<f64>) -> Result<Duration, ConfigError> {
    let seconds = value.ok_or(ConfigError::MissingDuration { condition, field })?;
    if seconds < 0.0 {
        return Err(ConfigError::InvalidDuration {
            condition,
            field,
            value: seconds,
        });
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| ConfigError::InvalidDuration {
        condition,
        field,
        value: seconds,
    })
}

impl Settings {
    /// Check every option and produce the immutable engine configuration.
    pub fn validate(&self) -> Result<EngineConfig, ConfigError> {
        let mut conditions = Vec::new();
        for (id, settings) in &self.conditions {
            if !settings.enabled {
                continue;
            }
            let hold = parse_duration(*id, "hold_seconds", settings.hold_seconds)?;
            let cooldown = parse_duration(*id, "cooldown_seconds", settings.cooldown_seconds)?;
            let mut condition = Condition::new(*id, hold, cooldown);
            if let Some(message) = &settings.message {
                condition = condition.with_message(message.clone());
            }
            conditions.push(condition);
        }
        if conditions.is_empty() {
            return Err(ConfigError::NoConditions);
        }

        if self.channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        for channel in &self.channels {
            channel.validate()?;
        }

        if self.dispatcher.per_channel_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.location.enabled && self.location.timeout_ms == 0 {
            return Err(ConfigError::InvalidLocationTimeout);
        }

        self.vision.validate()?;
        self.pose.validate()?;

        Ok(EngineConfig {
            conditions,
            per_channel_timeout: Duration::from_millis(self.dispatcher.per_channel_timeout_ms),
            channels: self.channels.clone(),
        })
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for `settings.json` inside `config_dir`.
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            config_path: config_dir.join("settings.json"),
        }
    }

    /// Manager for an explicit settings file.
    pub fn at(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load settings; a missing file yields defaults, a broken one is an error.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            log::info!(
                "No settings at {}, using defaults",
                self.config_path.display()
            );
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(&self.config_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.config_path, content)?;
        Ok(())
    }
}
