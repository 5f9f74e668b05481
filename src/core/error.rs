//! Error types for the alerting pipeline
//!
//! Errors are classified by how far they may travel:
//! - ConfigError: fatal, surfaced before the tick loop starts
//! - SignalError: dropped and logged, never fatal
//! - ChannelError: isolated to one channel, recorded in the dispatch report
//! - LocationError: swallowed by the location service, envelope builds without it

use std::io;
use std::time::Duration;

use thiserror::Error;

use super::model::ConditionId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Condition {condition:?} is missing {field}")]
    MissingDuration {
        condition: ConditionId,
        field: &'static str,
    },

    #[error("Condition {condition:?} has invalid {field}: {value}")]
    InvalidDuration {
        condition: ConditionId,
        field: &'static str,
        value: f64,
    },

    #[error("No conditions are enabled")]
    NoConditions,

    #[error("At least one alert channel must be configured")]
    NoChannels,

    #[error("Per-channel timeout must be greater than zero")]
    InvalidTimeout,

    #[error("Location lookup timeout must be greater than zero when location is enabled")]
    InvalidLocationTimeout,

    #[error("Invalid zone: ({x1}, {y1}) - ({x2}, {y2})")]
    InvalidZone { x1: f32, y1: f32, x2: f32, y2: f32 },

    #[error("Threshold {name} must be within 0..=1, got {value}")]
    InvalidThreshold { name: String, value: f32 },

    #[error("Channel {0} is not supported in this build")]
    UnsupportedChannel(String),

    #[error("Channel {channel} is misconfigured: {reason}")]
    InvalidChannel { channel: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("Unknown or disabled condition: {0:?}")]
    UnknownCondition(ConditionId),

    #[error("Out-of-order tick for {condition:?}: {at:?} is before {last:?}")]
    OutOfOrder {
        condition: ConditionId,
        at: Duration,
        last: Duration,
    },

    #[error("Malformed feed line: {0}")]
    Malformed(String),

    #[error("Engine is shutting down")]
    ShuttingDown,
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Playback error: {0}")]
    Playback(String),
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Device query failed: {0}")]
    Device(String),

    #[error("No location fix in device output")]
    NoFix,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected lookup payload: {0}")]
    Payload(String),
}
