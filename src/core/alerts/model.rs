// Alert model types: conditions, envelopes, and dispatch outcomes.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::location::Location;
use crate::core::model::ConditionId;

/// Validated, immutable timing configuration for one condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: ConditionId,
    pub hold: Duration,
    pub cooldown: Duration,
    pub message: String,
}

impl Condition {
    pub fn new(id: ConditionId, hold: Duration, cooldown: Duration) -> Self {
        Self {
            id,
            hold,
            cooldown,
            message: default_message(id).to_string(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

/// Built-in alert text per condition.
pub fn default_message(id: ConditionId) -> &'static str {
    match id {
        ConditionId::Loitering => "Suspicious loitering detected near door.",
        ConditionId::HandsUp => "Hands-up pose detected!",
        ConditionId::Crouch => "Crouching pose detected!",
        ConditionId::LyingDown => "Lying down pose detected!",
        ConditionId::PanicKeyword => "Panic alert! Immediate assistance needed.",
        ConditionId::WeaponVisible => "Weapon detected.",
        ConditionId::MaskedFace => "Person wearing a mask detected.",
    }
}

/// One confirmed, ready-to-deliver alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEnvelope {
    pub condition: ConditionId,
    pub message: String,
    /// Engine time of the confirming tick
    pub timestamp: Duration,
    /// Wall-clock time the envelope was assembled
    pub raised_at: DateTime<Utc>,
    pub detail: Option<String>,
    pub location: Option<Location>,
}

impl AlertEnvelope {
    pub fn location_text(&self) -> Option<String> {
        self.location.as_ref().map(Location::text)
    }

    /// Message plus detail, without location.
    pub fn headline(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{} ({})", self.message, detail),
            None => self.message.clone(),
        }
    }

    /// Headline followed by the location line when one is known.
    pub fn full_text(&self) -> String {
        match self.location_text() {
            Some(location) => format!("{}\nLocation: {}", self.headline(), location),
            None => self.headline(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Console,
    Store,
    Push,
    Sms,
    Voice,
    Actuator,
    Siren,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FailureReason {
    Timeout(Duration),
    Transport(String),
    Panicked,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(limit) => write!(f, "timed out after {}ms", limit.as_millis()),
            Self::Transport(reason) => f.write_str(reason),
            Self::Panicked => f.write_str("channel task panicked"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChannelOutcome {
    Delivered,
    Failed(FailureReason),
}

impl ChannelOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelReport {
    pub channel: String,
    pub kind: ChannelKind,
    pub outcome: ChannelOutcome,
}

/// Per-channel outcome of one envelope's delivery attempt, in channel order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub condition: ConditionId,
    pub timestamp: Duration,
    entries: Vec<ChannelReport>,
}

impl DispatchReport {
    pub fn new(condition: ConditionId, timestamp: Duration, entries: Vec<ChannelReport>) -> Self {
        Self {
            condition,
            timestamp,
            entries,
        }
    }

    pub fn entries(&self) -> &[ChannelReport] {
        &self.entries
    }

    pub fn outcome(&self, channel: &str) -> Option<&ChannelOutcome> {
        self.entries
            .iter()
            .find(|e| e.channel == channel)
            .map(|e| &e.outcome)
    }

    pub fn delivered_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_delivered()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChannelReport> {
        self.entries.iter().filter(|e| !e.outcome.is_delivered())
    }

    pub fn all_failed(&self) -> bool {
        self.delivered_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> AlertEnvelope {
        AlertEnvelope {
            condition: ConditionId::WeaponVisible,
            message: default_message(ConditionId::WeaponVisible).to_string(),
            timestamp: Duration::from_secs(3),
            raised_at: Utc::now(),
            detail: Some("knife".to_string()),
            location: None,
        }
    }

    #[test]
    fn test_all_conditions_have_messages() {
        for id in ConditionId::all() {
            assert!(!default_message(*id).is_empty());
        }
    }

    #[test]
    fn test_envelope_text_without_location() {
        let env = envelope();
        assert_eq!(env.headline(), "Weapon detected. (knife)");
        assert_eq!(env.full_text(), env.headline());
    }

    #[test]
    fn test_envelope_text_with_location() {
        let mut env = envelope();
        env.location = Some(Location::from_fix(12.5, 80.25, Some("Main St".to_string())));
        assert!(env
            .full_text()
            .ends_with("Location: Main St (https://maps.google.com/?q=12.5,80.25)"));
    }

    #[test]
    fn test_report_queries() {
        let report = DispatchReport::new(
            ConditionId::Loitering,
            Duration::from_secs(5),
            vec![
                ChannelReport {
                    channel: "sms".to_string(),
                    kind: ChannelKind::Sms,
                    outcome: ChannelOutcome::Delivered,
                },
                ChannelReport {
                    channel: "voice".to_string(),
                    kind: ChannelKind::Voice,
                    outcome: ChannelOutcome::Failed(FailureReason::Timeout(Duration::from_secs(2))),
                },
            ],
        );
        assert_eq!(report.delivered_count(), 1);
        assert!(!report.all_failed());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.outcome("sms"), Some(&ChannelOutcome::Delivered));
        assert_eq!(
            report.outcome("voice").map(|o| o.is_delivered()),
            Some(false)
        );
        assert_eq!(
            FailureReason::Timeout(Duration::from_secs(2)).to_string(),
            "timed out after 2000ms"
        );
    }
}
