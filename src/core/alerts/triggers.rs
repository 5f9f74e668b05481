// Trigger evaluation for perception frames.
//
// Each frame from a perception pipeline is reduced to one presence signal per
// condition it can speak for. Frames never carry opinions about conditions
// owned by another pipeline, so a pose frame leaves loitering untouched.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::core::model::{ConditionId, Detection, Landmark, PerceptionFrame, PoseLandmarks, RawSignal};

/// Rectangular zone in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Zone {
    /// Strict containment; points on the edge are outside.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.x1 < x && x < self.x2 && self.y1 < y && y < self.y2
    }
}

impl Default for Zone {
    fn default() -> Self {
        Self {
            x1: 200.0,
            y1: 100.0,
            x2: 400.0,
            y2: 400.0,
        }
    }
}

fn check_threshold(name: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold {
            name: name.to_string(),
            value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Door zone a person must stand in to count toward loitering
    pub zone: Zone,
    pub person_label: String,
    pub person_confidence: f32,
    pub weapon_labels: Vec<String>,
    pub weapon_confidence: f32,
    pub mask_label: String,
    pub mask_confidence: f32,
    /// Per-label overrides of the thresholds above
    pub label_thresholds: HashMap<String, f32>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            zone: Zone::default(),
            person_label: "person".to_string(),
            person_confidence: 0.5,
            weapon_labels: vec!["knife".to_string(), "gun".to_string()],
            weapon_confidence: 0.4,
            mask_label: "mask".to_string(),
            mask_confidence: 0.5,
            label_thresholds: HashMap::new(),
        }
    }
}

impl VisionConfig {
    fn threshold(&self, label: &str, fallback: f32) -> f32 {
        self.label_thresholds.get(label).copied().unwrap_or(fallback)
    }

    fn passes(&self, detection: &Detection, label: &str, fallback: f32) -> bool {
        detection.label == label && detection.confidence > self.threshold(label, fallback)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let zone = self.zone;
        if !(zone.x1 < zone.x2 && zone.y1 < zone.y2) {
            return Err(ConfigError::InvalidZone {
                x1: zone.x1,
                y1: zone.y1,
                x2: zone.x2,
                y2: zone.y2,
            });
        }
        check_threshold("person_confidence", self.person_confidence)?;
        check_threshold("weapon_confidence", self.weapon_confidence)?;
        check_threshold("mask_confidence", self.mask_confidence)?;
        for (label, value) in &self.label_thresholds {
            check_threshold(label, *value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    /// Landmarks below this visibility are ignored
    pub visibility_floor: f32,
    pub crouch_hip_floor: f32,
    pub crouch_knee_floor: f32,
    /// Max hip/shoulder height gap for a lying body
    pub lying_tolerance: f32,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            visibility_floor: 0.5,
            crouch_hip_floor: 0.55,
            crouch_knee_floor: 0.7,
            lying_tolerance: 0.1,
        }
    }
}

impl PoseConfig {
    fn visible(&self, landmarks: &[&Landmark]) -> bool {
        landmarks.iter().all(|l| l.visibility > self.visibility_floor)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_threshold("visibility_floor", self.visibility_floor)?;
        check_threshold("crouch_hip_floor", self.crouch_hip_floor)?;
        check_threshold("crouch_knee_floor", self.crouch_knee_floor)?;
        check_threshold("lying_tolerance", self.lying_tolerance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub keywords: Vec<String>,
    /// Treat each matching utterance as a separate event
    pub release_after_utterance: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let keywords = [
            "help",
            "emergency",
            "please help",
            "danger",
            "fire",
            "bachao",
            "sos",
            "save me",
        ];
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            release_after_utterance: true,
        }
    }
}

impl AudioConfig {
    fn matched_keyword(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.keywords
            .iter()
            .find(|k| lowered.contains(k.to_lowercase().as_str()))
            .map(String::as_str)
    }
}

/// Normalizes perception frames into per-condition presence signals.
#[derive(Debug, Clone, Default)]
pub struct SignalAdapter {
    pub vision: VisionConfig,
    pub pose: PoseConfig,
    pub audio: AudioConfig,
}

impl SignalAdapter {
    pub fn new(vision: VisionConfig, pose: PoseConfig, audio: AudioConfig) -> Self {
        Self { vision, pose, audio }
    }

    pub fn normalize(&self, frame: &PerceptionFrame, now: Duration) -> Vec<RawSignal> {
        match frame {
            PerceptionFrame::Vision { detections } => self.vision_signals(detections, now),
            PerceptionFrame::Pose { landmarks } => match landmarks {
                Some(landmarks) => self.pose_signals(landmarks, now),
                None => Vec::new(),
            },
            PerceptionFrame::Audio { text } => self.audio_signals(text, now),
        }
    }

    fn vision_signals(&self, detections: &[Detection], now: Duration) -> Vec<RawSignal> {
        let cfg = &self.vision;

        let in_zone = detections.iter().any(|d| {
            let (cx, cy) = d.bbox.center();
            cfg.passes(d, &cfg.person_label, cfg.person_confidence) && cfg.zone.contains(cx, cy)
        });

        let weapon = detections.iter().find(|d| {
            cfg.weapon_labels
                .iter()
                .any(|label| cfg.passes(d, label, cfg.weapon_confidence))
        });

        let masked = detections
            .iter()
            .any(|d| cfg.passes(d, &cfg.mask_label, cfg.mask_confidence));

        let weapon_signal = match weapon {
            Some(d) => RawSignal::new(ConditionId::WeaponVisible, true, now).with_detail(d.label.clone()),
            None => RawSignal::new(ConditionId::WeaponVisible, false, now),
        };

        vec![
            RawSignal::new(ConditionId::Loitering, in_zone, now),
            weapon_signal,
            RawSignal::new(ConditionId::MaskedFace, masked, now),
        ]
    }

    fn pose_signals(&self, lm: &PoseLandmarks, now: Duration) -> Vec<RawSignal> {
        let cfg = &self.pose;
        let mut signals = Vec::with_capacity(3);

        let avg_hip_y = (lm.left_hip.y + lm.right_hip.y) / 2.0;

        if cfg.visible(&[&lm.nose, &lm.left_wrist, &lm.right_wrist]) {
            let hands_up = lm.left_wrist.y < lm.nose.y && lm.right_wrist.y < lm.nose.y;
            signals.push(RawSignal::new(ConditionId::HandsUp, hands_up, now));
        }

        if cfg.visible(&[&lm.left_hip, &lm.right_hip, &lm.left_knee, &lm.right_knee]) {
            let avg_knee_y = (lm.left_knee.y + lm.right_knee.y) / 2.0;
            let crouch = avg_hip_y > cfg.crouch_hip_floor
                && avg_knee_y > cfg.crouch_knee_floor
                && avg_knee_y < avg_hip_y;
            signals.push(RawSignal::new(ConditionId::Crouch, crouch, now));
        }

        if cfg.visible(&[&lm.left_hip, &lm.right_hip, &lm.left_shoulder, &lm.right_shoulder]) {
            let avg_shoulder_y = (lm.left_shoulder.y + lm.right_shoulder.y) / 2.0;
            let lying = (avg_hip_y - avg_shoulder_y).abs() < cfg.lying_tolerance;
            signals.push(RawSignal::new(ConditionId::LyingDown, lying, now));
        }

        signals
    }

    fn audio_signals(&self, text: &str, now: Duration) -> Vec<RawSignal> {
        match self.audio.matched_keyword(text) {
            Some(keyword) => {
                let mut signals =
                    vec![RawSignal::new(ConditionId::PanicKeyword, true, now).with_detail(keyword)];
                if self.audio.release_after_utterance {
                    signals.push(RawSignal::new(ConditionId::PanicKeyword, false, now));
                }
                signals
            }
            None => vec![RawSignal::new(ConditionId::PanicKeyword, false, now)],
        }
    }
}
