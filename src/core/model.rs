use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Stable identifier for every condition the engine can evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionId {
    /// Person lingering inside the door zone
    Loitering,
    /// Both wrists raised above the nose
    HandsUp,
    /// Hips and knees dropped low in the frame
    Crouch,
    /// Hips level with shoulders
    LyingDown,
    /// Recognized speech contains a panic keyword
    PanicKeyword,
    /// Knife or gun visible
    WeaponVisible,
    /// Face covered by a mask
    MaskedFace,
}

impl ConditionId {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loitering => "Loitering",
            Self::HandsUp => "Hands Up",
            Self::Crouch => "Crouching",
            Self::LyingDown => "Lying Down",
            Self::PanicKeyword => "Panic Keyword",
            Self::WeaponVisible => "Weapon Visible",
            Self::MaskedFace => "Masked Face",
        }
    }

    pub fn all() -> &'static [ConditionId] {
        &[
            Self::Loitering,
            Self::HandsUp,
            Self::Crouch,
            Self::LyingDown,
            Self::PanicKeyword,
            Self::WeaponVisible,
            Self::MaskedFace,
        ]
    }
}

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One normalized upstream tick for one condition.
///
/// `timestamp` is monotonic time since engine start, taken from the engine
/// clock when the frame was normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSignal {
    pub condition: ConditionId,
    pub present: bool,
    pub timestamp: Duration,
    /// Optional context from the classifier (matched label, keyword)
    pub detail: Option<String>,
}

impl RawSignal {
    pub fn new(condition: ConditionId, present: bool, timestamp: Duration) -> Self {
        Self {
            condition,
            present,
            timestamp,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Hold-time tracker output for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    None,
    Confirmed,
    Cleared,
}

/// Axis-aligned box in pixel coordinates, `(x1, y1)` top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }
}

/// One object detector hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// Normalized pose landmark; `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default = "full_visibility")]
    pub visibility: f32,
}

fn full_visibility() -> f32 {
    1.0
}

/// The subset of pose landmarks the pose conditions read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseLandmarks {
    pub nose: Landmark,
    pub left_shoulder: Landmark,
    pub right_shoulder: Landmark,
    pub left_wrist: Landmark,
    pub right_wrist: Landmark,
    pub left_hip: Landmark,
    pub right_hip: Landmark,
    pub left_knee: Landmark,
    pub right_knee: Landmark,
}

/// One line of a perception feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PerceptionFrame {
    Vision {
        #[serde(default)]
        detections: Vec<Detection>,
    },
    Pose {
        #[serde(default)]
        landmarks: Option<PoseLandmarks>,
    },
    Audio {
        text: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_conditions_have_names() {
        for condition in ConditionId::all() {
            assert!(!condition.display_name().is_empty());
        }
    }

    #[test]
    fn test_frame_json_shape() {
        let line = r#"{"source":"vision","detections":[{"label":"person","confidence":0.9,"box":{"x1":250,"y1":150,"x2":350,"y2":350}}]}"#;
        let frame: PerceptionFrame = serde_json::from_str(line).unwrap();
        match frame {
            PerceptionFrame::Vision { detections } => {
                assert_eq!(detections.len(), 1);
                assert_eq!(detections[0].bbox.center(), (300.0, 250.0));
            }
            other => panic!("unexpected frame {:?}", other),
        }

        let audio: PerceptionFrame =
            serde_json::from_str(r#"{"source":"audio","text":"help me"}"#).unwrap();
        assert_eq!(
            audio,
            PerceptionFrame::Audio {
                text: "help me".to_string()
            }
        );
    }
}
