//! Gesture types
//!
//! Hand poses as reported by the classifier and the labels derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of hand landmarks produced by the tracker
pub const LANDMARK_COUNT: usize = 21;

/// Gesture recognised from a single hand pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GestureLabel {
    /// All five fingers extended
    OpenPalm,
    /// No finger extended
    Fist,
    /// No hand, or a pose that is neither of the above
    None,
}

impl GestureLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenPalm => "OPEN_PALM",
            Self::Fist => "FIST",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which hand was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    #[default]
    Right,
}

/// Normalized landmark position (image coordinates, origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

/// Extension state of thumb, index, middle, ring and pinky
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FingerState(pub [bool; 5]);

impl FingerState {
    pub const OPEN: FingerState = FingerState([true; 5]);
    pub const CLOSED: FingerState = FingerState([false; 5]);

    /// Build from a 0/1 vector as emitted by trackers
    pub fn from_bits(bits: [u8; 5]) -> Self {
        let mut fingers = [false; 5];
        for (slot, bit) in fingers.iter_mut().zip(bits) {
            *slot = bit != 0;
        }
        Self(fingers)
    }

    /// Derive finger extension from 21 hand landmarks.
    ///
    /// The thumb is compared horizontally against its IP joint, mirrored for
    /// the left hand. The other fingers are extended when the tip sits above
    /// the PIP joint. Returns `None` when fewer than 21 landmarks are given.
    pub fn from_landmarks(landmarks: &[Landmark], handedness: Handedness) -> Option<Self> {
        if landmarks.len() < LANDMARK_COUNT {
            return None;
        }

        let mut fingers = [false; 5];
        fingers[0] = match handedness {
            Handedness::Right => landmarks[4].x < landmarks[3].x,
            Handedness::Left => landmarks[4].x > landmarks[3].x,
        };
        for (slot, tip) in [8usize, 12, 16, 20].into_iter().enumerate() {
            fingers[slot + 1] = landmarks[tip].y < landmarks[tip - 2].y;
        }

        Some(Self(fingers))
    }

    pub fn classify(&self) -> GestureLabel {
        if *self == Self::OPEN {
            GestureLabel::OpenPalm
        } else if *self == Self::CLOSED {
            GestureLabel::Fist
        } else {
            GestureLabel::None
        }
    }
}

/// A positive hand detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandPose {
    pub fingers: FingerState,
    pub handedness: Handedness,
}

impl HandPose {
    pub fn new(fingers: FingerState, handedness: Handedness) -> Self {
        Self { fingers, handedness }
    }

    pub fn label(&self) -> GestureLabel {
        self.fingers.classify()
    }
}
