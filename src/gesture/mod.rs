//! Gesture recognition and confirmation
//!
//! Per-frame hand poses are smoothed by [`DetectionHysteresis`], turned into
//! START/STOP intents by [`GestureStateMachine`] and handed to an
//! [`IntentSink`] by [`GestureRunner`].

pub mod hysteresis;
pub mod intent;
pub mod runner;
pub mod state_machine;
pub mod types;

pub use hysteresis::{DetectionHysteresis, DEFAULT_HOLD_WINDOW};
pub use intent::{
    ControllerIntentSink, DeliveryReceipt, HttpIntentSink, Intent, IntentError, IntentSink,
};
pub use runner::{GestureRunner, GestureSettings, RunSummary};
pub use state_machine::{GesturePhase, GestureState, GestureStateMachine, DEFAULT_CONFIRM_WINDOW};
pub use types::{
    FingerState, GestureLabel, HandPose, Handedness, Landmark, LANDMARK_COUNT,
};
