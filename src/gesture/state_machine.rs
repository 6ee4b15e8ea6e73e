//! Gesture confirmation state machine
//!
//! Converts smoothed per-frame gesture labels into START/STOP intents. A
//! transition needs two deliberate steps: an open palm arms a countdown and a
//! fist before the deadline confirms it.
//!
//! ```text
//!  IDLE --palm--> CONFIRM_START --fist--> (START) --ok--> RECORDING
//!   ^                  |                    |                |
//!   +----timeout-------+<------failed-------+              palm
//!                                                            v
//!  IDLE <--ok-- (STOP) <--fist-- CONFIRM_STOP <--------------+
//!                  |                  |
//!                  +--failed--> RECORDING <--timeout
//! ```

use super::intent::{Intent, IntentError};
use super::types::GestureLabel;
use crate::utils::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default time allowed between the open palm and the confirming fist
pub const DEFAULT_CONFIRM_WINDOW: Duration = Duration::from_secs(3);

/// Phase of the gesture state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GesturePhase {
    #[default]
    Idle,
    ConfirmStart,
    Recording,
    ConfirmStop,
}

impl GesturePhase {
    /// Whether a recording is believed to be running in this phase
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording | Self::ConfirmStop)
    }
}

/// The single mutable state of the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GestureState {
    pub phase: GesturePhase,
    pub countdown_deadline: Option<Instant>,
}

pub struct GestureStateMachine {
    state: GestureState,
    confirm_window: Duration,
    clock: Arc<dyn Clock>,
    /// Intent emitted and not yet completed
    pending: Option<Intent>,
    status: String,
}

impl GestureStateMachine {
    pub fn new(confirm_window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: GestureState::default(),
            confirm_window,
            clock,
            pending: None,
            status: idle_status(),
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn phase(&self) -> GesturePhase {
        self.state.phase
    }

    /// Intent whose outcome has not been reported yet
    pub fn pending(&self) -> Option<Intent> {
        self.pending
    }

    /// Human-readable status for the current phase
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Time left on the confirmation countdown, if one is running
    pub fn remaining(&self) -> Option<Duration> {
        self.state
            .countdown_deadline
            .map(|deadline| deadline.saturating_duration_since(self.clock.now()))
    }

    /// Advance the machine with the label observed on this frame.
    ///
    /// Returns the intent to deliver when a countdown is confirmed. The caller
    /// must report the delivery outcome through [`complete`](Self::complete);
    /// until then every tick is a no-op.
    pub fn tick(&mut self, label: GestureLabel) -> Option<Intent> {
        if self.pending.is_some() {
            return None;
        }

        let now = self.clock.now();

        match self.state.phase {
            GesturePhase::Idle => {
                self.status = idle_status();
                if label == GestureLabel::OpenPalm {
                    self.arm(now, GesturePhase::ConfirmStart);
                    self.status = format!(
                        "OPEN PALM detected, make FIST within {:.0}s to START",
                        self.confirm_window.as_secs_f64()
                    );
                }
                None
            }
            GesturePhase::ConfirmStart => match self.remaining_at(now) {
                None => {
                    self.transition(GesturePhase::Idle);
                    self.status = "Timeout. Show OPEN PALM again.".to_string();
                    None
                }
                Some(_) if label == GestureLabel::Fist => {
                    self.status = "Starting recording...".to_string();
                    self.emit(Intent::Start)
                }
                Some(remaining) => {
                    self.status = format!("Make FIST to START ({:.1}s)", remaining.as_secs_f64());
                    None
                }
            },
            GesturePhase::Recording => {
                self.status = recording_status();
                if label == GestureLabel::OpenPalm {
                    self.arm(now, GesturePhase::ConfirmStop);
                    self.status = format!(
                        "OPEN PALM detected, make FIST within {:.0}s to STOP",
                        self.confirm_window.as_secs_f64()
                    );
                }
                None
            }
            GesturePhase::ConfirmStop => match self.remaining_at(now) {
                None => {
                    self.transition(GesturePhase::Recording);
                    self.status = "Timeout. Continue recording.".to_string();
                    None
                }
                Some(_) if label == GestureLabel::Fist => {
                    self.status = "Stopping recording...".to_string();
                    self.emit(Intent::Stop)
                }
                Some(remaining) => {
                    self.status = format!("Make FIST to STOP ({:.1}s)", remaining.as_secs_f64());
                    None
                }
            },
        }
    }

    /// Report the delivery outcome of the pending intent.
    ///
    /// Success moves to the next resting phase; failure reverts to the resting
    /// phase held before the countdown started.
    pub fn complete(&mut self, intent: Intent, outcome: Result<(), IntentError>) -> GesturePhase {
        if self.pending != Some(intent) {
            tracing::warn!(
                "Ignoring outcome for {} while pending is {:?}",
                intent,
                self.pending
            );
            return self.state.phase;
        }
        self.pending = None;

        match (intent, outcome) {
            (Intent::Start, Ok(())) => {
                self.transition(GesturePhase::Recording);
                self.status = "Recording STARTED".to_string();
            }
            (Intent::Start, Err(e)) => {
                tracing::error!("Start request failed: {}", e);
                self.transition(GesturePhase::Idle);
                self.status = "Start request failed".to_string();
            }
            (Intent::Stop, Ok(())) => {
                self.transition(GesturePhase::Idle);
                self.status = "Recording STOPPED".to_string();
            }
            (Intent::Stop, Err(e)) => {
                tracing::error!("Stop request failed: {}", e);
                self.transition(GesturePhase::Recording);
                self.status = "Stop request failed".to_string();
            }
        }

        self.state.phase
    }

    fn arm(&mut self, now: Instant, phase: GesturePhase) {
        self.transition(phase);
        self.state.countdown_deadline = Some(now + self.confirm_window);
    }

    fn emit(&mut self, intent: Intent) -> Option<Intent> {
        tracing::info!("Gesture confirmed, emitting {}", intent);
        self.pending = Some(intent);
        Some(intent)
    }

    /// Remaining countdown, `None` once the deadline has been reached
    fn remaining_at(&self, now: Instant) -> Option<Duration> {
        self.state
            .countdown_deadline
            .and_then(|deadline| deadline.checked_duration_since(now))
            .filter(|remaining| !remaining.is_zero())
    }

    fn transition(&mut self, to: GesturePhase) {
        let from = self.state.phase;
        if from != to {
            tracing::info!("Gesture phase {:?} -> {:?}", from, to);
        }
        self.state.phase = to;
        if matches!(to, GesturePhase::Idle | GesturePhase::Recording) {
            self.state.countdown_deadline = None;
        }
    }
}

fn idle_status() -> String {
    "Show OPEN PALM to start recording...".to_string()
}

fn recording_status() -> String {
    "Recording... Show OPEN PALM to stop.".to_string()
}
