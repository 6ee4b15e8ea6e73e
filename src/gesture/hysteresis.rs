//! Detection hysteresis
//!
//! Keeps the last positive hand detection alive for a short hold window so a
//! dropped frame does not read as "hand withdrawn" and reset a countdown.

use super::types::{GestureLabel, HandPose};
use crate::utils::Clock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default grace period after a lost detection
pub const DEFAULT_HOLD_WINDOW: Duration = Duration::from_millis(500);

pub struct DetectionHysteresis {
    hold_window: Duration,
    clock: Arc<dyn Clock>,
    retained: Option<HandPose>,
    last_refresh: Option<Instant>,
}

impl DetectionHysteresis {
    pub fn new(hold_window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            hold_window,
            clock,
            retained: None,
            last_refresh: None,
        }
    }

    /// Feed the classifier result for a sampled frame and get the smoothed label
    pub fn observe(&mut self, detection: Option<HandPose>) -> GestureLabel {
        let now = self.clock.now();

        match detection {
            Some(pose) => {
                self.retained = Some(pose);
                self.last_refresh = Some(now);
            }
            None => {
                let expired = self
                    .last_refresh
                    .map(|t| now.saturating_duration_since(t) > self.hold_window)
                    .unwrap_or(true);
                if expired && self.retained.is_some() {
                    tracing::debug!("Hand lost for more than {:?}, dropping pose", self.hold_window);
                    self.retained = None;
                }
            }
        }

        self.current()
    }

    /// Label of the retained pose, without refreshing or expiring it.
    ///
    /// Used on frames the caller skips for throughput.
    pub fn current(&self) -> GestureLabel {
        self.retained
            .map(|pose| pose.label())
            .unwrap_or(GestureLabel::None)
    }

    /// Pose currently held, if any
    pub fn retained(&self) -> Option<&HandPose> {
        self.retained.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::types::{FingerState, Handedness};
    use crate::utils::ManualClock;

    fn setup() -> (ManualClock, DetectionHysteresis) {
        let clock = ManualClock::new();
        let hysteresis = DetectionHysteresis::new(DEFAULT_HOLD_WINDOW, Arc::new(clock.clone()));
        (clock, hysteresis)
    }

    fn palm() -> Option<HandPose> {
        Some(HandPose::new(FingerState::OPEN, Handedness::Right))
    }

    #[test]
    fn test_positive_detection_is_classified() {
        let (_, mut h) = setup();
        assert_eq!(h.observe(palm()), GestureLabel::OpenPalm);
        let fist = HandPose::new(FingerState::CLOSED, Handedness::Left);
        assert_eq!(h.observe(Some(fist)), GestureLabel::Fist);
    }

    #[test]
    fn test_holds_label_through_window() {
        let (clock, mut h) = setup();
        assert_eq!(h.observe(palm()), GestureLabel::OpenPalm);

        for _ in 0..5 {
            clock.advance(Duration::from_millis(100));
            assert_eq!(h.observe(None), GestureLabel::OpenPalm);
        }

        clock.advance(Duration::from_millis(1));
        assert_eq!(h.observe(None), GestureLabel::None);
        assert!(h.retained().is_none());
    }

    #[test]
    fn test_refresh_extends_window() {
        let (clock, mut h) = setup();
        h.observe(palm());
        clock.advance(Duration::from_millis(400));
        h.observe(palm());
        clock.advance(Duration::from_millis(400));
        assert_eq!(h.observe(None), GestureLabel::OpenPalm);
    }

    #[test]
    fn test_no_detection_ever_is_none() {
        let (_, mut h) = setup();
        assert_eq!(h.observe(None), GestureLabel::None);
    }

    #[test]
    fn test_unrecognised_pose_is_none_not_error() {
        let (_, mut h) = setup();
        let pointing = HandPose::new(FingerState::from_bits([0, 1, 0, 0, 0]), Handedness::Right);
        assert_eq!(h.observe(Some(pointing)), GestureLabel::None);
        assert!(h.retained().is_some());
    }

    #[test]
    fn test_current_does_not_expire() {
        let (clock, mut h) = setup();
        h.observe(palm());
        clock.advance(Duration::from_secs(2));
        assert_eq!(h.current(), GestureLabel::OpenPalm);
        assert_eq!(h.observe(None), GestureLabel::None);
    }
}
