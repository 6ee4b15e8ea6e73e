//! Capture trait definitions
//!
//! Seams between the gesture loop and whatever produces frames and hand
//! poses. Frame acquisition and landmark inference live outside this crate.

use crate::gesture::HandPose;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    /// Transient; the loop backs off and reads again
    #[error("Frame read failed: {0}")]
    FrameReadFailure(String),

    #[error("Capture source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Produces frames for the gesture loop
#[async_trait]
pub trait FrameSource: Send {
    type Frame: Send;

    /// Next frame, or `None` once the source has ended
    async fn next_frame(&mut self) -> Result<Option<Self::Frame>, CaptureError>;
}

/// Per-frame hand detection
pub trait PoseClassifier<F>: Send {
    /// Returns `None` when no hand is visible
    fn classify(&mut self, frame: &F) -> Option<HandPose>;
}
