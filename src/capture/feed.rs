//! JSON-lines pose feed
//!
//! An external hand tracker writes one JSON object per processed frame:
//!
//! ```text
//! {"fingers":[1,1,1,1,1],"handedness":"Right"}
//! {"landmarks":[{"x":0.41,"y":0.62,"z":0.0}, ...21 entries],"handedness":"Left"}
//! {}
//! ```
//!
//! An object with neither `fingers` nor `landmarks` means no hand was found.

use super::traits::{CaptureError, FrameSource, PoseClassifier};
use crate::gesture::{FingerState, HandPose, Handedness, Landmark};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

/// One frame worth of tracker output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    #[serde(default)]
    pub fingers: Option<[u8; 5]>,
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
    #[serde(default)]
    pub handedness: Handedness,
}

impl PoseFrame {
    pub fn parse(line: &str) -> Result<Self, CaptureError> {
        serde_json::from_str(line)
            .map_err(|e| CaptureError::FrameReadFailure(format!("invalid pose line: {}", e)))
    }
}

/// Reads [`PoseFrame`]s line by line
pub struct PoseFeed<R> {
    lines: Lines<R>,
    /// Tracker process, killed when the feed is dropped
    child: Option<Child>,
    source: String,
}

impl<R: AsyncBufRead + Unpin + Send> PoseFeed<R> {
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            lines: reader.lines(),
            child: None,
            source: source.into(),
        }
    }
}

impl PoseFeed<BufReader<tokio::io::Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), "stdin")
    }
}

impl PoseFeed<BufReader<ChildStdout>> {
    /// Spawn a tracker command and read its stdout.
    ///
    /// The command line is split on whitespace; the tracker's stderr is
    /// inherited so its diagnostics stay visible.
    pub fn spawn(command_line: &str) -> Result<Self, CaptureError> {
        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| CaptureError::SourceUnavailable("empty tracker command".to_string()))?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CaptureError::SourceUnavailable(format!("failed to start '{}': {}", command_line, e))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            CaptureError::SourceUnavailable("failed to capture tracker stdout".to_string())
        })?;

        tracing::info!("Started pose tracker: {}", command_line);

        let mut feed = Self::new(BufReader::new(stdout), command_line);
        feed.child = Some(child);
        Ok(feed)
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> FrameSource for PoseFeed<R> {
    type Frame = PoseFrame;

    async fn next_frame(&mut self) -> Result<Option<PoseFrame>, CaptureError> {
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| CaptureError::FrameReadFailure(e.to_string()))?;

            match line {
                None => {
                    tracing::info!("Pose feed '{}' ended", self.source);
                    if let Some(child) = self.child.as_mut() {
                        if let Ok(Some(status)) = child.try_wait() {
                            tracing::info!("Pose tracker exited with {}", status);
                        }
                    }
                    return Ok(None);
                }
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => return PoseFrame::parse(line.trim()).map(Some),
            }
        }
    }
}

/// Reads the hand pose straight out of a [`PoseFrame`]
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedClassifier;

impl PoseClassifier<PoseFrame> for FeedClassifier {
    fn classify(&mut self, frame: &PoseFrame) -> Option<HandPose> {
        let fingers = match (&frame.fingers, &frame.landmarks) {
            (Some(bits), _) => FingerState::from_bits(*bits),
            (None, Some(landmarks)) => FingerState::from_landmarks(landmarks, frame.handedness)?,
            (None, None) => return None,
        };
        Some(HandPose::new(fingers, frame.handedness))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::GestureLabel;

    #[tokio::test]
    async fn test_reads_frames_until_end() {
        let input = "{\"fingers\":[1,1,1,1,1]}\n\n{}\n{\"fingers\":[0,0,0,0,0],\"handedness\":\"Left\"}\n";
        let mut feed = PoseFeed::new(input.as_bytes(), "test");

        let first = feed.next_frame().await.unwrap().unwrap();
        assert_eq!(first.fingers, Some([1, 1, 1, 1, 1]));
        assert_eq!(first.handedness, Handedness::Right);

        let empty = feed.next_frame().await.unwrap().unwrap();
        assert_eq!(empty, PoseFrame::default());

        let last = feed.next_frame().await.unwrap().unwrap();
        assert_eq!(last.handedness, Handedness::Left);

        assert!(feed.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_line_is_read_failure_and_feed_continues() {
        let input = "not json\n{\"fingers\":[0,0,0,0,0]}\n";
        let mut feed = PoseFeed::new(input.as_bytes(), "test");

        let err = feed.next_frame().await.unwrap_err();
        assert!(matches!(err, CaptureError::FrameReadFailure(_)));

        let frame = feed.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.fingers, Some([0, 0, 0, 0, 0]));
    }

    #[test]
    fn test_classifier_prefers_finger_vector() {
        let frame = PoseFrame {
            fingers: Some([1, 1, 1, 1, 1]),
            landmarks: Some(vec![]),
            handedness: Handedness::Right,
        };
        let pose = FeedClassifier.classify(&frame).unwrap();
        assert_eq!(pose.label(), GestureLabel::OpenPalm);
    }

    #[test]
    fn test_classifier_uses_landmarks() {
        // Every tip below its joint, thumb tip right of IP on a right hand
        let mut landmarks = vec![Landmark { x: 0.5, y: 0.5, z: 0.0 }; 21];
        landmarks[4].x = 0.6;
        for tip in [8usize, 12, 16, 20] {
            landmarks[tip].y = 0.8;
        }
        let frame = PoseFrame {
            fingers: None,
            landmarks: Some(landmarks),
            handedness: Handedness::Right,
        };
        let pose = FeedClassifier.classify(&frame).unwrap();
        assert_eq!(pose.label(), GestureLabel::Fist);
    }

    #[test]
    fn test_classifier_no_hand() {
        assert!(FeedClassifier.classify(&PoseFrame::default()).is_none());
    }
}
