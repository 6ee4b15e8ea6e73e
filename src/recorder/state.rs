//! Recording state management
//!
//! Session lifecycle, encoder settings, stop reports and the error type of the
//! recording controller.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Already recording")]
    AlreadyRecording,

    #[error("No recording in progress")]
    NotRecording,

    #[error("Encoder failed to launch: {0}")]
    LaunchFailure(String),

    /// Escalation taken during stop; logged, never returned
    #[error("Encoder did not exit within {waited:?} after {stage} request")]
    ShutdownTimeout { stage: &'static str, waited: Duration },

    /// Post-stop verification failed; logged, never returned
    #[error("Recording failed or empty file: {0}")]
    EmptyOutputFile(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lifecycle of one encoder session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    /// No session
    #[default]
    None,
    Launching,
    Active,
    StoppingGraceful,
    StoppingForced,
    Killed,
    Exited,
}

/// How the encoder ended up exiting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPath {
    /// Exited after the interrupt request
    Graceful,
    /// Exited after the terminate request
    Forced,
    /// Killed unconditionally
    Killed,
}

/// Encoder invocation settings, fixed for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoderConfig {
    /// Path or name of the ffmpeg binary
    pub ffmpeg_path: String,
    /// Network stream to record
    pub stream_url: String,
    /// RTSP transport (`tcp`/`udp`); omitted when `None`
    pub rtsp_transport: Option<String>,
    /// Directory receiving recordings and the diagnostic log
    pub record_folder: PathBuf,
    /// AAC bitrate, e.g. `128k`
    pub audio_bitrate: String,
    /// Output file name prefix
    pub file_prefix: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            stream_url: "rtsp://127.0.0.1:8554/stream".to_string(),
            rtsp_transport: Some("tcp".to_string()),
            record_folder: PathBuf::from("api_recordings"),
            audio_bitrate: "128k".to_string(),
            file_prefix: "capture".to_string(),
        }
    }
}

/// Bounded waits used by the stop sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownTimeouts {
    /// Wait after the interrupt request
    pub graceful: Duration,
    /// Wait after the terminate request
    pub forced: Duration,
}

impl Default for ShutdownTimeouts {
    fn default() -> Self {
        Self {
            graceful: Duration::from_secs(8),
            forced: Duration::from_secs(3),
        }
    }
}

/// Outcome of a completed stop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopReport {
    pub session_id: Uuid,
    /// File the encoder was writing; always reported, valid or not
    pub file: PathBuf,
    pub shutdown: ShutdownPath,
    pub exit_code: Option<i32>,
    /// Size on disk after exit, `None` if the file is missing
    pub file_size: Option<u64>,
    pub duration_ms: u64,
}

impl StopReport {
    /// Exists and is non-empty. Says nothing about container validity.
    pub fn has_output(&self) -> bool {
        self.file_size.map(|size| size > 0).unwrap_or(false)
    }
}

/// Snapshot of the controller readable without taking the controller lock
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStatus {
    pub phase: SessionPhase,
    pub session_id: Option<Uuid>,
    pub file: Option<PathBuf>,
    pub started_at: Option<DateTime<Local>>,
}

impl RecordingStatus {
    pub fn is_recording(&self) -> bool {
        self.session_id.is_some()
    }

    pub fn elapsed_ms(&self) -> Option<u64> {
        self.started_at
            .map(|t| (Local::now() - t).num_milliseconds().max(0) as u64)
    }
}

/// Payload of the start/stop endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingResponse {
    /// `started`, `stopped` or `error`
    pub status: String,
    #[serde(default, alias = "file_saved", skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RecordingResponse {
    pub fn started(file: &std::path::Path) -> Self {
        Self {
            status: "started".to_string(),
            file: Some(file.to_string_lossy().to_string()),
            message: None,
        }
    }

    pub fn stopped(file: &std::path::Path) -> Self {
        Self {
            status: "stopped".to_string(),
            file: Some(file.to_string_lossy().to_string()),
            message: None,
        }
    }
}
