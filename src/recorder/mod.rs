//! Recording system module
//!
//! This module supervises the external encoder:
//! - RecordingController owning the single recording session
//! - EncoderProcess capability with per-platform stop signalling
//! - FFmpeg command construction for stream capture

pub mod controller;
pub mod ffmpeg;
mod platform;
pub mod process;
pub mod state;

pub use controller::{RecordingController, SharedController};
pub use ffmpeg::EncoderCommand;
pub use process::{EncoderLauncher, EncoderProcess, FfmpegLauncher};
pub use state::{
    EncoderConfig, RecorderError, RecordingResponse, RecordingStatus, SessionPhase, ShutdownPath,
    ShutdownTimeouts, StopReport,
};
