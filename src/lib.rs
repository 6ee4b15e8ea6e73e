//! Gesture Recorder - hands-free control of a network stream recorder.
//!
//! An open palm followed by a fist starts or stops an ffmpeg recording of a
//! camera stream. The crate provides the gesture pipeline, the recording
//! controller and the HTTP endpoint tying them together.

pub mod capture;
pub mod commands;
pub mod config;
pub mod gesture;
pub mod recorder;
pub mod utils;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gesture_recorder=debug,rocket=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
