//! Error types and handling
//!
//! Common error types used across the application.

use crate::recorder::RecorderError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Recording error: {0}")]
    Recording(#[from] RecorderError),
}

/// Error payload returned by the recording endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `"error"`
    pub status: String,
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl From<&RecorderError> for ErrorResponse {
    fn from(error: &RecorderError) -> Self {
        let code = match error {
            RecorderError::AlreadyRecording => "ALREADY_RECORDING",
            RecorderError::NotRecording => "NOT_RECORDING",
            RecorderError::LaunchFailure(_) => "LAUNCH_FAILURE",
            RecorderError::ShutdownTimeout { .. } => "SHUTDOWN_TIMEOUT",
            RecorderError::EmptyOutputFile(_) => "EMPTY_OUTPUT_FILE",
            RecorderError::Io(_) => "IO_ERROR",
        };
        ErrorResponse::new(code, error.to_string())
    }
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        if let AppError::Recording(inner) = &error {
            return ErrorResponse::from(inner);
        }

        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Recording(_) => "RECORDING_ERROR",
        };

        ErrorResponse::new(code, error.to_string())
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_errors_map_to_codes() {
        let resp = ErrorResponse::from(&RecorderError::AlreadyRecording);
        assert_eq!(resp.status, "error");
        assert_eq!(resp.code, "ALREADY_RECORDING");
        assert_eq!(resp.message, "Already recording");

        let resp = ErrorResponse::from(AppError::from(RecorderError::NotRecording));
        assert_eq!(resp.code, "NOT_RECORDING");
        assert_eq!(resp.message, "No recording in progress");
    }

    #[test]
    fn test_config_error_response() {
        let resp = ErrorResponse::from(AppError::Config("frame skip must be positive".into()));
        assert_eq!(resp.code, "CONFIG_ERROR");
        assert!(resp.message.contains("frame skip"));
    }
}
