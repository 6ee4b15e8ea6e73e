//! Application configuration
//!
//! Settings come from an optional JSON file; any field left out takes its
//! default. Command-line flags are applied on top by the binary.

use crate::gesture::GestureSettings;
use crate::recorder::{EncoderConfig, ShutdownTimeouts};
use crate::utils::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Slack the HTTP client allows on top of the worst-case stop escalation
const STOP_MARGIN_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Network stream recorded by the encoder
    pub stream_url: String,
    /// `tcp` or `udp`; `None` lets ffmpeg pick
    pub rtsp_transport: Option<String>,
    pub record_folder: PathBuf,
    pub ffmpeg_path: String,
    pub audio_bitrate: String,

    /// Recording endpoint listen address
    pub bind_address: IpAddr,
    pub port: u16,
    /// Where `watch` sends its intents
    pub endpoint_url: String,

    pub confirm_window_secs: f64,
    pub hold_window_secs: f64,
    pub frame_skip: u32,
    pub read_retry_ms: u64,

    pub graceful_timeout_secs: u64,
    pub force_timeout_secs: u64,
    /// Must outlast a stop that escalates all the way to a kill
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let encoder = EncoderConfig::default();
        let timeouts = ShutdownTimeouts::default();
        Self {
            stream_url: encoder.stream_url,
            rtsp_transport: encoder.rtsp_transport,
            record_folder: encoder.record_folder,
            ffmpeg_path: encoder.ffmpeg_path,
            audio_bitrate: encoder.audio_bitrate,
            bind_address: IpAddr::from([0, 0, 0, 0]),
            port: 5001,
            endpoint_url: "http://127.0.0.1:5001".to_string(),
            confirm_window_secs: 3.0,
            hold_window_secs: 0.5,
            frame_skip: 2,
            read_retry_ms: 200,
            graceful_timeout_secs: timeouts.graceful.as_secs(),
            force_timeout_secs: timeouts.forced.as_secs(),
            request_timeout_secs: timeouts.graceful.as_secs()
                + timeouts.forced.as_secs()
                + STOP_MARGIN_SECS,
        }
    }
}

impl AppConfig {
    /// Read `path` if given, otherwise use defaults. The result is validated.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Config(format!("Cannot read {}: {}", path.display(), e))
                })?;
                let config: Self = serde_json::from_str(&content)?;
                tracing::debug!("Loaded configuration from {}", path.display());
                config
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.stream_url.trim().is_empty() {
            return Err(AppError::Config("stream URL must not be empty".into()));
        }
        if self.frame_skip == 0 {
            return Err(AppError::Config("frame skip must be at least 1".into()));
        }
        for (name, secs) in [
            ("confirm window", self.confirm_window_secs),
            ("hold window", self.hold_window_secs),
        ] {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(AppError::Config(format!(
                    "{} must be a positive number of seconds, got {}",
                    name, secs
                )));
            }
        }
        let worst_case_stop = self
            .graceful_timeout_secs
            .saturating_add(self.force_timeout_secs);
        if self.request_timeout_secs <= worst_case_stop {
            return Err(AppError::Config(format!(
                "request timeout ({}s) must exceed graceful + force shutdown timeouts ({}s)",
                self.request_timeout_secs, worst_case_stop
            )));
        }
        Ok(())
    }

    pub fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig {
            ffmpeg_path: self.ffmpeg_path.clone(),
            stream_url: self.stream_url.clone(),
            rtsp_transport: self
                .rtsp_transport
                .clone()
                .filter(|transport| !transport.is_empty()),
            record_folder: self.record_folder.clone(),
            audio_bitrate: self.audio_bitrate.clone(),
            ..EncoderConfig::default()
        }
    }

    pub fn shutdown_timeouts(&self) -> ShutdownTimeouts {
        ShutdownTimeouts {
            graceful: Duration::from_secs(self.graceful_timeout_secs),
            forced: Duration::from_secs(self.force_timeout_secs),
        }
    }

    pub fn gesture_settings(&self) -> GestureSettings {
        let defaults = GestureSettings::default();
        GestureSettings {
            confirm_window: Duration::try_from_secs_f64(self.confirm_window_secs)
                .unwrap_or(defaults.confirm_window),
            hold_window: Duration::try_from_secs_f64(self.hold_window_secs)
                .unwrap_or(defaults.hold_window),
            frame_skip: self.frame_skip.max(1),
            read_retry: Duration::from_millis(self.read_retry_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.port, 5001);
        assert_eq!(config.record_folder, PathBuf::from("api_recordings"));

        let timeouts = config.shutdown_timeouts();
        assert_eq!(timeouts.graceful, Duration::from_secs(8));
        assert_eq!(timeouts.forced, Duration::from_secs(3));
        assert_eq!(config.request_timeout(), Duration::from_secs(16));
    }

    #[test]
    fn test_request_timeout_outlasts_stop_escalation() {
        let config = AppConfig::default();
        let timeouts = config.shutdown_timeouts();
        assert!(config.request_timeout() > timeouts.graceful + timeouts.forced);

        let equal = AppConfig {
            request_timeout_secs: 11,
            ..AppConfig::default()
        };
        assert!(matches!(equal.validate(), Err(AppError::Config(_))));

        let longer_stop = AppConfig {
            graceful_timeout_secs: 20,
            ..AppConfig::default()
        };
        let err = longer_stop.validate().unwrap_err();
        assert!(err.to_string().contains("must exceed"));

        let adjusted = AppConfig {
            graceful_timeout_secs: 20,
            request_timeout_secs: 30,
            ..AppConfig::default()
        };
        assert!(adjusted.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"{"streamUrl":"rtsp://10.0.0.5/live","port":8080,"confirmWindowSecs":2.5}"#,
        );
        let config = AppConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.stream_url, "rtsp://10.0.0.5/live");
        assert_eq!(config.port, 8080);
        assert_eq!(config.frame_skip, 2);
        assert_eq!(
            config.gesture_settings().confirm_window,
            Duration::from_millis(2500)
        );
        assert_eq!(config.encoder_config().stream_url, "rtsp://10.0.0.5/live");
    }

    #[test]
    fn test_empty_transport_is_omitted() {
        let config = AppConfig {
            rtsp_transport: Some(String::new()),
            ..AppConfig::default()
        };
        assert_eq!(config.encoder_config().rtsp_transport, None);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let zero_skip = AppConfig {
            frame_skip: 0,
            ..AppConfig::default()
        };
        assert!(matches!(zero_skip.validate(), Err(AppError::Config(_))));

        let negative_window = AppConfig {
            hold_window_secs: -1.0,
            ..AppConfig::default()
        };
        assert!(negative_window.validate().is_err());

        let no_stream = AppConfig {
            stream_url: "  ".into(),
            ..AppConfig::default()
        };
        assert!(no_stream.validate().is_err());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let file = write_config("{not json");
        assert!(matches!(
            AppConfig::load(Some(file.path())),
            Err(AppError::Serialization(_))
        ));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
