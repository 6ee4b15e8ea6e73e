//! FFmpeg invocation for stream recording
//!
//! Builds the command line that copies the network stream's video track into
//! an MP4 container and transcodes audio to AAC.

use super::state::EncoderConfig;
use std::fmt;
use std::path::Path;

/// A fully resolved encoder command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EncoderCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Record `config.stream_url` into `output`
    pub fn record_stream(config: &EncoderConfig, output: &Path) -> Self {
        // No stdin: ffmpeg would otherwise read interactive keys from it
        let mut args = vec!["-nostdin".to_string()];

        if let Some(transport) = &config.rtsp_transport {
            args.extend(["-rtsp_transport".to_string(), transport.clone()]);
        }

        args.extend([
            "-i".to_string(),
            config.stream_url.clone(),
            // Never overwrite an existing recording
            "-n".to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "0:a:0?".to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            config.audio_bitrate.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]);

        args.push(output.to_string_lossy().to_string());

        Self::new(config.ffmpeg_path.clone(), args)
    }
}

impl fmt::Display for EncoderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn arg_after<'a>(cmd: &'a EncoderCommand, flag: &str) -> Option<&'a str> {
        cmd.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| cmd.args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_record_stream_args() {
        let config = EncoderConfig {
            stream_url: "rtsp://cam.local:554/live".to_string(),
            ..EncoderConfig::default()
        };
        let cmd = EncoderCommand::record_stream(&config, &PathBuf::from("out/capture.mp4"));

        assert_eq!(cmd.program, "ffmpeg");
        assert_eq!(arg_after(&cmd, "-rtsp_transport"), Some("tcp"));
        assert_eq!(arg_after(&cmd, "-i"), Some("rtsp://cam.local:554/live"));
        assert_eq!(arg_after(&cmd, "-c:v"), Some("copy"));
        assert_eq!(arg_after(&cmd, "-c:a"), Some("aac"));
        assert_eq!(arg_after(&cmd, "-b:a"), Some("128k"));
        assert_eq!(arg_after(&cmd, "-movflags"), Some("+faststart"));
        assert_eq!(cmd.args.last().map(String::as_str), Some("out/capture.mp4"));
        assert!(cmd.args.contains(&"-n".to_string()));
        assert!(!cmd.args.contains(&"-y".to_string()));
    }

    #[test]
    fn test_transport_is_optional() {
        let config = EncoderConfig {
            rtsp_transport: None,
            stream_url: "http://cam.local/stream.mjpg".to_string(),
            ..EncoderConfig::default()
        };
        let cmd = EncoderCommand::record_stream(&config, &PathBuf::from("a.mp4"));
        assert!(arg_after(&cmd, "-rtsp_transport").is_none());
        assert_eq!(cmd.args[0], "-nostdin");
        assert_eq!(cmd.args[1], "-i");
    }

    #[test]
    fn test_display_joins_args() {
        let cmd = EncoderCommand::new("ffmpeg", vec!["-i".into(), "x".into()]);
        assert_eq!(cmd.to_string(), "ffmpeg -i x");
    }
}
