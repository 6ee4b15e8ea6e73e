//! Encoder process capability
//!
//! The controller only talks to the encoder through [`EncoderProcess`]: three
//! escalating stop requests and a wait. [`FfmpegLauncher`] spawns the real
//! subprocess; tests substitute scripted processes.

use super::ffmpeg::EncoderCommand;
use super::platform;
use async_trait::async_trait;
use std::fs::File;
use std::io;
use std::process::Stdio;
use tokio::process::{Child, Command};

#[async_trait]
pub trait EncoderProcess: Send {
    /// OS process id, `None` once reaped
    fn id(&self) -> Option<u32>;

    /// Ask the encoder to finish writing and exit
    fn request_graceful_stop(&mut self) -> io::Result<()>;

    /// Ask the encoder to exit now
    fn request_force_stop(&mut self) -> io::Result<()>;

    /// Kill unconditionally and reap
    async fn kill(&mut self) -> io::Result<()>;

    /// Wait for exit; returns the exit code when there is one
    async fn wait(&mut self) -> io::Result<Option<i32>>;
}

pub trait EncoderLauncher: Send + Sync {
    /// Spawn `command` with stdout and stderr appended to `log`
    fn launch(&self, command: &EncoderCommand, log: File) -> io::Result<Box<dyn EncoderProcess>>;
}

/// Spawns real encoder subprocesses
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegLauncher;

impl EncoderLauncher for FfmpegLauncher {
    fn launch(&self, command: &EncoderCommand, log: File) -> io::Result<Box<dyn EncoderProcess>> {
        let stderr_log = log.try_clone()?;

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(stderr_log))
            .kill_on_drop(true);
        platform::configure(&mut cmd);

        let child = cmd.spawn()?;
        tracing::debug!("Spawned {} with pid {:?}", command.program, child.id());

        Ok(Box::new(FfmpegProcess { child }))
    }
}

pub struct FfmpegProcess {
    child: Child,
}

#[async_trait]
impl EncoderProcess for FfmpegProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn request_graceful_stop(&mut self) -> io::Result<()> {
        platform::send_interrupt(&self.child)
    }

    fn request_force_stop(&mut self) -> io::Result<()> {
        platform::send_terminate(&mut self.child)
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }

    async fn wait(&mut self) -> io::Result<Option<i32>> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn log_file(dir: &std::path::Path) -> File {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("log.txt"))
            .unwrap()
    }

    #[tokio::test]
    async fn test_interrupt_stops_real_process() {
        let dir = tempdir().unwrap();
        let command = EncoderCommand::new("sleep", vec!["30".to_string()]);
        let mut process = FfmpegLauncher.launch(&command, log_file(dir.path())).unwrap();
        assert!(process.id().is_some());

        process.request_graceful_stop().unwrap();
        let code = tokio::time::timeout(Duration::from_secs(5), process.wait())
            .await
            .expect("process should exit on SIGINT")
            .unwrap();
        // Killed by a signal, so no exit code
        assert_eq!(code, None);
    }

    #[tokio::test]
    async fn test_kill_reaps_process() {
        let dir = tempdir().unwrap();
        let command = EncoderCommand::new("sleep", vec!["30".to_string()]);
        let mut process = FfmpegLauncher.launch(&command, log_file(dir.path())).unwrap();

        process.kill().await.unwrap();
        assert!(process.id().is_none());
    }

    #[tokio::test]
    async fn test_output_goes_to_log() {
        let dir = tempdir().unwrap();
        let command = EncoderCommand::new(
            "sh",
            vec!["-c".to_string(), "echo out; echo err 1>&2".to_string()],
        );
        let mut process = FfmpegLauncher.launch(&command, log_file(dir.path())).unwrap();
        assert_eq!(process.wait().await.unwrap(), Some(0));

        let log = std::fs::read_to_string(dir.path().join("log.txt")).unwrap();
        assert!(log.contains("out"));
        assert!(log.contains("err"));
    }

    #[test]
    fn test_missing_binary_fails_to_launch() {
        let dir = tempdir().unwrap();
        let command = EncoderCommand::new("/nonexistent/ffmpeg", vec![]);
        let rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = rt.enter();
        assert!(FfmpegLauncher.launch(&command, log_file(dir.path())).is_err());
    }
}
