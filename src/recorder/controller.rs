//! Recording controller
//!
//! Owns the encoder subprocess and guarantees at most one recording session.
//! Stopping escalates from an interrupt to a terminate request to a kill, and
//! always leaves the controller without a session.

use super::ffmpeg::EncoderCommand;
use super::process::{EncoderLauncher, EncoderProcess, FfmpegLauncher};
use super::state::{
    EncoderConfig, RecorderError, RecordingStatus, SessionPhase, ShutdownPath, ShutdownTimeouts,
    StopReport,
};
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Name of the append-only encoder log inside the record folder
pub const DIAGNOSTIC_LOG_NAME: &str = "ffmpeg_log.txt";

/// Controller shared between the endpoint and the gesture loop.
///
/// The lock is held for the whole of `start`/`stop`, so the two never
/// interleave.
pub type SharedController = Arc<tokio::sync::Mutex<RecordingController>>;

/// One live encoder invocation
struct RecordingSession {
    id: Uuid,
    target_file: PathBuf,
    process: Box<dyn EncoderProcess>,
    started_at: Instant,
}

pub struct RecordingController {
    config: EncoderConfig,
    timeouts: ShutdownTimeouts,
    launcher: Arc<dyn EncoderLauncher>,
    session: Option<RecordingSession>,
    status: Arc<RwLock<RecordingStatus>>,
}

impl RecordingController {
    /// Controller spawning real ffmpeg processes
    pub fn new(config: EncoderConfig, timeouts: ShutdownTimeouts) -> Self {
        Self::with_launcher(config, timeouts, Arc::new(FfmpegLauncher))
    }

    pub fn with_launcher(
        config: EncoderConfig,
        timeouts: ShutdownTimeouts,
        launcher: Arc<dyn EncoderLauncher>,
    ) -> Self {
        Self {
            config,
            timeouts,
            launcher,
            session: None,
            status: Arc::new(RwLock::new(RecordingStatus::default())),
        }
    }

    /// Wrap in the shared handle used across tasks
    pub fn into_shared(self) -> SharedController {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Status cell readable while a slow stop holds the controller lock
    pub fn status_handle(&self) -> Arc<RwLock<RecordingStatus>> {
        self.status.clone()
    }

    pub fn status(&self) -> RecordingStatus {
        self.status.read().clone()
    }

    /// Launch the encoder and return the file it writes to.
    ///
    /// Success means the process was spawned, not that the file will be valid.
    pub async fn start(&mut self) -> Result<PathBuf, RecorderError> {
        if self.session.is_some() {
            tracing::warn!("Start requested while already recording");
            return Err(RecorderError::AlreadyRecording);
        }

        self.set_phase(SessionPhase::Launching);

        match self.launch() {
            Ok(session) => {
                let file = session.target_file.clone();
                {
                    let mut status = self.status.write();
                    status.phase = SessionPhase::Active;
                    status.session_id = Some(session.id);
                    status.file = Some(file.clone());
                    status.started_at = Some(Local::now());
                }
                tracing::info!("Recording started: {:?} (session {})", file, session.id);
                self.session = Some(session);
                Ok(file)
            }
            Err(e) => {
                tracing::error!("Failed to start recording: {}", e);
                self.set_phase(SessionPhase::None);
                Err(e)
            }
        }
    }

    fn launch(&self) -> Result<RecordingSession, RecorderError> {
        let folder = &self.config.record_folder;
        fs::create_dir_all(folder)?;

        let target_file = allocate_output_path(folder, &self.config.file_prefix, Local::now());
        let command = EncoderCommand::record_stream(&self.config, &target_file);
        let id = Uuid::new_v4();

        let mut log = open_diagnostic_log(folder)?;
        writeln!(
            log,
            "\n=== session {} started {} ===\n{}",
            id,
            Local::now().to_rfc3339(),
            command
        )?;

        tracing::info!("Starting encoder: {}", command);

        let process = self
            .launcher
            .launch(&command, log)
            .map_err(|e| RecorderError::LaunchFailure(format!("{}: {}", command.program, e)))?;

        Ok(RecordingSession {
            id,
            target_file,
            process,
            started_at: Instant::now(),
        })
    }

    /// Stop the encoder and report the file it was writing.
    ///
    /// The session is cleared whichever shutdown path is taken. An empty or
    /// missing output file is logged but does not fail the call.
    pub async fn stop(&mut self) -> Result<StopReport, RecorderError> {
        let Some(mut session) = self.session.take() else {
            tracing::warn!("Stop requested while not recording");
            return Err(RecorderError::NotRecording);
        };

        tracing::info!("Stopping encoder for {:?}", session.target_file);

        let (shutdown, exit_code) =
            shut_down(session.process.as_mut(), self.timeouts, &self.status).await;

        let file_size = fs::metadata(&session.target_file).ok().map(|m| m.len());
        match file_size {
            Some(size) if size > 0 => {
                tracing::info!(
                    "Recording saved successfully: {:?} ({} bytes)",
                    session.target_file,
                    size
                );
            }
            _ => {
                let err = RecorderError::EmptyOutputFile(session.target_file.clone());
                tracing::error!("{}", err);
            }
        }

        *self.status.write() = RecordingStatus::default();

        Ok(StopReport {
            session_id: session.id,
            file: session.target_file,
            shutdown,
            exit_code,
            file_size,
            duration_ms: session.started_at.elapsed().as_millis() as u64,
        })
    }

    /// Stop any active session; used when the process is exiting
    pub async fn shutdown(&mut self) -> Option<StopReport> {
        if self.session.is_none() {
            return None;
        }
        tracing::info!("Stopping active recording before exit");
        self.stop().await.ok()
    }

    fn set_phase(&self, phase: SessionPhase) {
        set_phase(&self.status, phase);
    }
}

fn set_phase(status: &RwLock<RecordingStatus>, phase: SessionPhase) {
    tracing::debug!("Session phase -> {:?}", phase);
    status.write().phase = phase;
}

/// Interrupt, then terminate, then kill
async fn shut_down(
    process: &mut dyn EncoderProcess,
    timeouts: ShutdownTimeouts,
    status: &RwLock<RecordingStatus>,
) -> (ShutdownPath, Option<i32>) {
    set_phase(status, SessionPhase::StoppingGraceful);
    match process.request_graceful_stop() {
        Ok(()) => {
            if let Some(code) = wait_bounded(process, timeouts.graceful).await {
                set_phase(status, SessionPhase::Exited);
                return (ShutdownPath::Graceful, code);
            }
            tracing::warn!(
                "{}",
                RecorderError::ShutdownTimeout {
                    stage: "interrupt",
                    waited: timeouts.graceful,
                }
            );
        }
        Err(e) => tracing::error!("Failed to interrupt encoder: {}", e),
    }

    set_phase(status, SessionPhase::StoppingForced);
    match process.request_force_stop() {
        Ok(()) => {
            if let Some(code) = wait_bounded(process, timeouts.forced).await {
                set_phase(status, SessionPhase::Exited);
                return (ShutdownPath::Forced, code);
            }
            tracing::warn!(
                "{}",
                RecorderError::ShutdownTimeout {
                    stage: "terminate",
                    waited: timeouts.forced,
                }
            );
        }
        Err(e) => tracing::error!("Failed to terminate encoder: {}", e),
    }

    tracing::warn!("Killing encoder (pid {:?})", process.id());
    if let Err(e) = process.kill().await {
        tracing::error!("Failed to kill encoder: {}", e);
    }
    set_phase(status, SessionPhase::Killed);
    (ShutdownPath::Killed, None)
}

/// Wait for exit up to `limit`. `None` if still running (or the wait failed).
async fn wait_bounded(process: &mut dyn EncoderProcess, limit: Duration) -> Option<Option<i32>> {
    match tokio::time::timeout(limit, process.wait()).await {
        Ok(Ok(code)) => {
            tracing::info!("Encoder exited with code {:?}", code);
            Some(code)
        }
        Ok(Err(e)) => {
            tracing::error!("Failed to wait for encoder: {}", e);
            None
        }
        Err(_) => None,
    }
}

/// `<prefix>_YYYYmmdd_HHMMSS.mp4`, suffixed `_1`, `_2`... if already taken
pub fn allocate_output_path(folder: &Path, prefix: &str, at: DateTime<Local>) -> PathBuf {
    let stamp = at.format("%Y%m%d_%H%M%S");
    let candidate = folder.join(format!("{}_{}.mp4", prefix, stamp));
    if !candidate.exists() {
        return candidate;
    }

    (1u32..)
        .map(|n| folder.join(format!("{}_{}_{}.mp4", prefix, stamp, n)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Open the shared encoder log for appending; it is never truncated
pub fn open_diagnostic_log(folder: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(folder.join(DIAGNOSTIC_LOG_NAME))
}
