//! Recording endpoint routes

use crate::recorder::{
    RecorderError, RecordingController, RecordingResponse, RecordingStatus, SessionPhase,
    SharedController,
};
use crate::utils::ErrorResponse;
use parking_lot::RwLock;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Managed state for the recording routes
pub struct RecorderState {
    pub controller: SharedController,
    /// Read by `/status` without waiting on a start/stop in progress
    pub status: Arc<RwLock<RecordingStatus>>,
}

impl RecorderState {
    pub fn new(controller: RecordingController) -> Self {
        let status = controller.status_handle();
        Self {
            controller: controller.into_shared(),
            status,
        }
    }
}

type ApiResult<T> = Result<Json<T>, (Status, Json<ErrorResponse>)>;

fn error_reply(error: &RecorderError) -> (Status, Json<ErrorResponse>) {
    let status = match error {
        RecorderError::AlreadyRecording | RecorderError::NotRecording => Status::BadRequest,
        _ => Status::InternalServerError,
    };
    (status, Json(ErrorResponse::from(error)))
}

/// Start a new recording session
#[rocket::get("/start-recording")]
pub async fn start_recording(state: &State<RecorderState>) -> ApiResult<RecordingResponse> {
    let mut controller = state.controller.lock().await;
    match controller.start().await {
        Ok(file) => Ok(Json(RecordingResponse::started(&file))),
        Err(e) => {
            tracing::warn!("Start rejected: {}", e);
            Err(error_reply(&e))
        }
    }
}

/// Stop the active session and report the file it wrote
#[rocket::get("/stop-recording")]
pub async fn stop_recording(state: &State<RecorderState>) -> ApiResult<RecordingResponse> {
    let mut controller = state.controller.lock().await;
    match controller.stop().await {
        Ok(report) => Ok(Json(RecordingResponse::stopped(&report.file))),
        Err(e) => {
            tracing::warn!("Stop rejected: {}", e);
            Err(error_reply(&e))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub recording: bool,
    pub phase: SessionPhase,
    pub file: Option<String>,
    pub started_at: Option<String>,
    pub elapsed_ms: Option<u64>,
}

impl From<&RecordingStatus> for StatusResponse {
    fn from(status: &RecordingStatus) -> Self {
        Self {
            recording: status.is_recording(),
            phase: status.phase,
            file: status.file.as_ref().map(|f| f.to_string_lossy().to_string()),
            started_at: status.started_at.map(|t| t.to_rfc3339()),
            elapsed_ms: status.elapsed_ms(),
        }
    }
}

#[rocket::get("/status")]
pub fn recording_status(state: &State<RecorderState>) -> Json<StatusResponse> {
    Json(StatusResponse::from(&*state.status.read()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::recorder::{EncoderCommand, EncoderConfig, EncoderLauncher, EncoderProcess, ShutdownTimeouts};
    use async_trait::async_trait;
    use rocket::local::asynchronous::Client;
    use std::fs::File;
    use std::io;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    /// Encoder that writes its output and exits on the first stop request
    struct QuickProcess {
        output: PathBuf,
        exited: bool,
    }

    #[async_trait]
    impl EncoderProcess for QuickProcess {
        fn id(&self) -> Option<u32> {
            (!self.exited).then_some(1)
        }

        fn request_graceful_stop(&mut self) -> io::Result<()> {
            std::fs::write(&self.output, b"mp4")?;
            self.exited = true;
            Ok(())
        }

        fn request_force_stop(&mut self) -> io::Result<()> {
            self.exited = true;
            Ok(())
        }

        async fn kill(&mut self) -> io::Result<()> {
            self.exited = true;
            Ok(())
        }

        async fn wait(&mut self) -> io::Result<Option<i32>> {
            Ok(Some(0))
        }
    }

    struct QuickLauncher {
        fail: bool,
    }

    impl EncoderLauncher for QuickLauncher {
        fn launch(&self, command: &EncoderCommand, _log: File) -> io::Result<Box<dyn EncoderProcess>> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::NotFound, "ffmpeg not found"));
            }
            Ok(Box::new(QuickProcess {
                output: PathBuf::from(command.args.last().cloned().unwrap_or_default()),
                exited: false,
            }))
        }
    }

    async fn client(fail: bool) -> (TempDir, Client) {
        let dir = tempdir().unwrap();
        let config = EncoderConfig {
            record_folder: dir.path().to_path_buf(),
            ..EncoderConfig::default()
        };
        let controller = RecordingController::with_launcher(
            config,
            ShutdownTimeouts::default(),
            Arc::new(QuickLauncher { fail }),
        );
        let rocket = crate::commands::build_rocket(RecorderState::new(controller), &AppConfig::default());
        let client = Client::tracked(rocket).await.unwrap();
        (dir, client)
    }

    #[rocket::async_test]
    async fn test_start_stop_cycle() {
        let (_dir, client) = client(false).await;

        let response = client.get("/start-recording").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let started: RecordingResponse = response.into_json().await.unwrap();
        assert_eq!(started.status, "started");
        let file = started.file.unwrap();
        assert!(file.ends_with(".mp4"));

        let status: StatusResponse = client.get("/status").dispatch().await.into_json().await.unwrap();
        assert!(status.recording);
        assert_eq!(status.file.as_deref(), Some(file.as_str()));

        let response = client.get("/stop-recording").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let stopped: RecordingResponse = response.into_json().await.unwrap();
        assert_eq!(stopped.status, "stopped");
        assert_eq!(stopped.file.as_deref(), Some(file.as_str()));

        let status: StatusResponse = client.get("/status").dispatch().await.into_json().await.unwrap();
        assert!(!status.recording);
        assert_eq!(status.phase, SessionPhase::None);
    }

    #[rocket::async_test]
    async fn test_double_start_is_bad_request() {
        let (_dir, client) = client(false).await;

        client.get("/start-recording").dispatch().await;
        let response = client.get("/start-recording").dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);
        let body: ErrorResponse = response.into_json().await.unwrap();
        assert_eq!(body.code, "ALREADY_RECORDING");
        assert_eq!(body.message, "Already recording");
    }

    #[rocket::async_test]
    async fn test_stop_when_idle_is_bad_request() {
        let (_dir, client) = client(false).await;

        let response = client.get("/stop-recording").dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);
        let body: ErrorResponse = response.into_json().await.unwrap();
        assert_eq!(body.code, "NOT_RECORDING");
    }

    #[rocket::async_test]
    async fn test_launch_failure_is_server_error() {
        let (_dir, client) = client(true).await;

        let response = client.get("/start-recording").dispatch().await;
        assert_eq!(response.status(), Status::InternalServerError);
        let body: ErrorResponse = response.into_json().await.unwrap();
        assert_eq!(body.code, "LAUNCH_FAILURE");

        let status: StatusResponse = client.get("/status").dispatch().await.into_json().await.unwrap();
        assert!(!status.recording);
    }

    #[rocket::async_test]
    async fn test_server_shutdown_stops_active_recording() {
        let (dir, client) = client(false).await;

        let started: RecordingResponse = client
            .get("/start-recording")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        let file = PathBuf::from(started.file.unwrap());

        let rocket = client.terminate().await;
        let state = rocket.state::<RecorderState>().unwrap();
        assert!(!state.status.read().is_recording());
        assert!(!state.controller.lock().await.is_recording());
        assert!(file.starts_with(dir.path()));
        assert_eq!(std::fs::read(&file).unwrap(), b"mp4");
    }
}
