//! Intent delivery
//!
//! Confirmed gestures leave the state machine as [`Intent`]s. An
//! [`IntentSink`] carries them to the recording controller, either over HTTP
//! to the recording endpoint or by calling a shared controller directly.

use crate::recorder::{RecordingResponse, SharedController};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Logical request emitted by the gesture state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Start,
    Stop,
}

impl Intent {
    /// Endpoint path serving this intent
    pub fn path(&self) -> &'static str {
        match self {
            Intent::Start => "/start-recording",
            Intent::Stop => "/stop-recording",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Start => f.write_str("START"),
            Intent::Stop => f.write_str("STOP"),
        }
    }
}

#[derive(Error, Debug)]
pub enum IntentError {
    #[error("Upstream call failed: {0}")]
    UpstreamCallFailure(String),
}

impl From<reqwest::Error> for IntentError {
    fn from(e: reqwest::Error) -> Self {
        IntentError::UpstreamCallFailure(e.to_string())
    }
}

/// Successful delivery of an intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub intent: Intent,
    /// File reported by the controller
    pub file: Option<String>,
}

#[async_trait]
pub trait IntentSink: Send + Sync {
    async fn deliver(&self, intent: Intent) -> Result<DeliveryReceipt, IntentError>;
}

/// Delivers intents to a remote recording endpoint
pub struct HttpIntentSink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIntentSink {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, IntentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, intent: Intent) -> String {
        format!("{}{}", self.base_url, intent.path())
    }
}

#[async_trait]
impl IntentSink for HttpIntentSink {
    async fn deliver(&self, intent: Intent) -> Result<DeliveryReceipt, IntentError> {
        let url = self.url_for(intent);
        tracing::debug!("Sending {} to {}", intent, url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        interpret_response(intent, status.as_u16(), &body)
    }
}

/// Turn an endpoint reply into a delivery result
pub(crate) fn interpret_response(
    intent: Intent,
    status: u16,
    body: &str,
) -> Result<DeliveryReceipt, IntentError> {
    let parsed: Option<RecordingResponse> = serde_json::from_str(body).ok();

    if !(200..300).contains(&status) {
        let message = parsed
            .and_then(|r| r.message)
            .unwrap_or_else(|| body.trim().to_string());
        return Err(IntentError::UpstreamCallFailure(format!(
            "HTTP {}: {}",
            status, message
        )));
    }

    Ok(DeliveryReceipt {
        intent,
        file: parsed.and_then(|r| r.file),
    })
}

/// Delivers intents to a controller living in the same process
pub struct ControllerIntentSink {
    controller: SharedController,
}

impl ControllerIntentSink {
    pub fn new(controller: SharedController) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl IntentSink for ControllerIntentSink {
    async fn deliver(&self, intent: Intent) -> Result<DeliveryReceipt, IntentError> {
        let mut controller = self.controller.lock().await;
        let file = match intent {
            Intent::Start => controller.start().await,
            Intent::Stop => controller.stop().await.map(|report| report.file),
        }
        .map_err(|e| IntentError::UpstreamCallFailure(e.to_string()))?;

        Ok(DeliveryReceipt {
            intent,
            file: Some(file.to_string_lossy().to_string()),
        })
    }
}
