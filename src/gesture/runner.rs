//! Gesture loop
//!
//! Drives frame source → classifier → hysteresis → state machine on a single
//! task. Confirmed intents are delivered on spawned tasks so a slow stop never
//! stalls frame processing; outcomes come back over a channel and are folded
//! into the state machine on a later frame.

use super::hysteresis::{DetectionHysteresis, DEFAULT_HOLD_WINDOW};
use super::intent::{DeliveryReceipt, Intent, IntentError, IntentSink};
use super::state_machine::{GesturePhase, GestureStateMachine, DEFAULT_CONFIRM_WINDOW};
use crate::capture::{FrameSource, PoseClassifier};
use crate::utils::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

type Delivery = (Intent, Result<DeliveryReceipt, IntentError>);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSettings {
    pub confirm_window: Duration,
    pub hold_window: Duration,
    /// Classify one frame out of every `frame_skip`
    pub frame_skip: u32,
    /// Delay before reading again after a failed frame read
    pub read_retry: Duration,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            confirm_window: DEFAULT_CONFIRM_WINDOW,
            hold_window: DEFAULT_HOLD_WINDOW,
            frame_skip: 2,
            read_retry: Duration::from_millis(200),
        }
    }
}

/// What happened during a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub classified: u64,
    pub read_failures: u64,
    pub intents: Vec<Intent>,
    pub delivery_failures: u64,
    pub final_phase: GesturePhase,
}

pub struct GestureRunner<S, C> {
    source: S,
    classifier: C,
    hysteresis: DetectionHysteresis,
    machine: GestureStateMachine,
    settings: GestureSettings,
}

impl<S, C> GestureRunner<S, C>
where
    S: FrameSource,
    C: PoseClassifier<S::Frame>,
{
    pub fn new(source: S, classifier: C, settings: GestureSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            classifier,
            hysteresis: DetectionHysteresis::new(settings.hold_window, clock.clone()),
            machine: GestureStateMachine::new(settings.confirm_window, clock),
            settings,
        }
    }

    /// Process frames until the source ends or `shutdown` resolves.
    ///
    /// An intent still in flight when the loop ends is awaited so its outcome
    /// is reflected in the summary.
    pub async fn run<F>(mut self, sink: Arc<dyn IntentSink>, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Delivery>();
        let mut summary = RunSummary::default();
        let mut last_status = String::new();
        let skip = u64::from(self.settings.frame_skip.max(1));

        tokio::pin!(shutdown);

        loop {
            let next = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Gesture loop shutting down");
                    break;
                }
                next = self.source.next_frame() => next,
            };

            let frame = match next {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!("Frame source ended");
                    break;
                }
                Err(e) => {
                    summary.read_failures += 1;
                    tracing::warn!("{}, retrying in {:?}", e, self.settings.read_retry);
                    tokio::select! {
                        _ = &mut shutdown => {
                            tracing::info!("Gesture loop shutting down");
                            break;
                        }
                        _ = tokio::time::sleep(self.settings.read_retry) => continue,
                    }
                }
            };

            while let Ok((intent, result)) = rx.try_recv() {
                self.finish(intent, result, &mut summary);
            }

            summary.frames += 1;
            let label = if summary.frames % skip == 0 {
                summary.classified += 1;
                let detection = self.classifier.classify(&frame);
                self.hysteresis.observe(detection)
            } else {
                self.hysteresis.current()
            };

            if let Some(intent) = self.machine.tick(label) {
                summary.intents.push(intent);
                let sink = sink.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = sink.deliver(intent).await;
                    let _ = tx.send((intent, result));
                });
            }

            if self.machine.status() != last_status {
                last_status = self.machine.status().to_string();
                tracing::info!("[{:?}] {}", self.machine.phase(), last_status);
            }
        }

        drop(tx);
        if self.machine.pending().is_some() {
            if let Some((intent, result)) = rx.recv().await {
                self.finish(intent, result, &mut summary);
            }
        }

        summary.final_phase = self.machine.phase();
        summary
    }

    fn finish(
        &mut self,
        intent: Intent,
        result: Result<DeliveryReceipt, IntentError>,
        summary: &mut RunSummary,
    ) {
        let outcome = match result {
            Ok(receipt) => {
                tracing::info!("{} delivered (file: {:?})", intent, receipt.file);
                Ok(())
            }
            Err(e) => {
                summary.delivery_failures += 1;
                Err(e)
            }
        };
        self.machine.complete(intent, outcome);
    }
}
