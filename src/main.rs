//! gesture-recorder - start and stop stream recordings with hand gestures

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gesture_recorder::capture::{FeedClassifier, FrameSource, PoseFeed, PoseFrame};
use gesture_recorder::commands::{build_rocket, recording::RecorderState};
use gesture_recorder::config::AppConfig;
use gesture_recorder::gesture::{
    ControllerIntentSink, GestureRunner, HttpIntentSink, IntentSink, RunSummary,
};
use gesture_recorder::recorder::RecordingController;
use gesture_recorder::utils::MonotonicClock;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "gesture-recorder", version, about = "Gesture-controlled stream recorder")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "GESTURE_RECORDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

/// Per-field overrides applied on top of the configuration file
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Stream to record
    #[arg(long, global = true, env = "GESTURE_RECORDER_STREAM_URL")]
    stream_url: Option<String>,

    /// Folder receiving recordings and the encoder log
    #[arg(long, global = true)]
    record_folder: Option<PathBuf>,

    /// ffmpeg binary
    #[arg(long, global = true)]
    ffmpeg_path: Option<String>,

    /// Endpoint listen address
    #[arg(long, global = true)]
    bind_address: Option<IpAddr>,

    /// Endpoint listen port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Endpoint the `watch` loop sends intents to
    #[arg(long, global = true, env = "GESTURE_RECORDER_ENDPOINT")]
    endpoint_url: Option<String>,

    /// Classify one frame out of every N
    #[arg(long, global = true)]
    frame_skip: Option<u32>,
}

impl Overrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(v) = self.stream_url {
            config.stream_url = v;
        }
        if let Some(v) = self.record_folder {
            config.record_folder = v;
        }
        if let Some(v) = self.ffmpeg_path {
            config.ffmpeg_path = v;
        }
        if let Some(v) = self.bind_address {
            config.bind_address = v;
        }
        if let Some(v) = self.port {
            config.port = v;
        }
        if let Some(v) = self.endpoint_url {
            config.endpoint_url = v;
        }
        if let Some(v) = self.frame_skip {
            config.frame_skip = v;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the recording endpoint
    Serve,
    /// Run the gesture loop against a remote recording endpoint
    Watch(FeedArgs),
    /// Serve the endpoint and run the gesture loop in one process
    Run(FeedArgs),
}

#[derive(Args, Debug)]
struct FeedArgs {
    /// Tracker command emitting pose JSON lines; stdin when omitted
    #[arg(long)]
    feed_cmd: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    gesture_recorder::init_tracing();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.overrides.apply(&mut config);
    config.validate()?;

    info!("Starting gesture-recorder v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Watch(feed) => watch(config, feed).await,
        Command::Run(feed) => run(config, feed).await,
    }
}

fn controller(config: &AppConfig) -> RecordingController {
    RecordingController::new(config.encoder_config(), config.shutdown_timeouts())
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let state = RecorderState::new(controller(&config));

    // The shutdown fairing stops any active session
    info!("Recording endpoint on {}:{}", config.bind_address, config.port);
    build_rocket(state, &config)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("recording endpoint failed: {}", e))?;
    Ok(())
}

async fn watch(config: AppConfig, feed: FeedArgs) -> anyhow::Result<()> {
    let sink = HttpIntentSink::new(config.endpoint_url.clone(), config.request_timeout())?;
    info!("Sending intents to {}", config.endpoint_url);

    let summary = gesture_loop(&config, feed, Arc::new(sink)).await?;
    report(&summary);
    Ok(())
}

async fn run(config: AppConfig, feed: FeedArgs) -> anyhow::Result<()> {
    let state = RecorderState::new(controller(&config));
    let shared = state.controller.clone();

    let rocket = build_rocket(state, &config)
        .ignite()
        .await
        .map_err(|e| anyhow::anyhow!("recording endpoint failed to start: {}", e))?;
    let server_shutdown = rocket.shutdown();
    let server = tokio::spawn(rocket.launch());
    info!("Recording endpoint on {}:{}", config.bind_address, config.port);

    let sink = ControllerIntentSink::new(shared);
    let result = gesture_loop(&config, feed, Arc::new(sink)).await;

    server_shutdown.notify();
    if let Err(e) = server.await.context("endpoint task panicked")? {
        tracing::error!("Recording endpoint failed: {}", e);
    }

    report(&result?);
    Ok(())
}

async fn gesture_loop(
    config: &AppConfig,
    feed: FeedArgs,
    sink: Arc<dyn IntentSink>,
) -> anyhow::Result<RunSummary> {
    let summary = match feed.feed_cmd {
        Some(command) => {
            let source = PoseFeed::spawn(&command)?;
            drive(config, source, sink).await
        }
        None => {
            info!("Reading poses from stdin");
            drive(config, PoseFeed::stdin(), sink).await
        }
    };
    Ok(summary)
}

async fn drive<S>(config: &AppConfig, source: S, sink: Arc<dyn IntentSink>) -> RunSummary
where
    S: FrameSource<Frame = PoseFrame>,
{
    let runner = GestureRunner::new(
        source,
        FeedClassifier,
        config.gesture_settings(),
        Arc::new(MonotonicClock),
    );
    runner
        .run(sink, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
}

fn report(summary: &RunSummary) {
    info!(
        "Gesture loop finished: {} frames, {} intents, {} failed deliveries, final phase {:?}",
        summary.frames,
        summary.intents.len(),
        summary.delivery_failures,
        summary.final_phase
    );
}
