//! HTTP command handlers
//!
//! The recording endpoint exposes the controller over plain GET routes so the
//! gesture loop, a browser or `curl` can drive it.

pub mod recording;

use crate::config::AppConfig;
use recording::RecorderState;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};

/// Assemble the endpoint server around `state`
pub fn build_rocket(state: RecorderState, config: &AppConfig) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("address", config.bind_address))
        .merge(("port", config.port));

    rocket::custom(figment)
        .manage(state)
        .mount(
            "/",
            rocket::routes![
                recording::start_recording,
                recording::stop_recording,
                recording::recording_status,
            ],
        )
        .attach(AdHoc::on_shutdown("Stop active recording", |rocket| {
            Box::pin(async move {
                if let Some(state) = rocket.state::<RecorderState>() {
                    if let Some(report) = state.controller.lock().await.shutdown().await {
                        tracing::info!("Stopped recording {} on shutdown", report.file.display());
                    }
                }
            })
        }))
}
