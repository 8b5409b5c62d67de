pub mod command_runner;
pub mod dock;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod macos_bridge;
pub mod media;
pub mod models;
pub mod notifier;
pub mod process_scan;
pub mod service;
pub mod settings;
mod utils;
pub mod weather;

use anyhow::{Context, Result};
use log::LevelFilter;
use tokio::sync::broadcast::error::RecvError;

pub use command_runner::{CommandRunner, SystemCommandRunner};
pub use error::{PollError, PollResult};
pub use models::DisplayInfo;
pub use service::{PollEvent, PollingController, Probes};
pub use settings::Settings;

const RUST_LOG_ENV: &str = "RUST_LOG";

/// Starts every probe and logs merged events until Ctrl-C.
pub async fn run() -> Result<()> {
    init_logging();

    let settings = Settings::load();
    if settings.debug && std::env::var_os(RUST_LOG_ENV).is_none() {
        log::set_max_level(LevelFilter::Debug);
    }
    if settings.weather.api_key.is_empty() {
        log::warn!("No weather API key configured; weather refreshes will fail until one is set");
    }

    log::info!("DockWidgets starting up...");

    let display = DisplayInfo::default();
    let probes = Probes::system(&settings, &display)?;
    let mut controller = PollingController::new(settings, probes, display);
    let mut events = controller.subscribe();
    controller.start()?;
    log::info!("Initial layout: {:?}", controller.layout());

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => log::warn!("Event log lagged, skipped {skipped} events"),
                Err(RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                log::info!("Shutdown requested");
                break;
            }
        }
    }

    controller.shutdown().await
}

/// `RUST_LOG` wins when set; otherwise info, raised to debug once settings
/// ask for it.
fn init_logging() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Debug)
        .parse_default_env()
        .init();
    if std::env::var_os(RUST_LOG_ENV).is_none() {
        log::set_max_level(LevelFilter::Info);
    }
}

fn log_event(event: &PollEvent) {
    match serde_json::to_string(event) {
        Ok(json) => log::info!("{json}"),
        Err(err) => log::warn!("Failed to serialize {} event: {err}", event.name()),
    }
}
