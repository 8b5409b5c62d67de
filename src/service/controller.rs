use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command_runner::{CommandRunner, SystemCommandRunner};
use crate::dock::DockGeometryProbe;
use crate::error::PollResult;
use crate::layout::{LayoutEngine, LayoutPolicy, WidgetLayout};
use crate::macos_bridge::ScriptBridge;
use crate::media::{MediaSourceAdapter, MediaWatcher, ScriptedPlayer};
use crate::models::{DisplayInfo, DockGeometry, MediaApp, NowPlayingSnapshot, TransportCommand, WeatherReport};
use crate::process_scan::ProcessScanner;
use crate::settings::Settings;
use crate::weather::{location_provider, ReqwestBackend, WeatherClient, WeatherService};

use super::events::PollEvent;

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "controller";

use crate::{log_debug, log_info};

const EVENT_CAPACITY: usize = 64;

/// The three probes a controller drives.
#[derive(Clone)]
pub struct Probes {
    pub dock: DockGeometryProbe,
    pub media: MediaWatcher,
    pub weather: WeatherService,
}

impl Probes {
    /// Production probes: `defaults` and `osascript` through real processes,
    /// weather over reqwest.
    pub fn system(settings: &Settings, display: &DisplayInfo) -> Result<Self> {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner);
        let dock = DockGeometryProbe::new(runner.clone(), settings.dock.clone(), display);

        let bridge = ScriptBridge::new(runner, settings.media.script_timeout());
        let scanner = ProcessScanner::new();
        let mut seen = BTreeSet::new();
        let sources: Vec<Arc<dyn MediaSourceAdapter>> = settings
            .media
            .priority
            .iter()
            .filter(|app| seen.insert(**app))
            .map(|app| {
                Arc::new(ScriptedPlayer::new(*app, bridge.clone(), scanner.clone()))
                    as Arc<dyn MediaSourceAdapter>
            })
            .collect();
        let media = MediaWatcher::new(sources);

        let http = reqwest::Client::builder()
            .user_agent(concat!("dockwidgets/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        let client = WeatherClient::new(Arc::new(ReqwestBackend::new(http)), &settings.weather);
        let weather = WeatherService::new(client, location_provider(&settings.weather), &settings.weather);

        Ok(Self { dock, media, weather })
    }
}

/// Owns the polling tasks and merges their notifications.
///
/// Probes publish into their own watch channels; the controller only reads
/// them and re-emits as [`PollEvent`]s on a broadcast channel.
pub struct PollingController {
    settings: Settings,
    probes: Probes,
    layout: LayoutEngine,
    display_tx: watch::Sender<DisplayInfo>,
    events: broadcast::Sender<PollEvent>,
    handles: Vec<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl PollingController {
    pub fn new(settings: Settings, probes: Probes, display: DisplayInfo) -> Self {
        let (display_tx, _) = watch::channel(display);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let layout = LayoutEngine::new(LayoutPolicy::from(&settings.layout));

        Self {
            settings,
            probes,
            layout,
            display_tx,
            events,
            handles: Vec::new(),
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel_token.is_some()
    }

    /// Spawns one task per probe plus the fan-out task.
    pub fn start(&mut self) -> Result<()> {
        if self.cancel_token.is_some() {
            bail!("polling already active");
        }

        let cancel_token = CancellationToken::new();
        let probes = self.probes.clone();

        self.handles.push(tokio::spawn(
            probes
                .dock
                .clone()
                .run(self.display_tx.subscribe(), cancel_token.clone()),
        ));
        self.handles.push(tokio::spawn(probes.media.clone().run(
            self.settings.media.interval(),
            self.settings.media.tick_timeout(),
            cancel_token.clone(),
        )));
        self.handles.push(tokio::spawn(
            probes
                .weather
                .clone()
                .run(self.settings.weather.interval(), cancel_token.clone()),
        ));

        let fan_out = FanOut {
            dock_rx: probes.dock.subscribe(),
            media_rx: probes.media.subscribe(),
            denials_rx: probes.media.subscribe_denials(),
            weather_rx: probes.weather.subscribe(),
            display_rx: self.display_tx.subscribe(),
            events: self.events.clone(),
            layout: self.settings.layout.relayout_on_dock_change.then_some(self.layout),
        };
        self.handles.push(tokio::spawn(fan_out.run(cancel_token.clone())));

        self.cancel_token = Some(cancel_token);
        log_info!(
            "polling started (dock {}ms, media {}ms, weather {}s)",
            self.settings.dock.interval_ms,
            self.settings.media.interval_ms,
            self.settings.weather.interval_secs
        );
        Ok(())
    }

    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.events.subscribe()
    }

    pub fn set_display(&self, display: DisplayInfo) {
        self.display_tx.send_if_modified(|current| {
            if *current == display {
                return false;
            }
            *current = display;
            true
        });
    }

    pub fn display(&self) -> DisplayInfo {
        *self.display_tx.borrow()
    }

    pub fn dock_geometry(&self) -> DockGeometry {
        self.probes.dock.current()
    }

    pub fn now_playing(&self) -> NowPlayingSnapshot {
        self.probes.media.current()
    }

    pub fn weather(&self) -> Option<WeatherReport> {
        self.probes.weather.current()
    }

    /// Anchors for the current display and dock geometry.
    pub fn layout(&self) -> WidgetLayout {
        compute_layout(&self.layout, &self.display(), &self.dock_geometry())
    }

    pub async fn media_command(&self, command: TransportCommand) -> PollResult<Option<MediaApp>> {
        self.probes.media.send_command(command).await
    }

    /// Cancels every task and waits for them to finish. In-flight weather
    /// retries stop at their next cancellation check.
    pub async fn shutdown(&mut self) -> Result<()> {
        let Some(token) = self.cancel_token.take() else {
            return Ok(());
        };
        token.cancel();

        for handle in self.handles.drain(..) {
            handle.await.context("polling task failed to join")?;
        }
        log_info!("polling stopped");
        Ok(())
    }
}

fn compute_layout(engine: &LayoutEngine, display: &DisplayInfo, dock: &DockGeometry) -> WidgetLayout {
    let screen = if display.frame.is_empty() {
        DisplayInfo::default().frame
    } else {
        display.frame
    };
    engine.compute(screen, dock.frame, dock.edge)
}

struct FanOut {
    dock_rx: watch::Receiver<DockGeometry>,
    media_rx: watch::Receiver<NowPlayingSnapshot>,
    denials_rx: watch::Receiver<BTreeSet<MediaApp>>,
    weather_rx: watch::Receiver<Option<WeatherReport>>,
    display_rx: watch::Receiver<DisplayInfo>,
    events: broadcast::Sender<PollEvent>,
    /// Set when anchors follow the dock automatically.
    layout: Option<LayoutEngine>,
}

impl FanOut {
    async fn run(mut self, cancel_token: CancellationToken) {
        let mut denied = self.denials_rx.borrow().clone();

        loop {
            tokio::select! {
                changed = self.dock_rx.changed() => {
                    if changed.is_err() { break; }
                    let geometry = *self.dock_rx.borrow_and_update();
                    self.emit(PollEvent::DockChanged(geometry));
                    self.relayout();
                }
                changed = self.media_rx.changed() => {
                    if changed.is_err() { break; }
                    let snapshot = self.media_rx.borrow_and_update().clone();
                    self.emit(PollEvent::NowPlayingChanged(snapshot));
                }
                changed = self.denials_rx.changed() => {
                    if changed.is_err() { break; }
                    let current = self.denials_rx.borrow_and_update().clone();
                    for app in current.difference(&denied) {
                        self.emit(PollEvent::MediaPermissionDenied(*app));
                    }
                    denied = current;
                }
                changed = self.weather_rx.changed() => {
                    if changed.is_err() { break; }
                    let report = self.weather_rx.borrow_and_update().clone();
                    if let Some(report) = report {
                        self.emit(PollEvent::WeatherUpdated(report));
                    }
                }
                changed = self.display_rx.changed() => {
                    if changed.is_err() { break; }
                    let _ = self.display_rx.borrow_and_update();
                    self.relayout();
                }
                _ = cancel_token.cancelled() => {
                    log_info!("event fan-out shutting down");
                    break;
                }
            }
        }
    }

    fn relayout(&self) {
        if let Some(engine) = &self.layout {
            let display = *self.display_rx.borrow();
            let dock = *self.dock_rx.borrow();
            self.emit(PollEvent::LayoutChanged(compute_layout(engine, &display, &dock)));
        }
    }

    fn emit(&self, event: PollEvent) {
        // No subscribers is not an error.
        if self.events.send(event.clone()).is_err() {
            log_debug!("no subscribers for {}", event.name());
        }
    }
}
