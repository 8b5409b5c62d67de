use async_trait::async_trait;

use crate::error::PollResult;
use crate::macos_bridge::ScriptBridge;
use crate::models::{MediaApp, TrackInfo, TransportCommand};
use crate::process_scan::ProcessScanner;

/// One player application the watcher can query and command.
#[async_trait]
pub trait MediaSourceAdapter: Send + Sync {
    fn app(&self) -> MediaApp;

    async fn is_playing(&self) -> PollResult<bool>;

    async fn is_running(&self) -> PollResult<bool>;

    async fn now_playing(&self) -> PollResult<TrackInfo>;

    async fn send(&self, command: TransportCommand) -> PollResult<()>;
}

/// A player driven through AppleScript, with presence checked in the
/// process table first so closed players cost no script invocation.
pub struct ScriptedPlayer {
    app: MediaApp,
    bridge: ScriptBridge,
    scanner: ProcessScanner,
}

impl ScriptedPlayer {
    pub fn new(app: MediaApp, bridge: ScriptBridge, scanner: ProcessScanner) -> Self {
        Self {
            app,
            bridge,
            scanner,
        }
    }
}

#[async_trait]
impl MediaSourceAdapter for ScriptedPlayer {
    fn app(&self) -> MediaApp {
        self.app
    }

    async fn is_playing(&self) -> PollResult<bool> {
        if !self.scanner.is_running(self.app.process_name()).await {
            return Ok(false);
        }
        self.bridge.is_playing(self.app).await
    }

    async fn is_running(&self) -> PollResult<bool> {
        Ok(self.scanner.is_running(self.app.process_name()).await)
    }

    async fn now_playing(&self) -> PollResult<TrackInfo> {
        self.bridge.current_track(self.app).await
    }

    async fn send(&self, command: TransportCommand) -> PollResult<()> {
        self.bridge.send(self.app, command).await
    }
}
