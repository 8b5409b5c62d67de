use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{PollError, PollResult};
use crate::models::{MediaApp, NowPlayingSnapshot, TransportCommand};
use crate::notifier::ChangeNotifier;

use super::source::MediaSourceAdapter;

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "media_watcher";

use crate::{log_debug, log_info, log_warn};

/// Result of querying every source once, before anything is published.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPoll {
    pub snapshot: NowPlayingSnapshot,
    /// Where transport commands go until the next poll.
    pub addressable: Option<MediaApp>,
    /// Sources that refused automation access during this poll.
    pub denied: BTreeSet<MediaApp>,
    /// Sources that answered at least one query during this poll.
    pub reachable: BTreeSet<MediaApp>,
}

/// Polls player sources in priority order and publishes the active one.
///
/// Arbitration is first-match-wins: the first playing source owns the
/// snapshot; failing that, the first running (paused) source becomes the
/// command target.
#[derive(Clone)]
pub struct MediaWatcher {
    sources: Arc<Vec<Arc<dyn MediaSourceAdapter>>>,
    addressable: Arc<Mutex<Option<MediaApp>>>,
    snapshots: ChangeNotifier<NowPlayingSnapshot>,
    denials: ChangeNotifier<BTreeSet<MediaApp>>,
}

impl MediaWatcher {
    pub fn new(sources: Vec<Arc<dyn MediaSourceAdapter>>) -> Self {
        Self {
            sources: Arc::new(sources),
            addressable: Arc::new(Mutex::new(None)),
            snapshots: ChangeNotifier::new(NowPlayingSnapshot::idle()),
            denials: ChangeNotifier::new(BTreeSet::new()),
        }
    }

    pub fn current(&self) -> NowPlayingSnapshot {
        self.snapshots.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<NowPlayingSnapshot> {
        self.snapshots.subscribe()
    }

    /// Applications currently refusing automation access. The set only
    /// changes when a new denial appears or a denied source recovers, so a
    /// host can prompt once per change instead of once per tick.
    pub fn subscribe_denials(&self) -> watch::Receiver<BTreeSet<MediaApp>> {
        self.denials.subscribe()
    }

    pub async fn addressable(&self) -> Option<MediaApp> {
        *self.addressable.lock().await
    }

    /// Queries every source once without publishing anything.
    pub async fn poll_sources(&self) -> MediaPoll {
        let mut denied = BTreeSet::new();
        let mut reachable = BTreeSet::new();

        for source in self.sources.iter() {
            let app = source.app();
            let playing = match source.is_playing().await {
                Ok(playing) => {
                    reachable.insert(app);
                    playing
                }
                Err(err) => {
                    note_failure(app, "is_playing", &err, &mut denied);
                    false
                }
            };
            if !playing {
                continue;
            }

            // The first playing source wins even when its track is unreadable
            // (radio streams, transient script errors).
            let snapshot = match source.now_playing().await {
                Ok(track) => NowPlayingSnapshot::from_track(track, app, true),
                Err(err) => {
                    note_failure(app, "now_playing", &err, &mut denied);
                    NowPlayingSnapshot {
                        source_app: Some(app),
                        is_playing: true,
                        ..NowPlayingSnapshot::idle()
                    }
                }
            };
            return MediaPoll {
                snapshot,
                addressable: Some(app),
                denied,
                reachable,
            };
        }

        for source in self.sources.iter() {
            let app = source.app();
            match source.is_running().await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    note_failure(app, "is_running", &err, &mut denied);
                    continue;
                }
            }

            // A paused player still shows its track when it will tell us.
            let snapshot = match source.now_playing().await {
                Ok(track) => {
                    reachable.insert(app);
                    NowPlayingSnapshot::from_track(track, app, false)
                }
                Err(err) => {
                    note_failure(app, "now_playing", &err, &mut denied);
                    NowPlayingSnapshot {
                        source_app: Some(app),
                        ..NowPlayingSnapshot::idle()
                    }
                }
            };
            return MediaPoll {
                snapshot,
                addressable: Some(app),
                denied,
                reachable,
            };
        }

        MediaPoll {
            snapshot: NowPlayingSnapshot::idle(),
            addressable: None,
            denied,
            reachable,
        }
    }

    /// Polls, updates the command target and publishes on change. Returns
    /// whether the snapshot was published.
    pub async fn tick(&self) -> bool {
        let poll = self.poll_sources().await;
        *self.addressable.lock().await = poll.addressable;
        self.record_denials(&poll);

        let changed = self.snapshots.publish(poll.snapshot.clone());
        if changed {
            log_info!(
                "now playing: {} [{}]",
                poll.snapshot.display_text(),
                if poll.snapshot.is_playing { "playing" } else { "paused" }
            );
        }
        changed
    }

    /// Sends `command` to the current command target. With no target the
    /// command is dropped and `Ok(None)` returned.
    pub async fn send_command(&self, command: TransportCommand) -> PollResult<Option<MediaApp>> {
        let Some(app) = self.addressable().await else {
            log_warn!("no media source available for {command}; ignoring");
            return Ok(None);
        };
        let Some(source) = self.sources.iter().find(|source| source.app() == app) else {
            log_warn!("{app} is no longer configured; ignoring {command}");
            return Ok(None);
        };

        match source.send(command).await {
            Ok(()) => {
                log_info!("sent {command} to {app}");
                Ok(Some(app))
            }
            Err(err) => {
                if err == PollError::PermissionDenied {
                    self.add_denial(app);
                }
                log_warn!("{command} to {app} failed: {err}");
                Err(err)
            }
        }
    }

    pub async fn run(self, interval: Duration, tick_timeout: Duration, cancel_token: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if tokio::time::timeout(tick_timeout, self.tick()).await.is_err() {
                        log_warn!("media poll timeout (> {}ms)", tick_timeout.as_millis());
                    }
                }
                _ = cancel_token.cancelled() => {
                    log_info!("media watcher shutting down");
                    break;
                }
            }
        }
    }

    /// Denials stay sticky for sources this poll never reached, so a
    /// lower-priority player that is simply not queried does not flap.
    fn record_denials(&self, poll: &MediaPoll) {
        let mut denied = self.denials.current();
        denied.retain(|app| !poll.reachable.contains(app));
        denied.extend(poll.denied.iter().copied());
        self.publish_denials(denied);
    }

    fn add_denial(&self, app: MediaApp) {
        let mut denied = self.denials.current();
        denied.insert(app);
        self.publish_denials(denied);
    }

    fn publish_denials(&self, denied: BTreeSet<MediaApp>) {
        let newly_denied: Vec<MediaApp> = denied
            .difference(&self.denials.current())
            .copied()
            .collect();
        if self.denials.publish(denied) {
            for app in newly_denied {
                log_warn!("automation access to {app} denied; grant it in System Settings > Privacy & Security > Automation");
            }
        }
    }
}

fn note_failure(app: MediaApp, query: &str, err: &PollError, denied: &mut BTreeSet<MediaApp>) {
    if *err == PollError::PermissionDenied {
        denied.insert(app);
    } else {
        log_debug!("{app} {query} failed: {err}");
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeSource;
    use super::*;

    fn watcher(sources: &[Arc<FakeSource>]) -> MediaWatcher {
        MediaWatcher::new(
            sources
                .iter()
                .map(|source| source.clone() as Arc<dyn MediaSourceAdapter>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_second_source_wins_when_first_is_idle() {
        let music = Arc::new(FakeSource::new(MediaApp::Music));
        let spotify = Arc::new(FakeSource::new(MediaApp::Spotify).playing("X", "Y"));
        let watcher = watcher(&[music.clone(), spotify.clone()]);

        assert!(watcher.tick().await);
        let snapshot = watcher.current();
        assert_eq!(snapshot.source_app, Some(MediaApp::Spotify));
        assert_eq!(snapshot.title, "X");
        assert_eq!(snapshot.artist, "Y");
        assert!(snapshot.is_playing);
        assert_eq!(*music.track_queries.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_priority_is_first_match_wins() {
        let music = Arc::new(FakeSource::new(MediaApp::Music).playing("A", "B"));
        let spotify = Arc::new(FakeSource::new(MediaApp::Spotify).playing("X", "Y"));
        let watcher = watcher(&[music, spotify.clone()]);

        watcher.tick().await;
        assert_eq!(watcher.current().source_app, Some(MediaApp::Music));
        assert_eq!(*spotify.track_queries.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unchanged_state_publishes_once() {
        let spotify = Arc::new(FakeSource::new(MediaApp::Spotify).playing("X", "Y"));
        let watcher = watcher(&[spotify]);
        let mut rx = watcher.subscribe();

        assert!(watcher.tick().await);
        for _ in 0..5 {
            assert!(!watcher.tick().await);
        }
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_pause_alone_publishes() {
        let music = Arc::new(FakeSource::new(MediaApp::Music).playing("A", "B"));
        let watcher = watcher(&[music.clone()]);
        watcher.tick().await;

        music.set_paused();
        assert!(watcher.tick().await);
        let snapshot = watcher.current();
        assert_eq!(snapshot.title, "A");
        assert!(!snapshot.is_playing);
        assert_eq!(snapshot.source_app, Some(MediaApp::Music));
        assert_eq!(watcher.addressable().await, Some(MediaApp::Music));
    }

    #[tokio::test]
    async fn test_nothing_running_is_idle_and_commands_are_noops() {
        let music = Arc::new(FakeSource::new(MediaApp::Music));
        let watcher = watcher(&[music.clone()]);

        assert!(!watcher.tick().await);
        assert_eq!(watcher.current(), NowPlayingSnapshot::idle());
        assert_eq!(watcher.send_command(TransportCommand::Next).await, Ok(None));
        assert!(music.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commands_route_to_paused_source() {
        let music = Arc::new(FakeSource::new(MediaApp::Music));
        let spotify = Arc::new(FakeSource::new(MediaApp::Spotify));
        spotify.set_paused();
        let watcher = watcher(&[music.clone(), spotify.clone()]);

        watcher.tick().await;
        assert_eq!(
            watcher.send_command(TransportCommand::PlayPause).await,
            Ok(Some(MediaApp::Spotify))
        );
        assert_eq!(*spotify.sent.lock().unwrap(), vec![TransportCommand::PlayPause]);
        assert!(music.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_playing_source_with_unreadable_track_still_wins() {
        let music = Arc::new(FakeSource::new(MediaApp::Music).playing("A", "B"));
        *music.track.lock().unwrap() = Err(PollError::NoData);
        let spotify = Arc::new(FakeSource::new(MediaApp::Spotify).playing("X", "Y"));
        let watcher = watcher(&[music, spotify.clone()]);

        watcher.tick().await;
        let snapshot = watcher.current();
        assert_eq!(snapshot.source_app, Some(MediaApp::Music));
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.title, "");
        assert_eq!(watcher.addressable().await, Some(MediaApp::Music));
        assert_eq!(*spotify.track_queries.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_lone_playing_source_with_unreadable_track_stays_playing() {
        let music = Arc::new(FakeSource::new(MediaApp::Music).playing("A", "B"));
        *music.track.lock().unwrap() = Err(PollError::NoData);
        let watcher = watcher(&[music]);

        assert!(watcher.tick().await);
        let snapshot = watcher.current();
        assert_eq!(snapshot.source_app, Some(MediaApp::Music));
        assert!(snapshot.is_playing);
    }

    #[tokio::test]
    async fn test_failing_source_is_skipped() {
        let music = Arc::new(FakeSource::new(MediaApp::Music));
        *music.playing.lock().unwrap() = Err(PollError::Network("timed out".into()));
        let spotify = Arc::new(FakeSource::new(MediaApp::Spotify).playing("X", "Y"));
        let watcher = watcher(&[music, spotify]);

        watcher.tick().await;
        assert_eq!(watcher.current().source_app, Some(MediaApp::Spotify));
    }

    #[tokio::test]
    async fn test_permission_denial_is_reported_once() {
        let music = Arc::new(FakeSource::new(MediaApp::Music));
        music.deny();
        let watcher = watcher(&[music.clone()]);
        let mut denials = watcher.subscribe_denials();

        for _ in 0..4 {
            watcher.tick().await;
        }
        assert!(denials.has_changed().unwrap());
        assert!(denials.borrow_and_update().contains(&MediaApp::Music));
        assert!(!denials.has_changed().unwrap());

        // Access granted, then revoked again: a fresh notification.
        music.set_playing("A", "B");
        watcher.tick().await;
        assert!(denials.has_changed().unwrap());
        assert!(denials.borrow_and_update().is_empty());

        music.deny();
        watcher.tick().await;
        assert!(denials.has_changed().unwrap());
        assert!(denials.borrow_and_update().contains(&MediaApp::Music));
    }

    #[tokio::test]
    async fn test_denial_sticks_while_source_is_not_queried() {
        let music = Arc::new(FakeSource::new(MediaApp::Music).playing("A", "B"));
        let spotify = Arc::new(FakeSource::new(MediaApp::Spotify));
        spotify.deny();
        let watcher = watcher(&[spotify.clone(), music.clone()]);
        let mut denials = watcher.subscribe_denials();

        watcher.tick().await;
        let _ = denials.borrow_and_update();
        watcher.tick().await;
        assert!(!denials.has_changed().unwrap());
        assert!(watcher.subscribe_denials().borrow().contains(&MediaApp::Spotify));
    }

    #[tokio::test]
    async fn test_denied_command_surfaces_error() {
        let music = Arc::new(FakeSource::new(MediaApp::Music).playing("A", "B"));
        *music.send_result.lock().unwrap() = Err(PollError::PermissionDenied);
        let watcher = watcher(&[music]);
        watcher.tick().await;

        assert_eq!(
            watcher.send_command(TransportCommand::Previous).await,
            Err(PollError::PermissionDenied)
        );
        assert!(watcher.subscribe_denials().borrow().contains(&MediaApp::Music));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let watcher = watcher(&[Arc::new(FakeSource::new(MediaApp::Music))]);
        let token = CancellationToken::new();
        let handle = tokio::spawn(watcher.run(
            Duration::from_millis(10),
            Duration::from_secs(1),
            token.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
