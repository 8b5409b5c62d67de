use std::fmt;

use serde::{Deserialize, Serialize};

/// Player applications the watcher knows how to script.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum MediaApp {
    Music,
    Spotify,
}

impl MediaApp {
    /// Name used to address the application from a script.
    pub fn application_name(&self) -> &'static str {
        match self {
            MediaApp::Music => "Music",
            MediaApp::Spotify => "Spotify",
        }
    }

    /// Executable name as it appears in the process table.
    pub fn process_name(&self) -> &'static str {
        self.application_name()
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MediaApp::Music => "Apple Music",
            MediaApp::Spotify => "Spotify",
        }
    }
}

impl fmt::Display for MediaApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.application_name())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
}

/// Latest known playback state. `source_app == None` means nothing is playing
/// or paused anywhere, which is a normal state rather than an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NowPlayingSnapshot {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub source_app: Option<MediaApp>,
    pub is_playing: bool,
}

impl NowPlayingSnapshot {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn from_track(track: TrackInfo, source_app: MediaApp, is_playing: bool) -> Self {
        Self {
            title: track.title,
            artist: track.artist,
            album: track.album,
            source_app: Some(source_app),
            is_playing,
        }
    }

    pub fn display_text(&self) -> String {
        if self.source_app.is_none() {
            return "No music playing".to_string();
        }
        if self.album.is_empty() {
            format!("{} – {}", self.title, self.artist)
        } else {
            format!("{} – {} ({})", self.title, self.artist, self.album)
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TransportCommand {
    PlayPause,
    Next,
    Previous,
}

impl fmt::Display for TransportCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportCommand::PlayPause => "play/pause",
            TransportCommand::Next => "next track",
            TransportCommand::Previous => "previous track",
        };
        f.write_str(name)
    }
}
