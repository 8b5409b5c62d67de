//! AppleScript bridge to player applications.
//!
//! Scripts are executed with `osascript -e` through a [`CommandRunner`], so
//! the only platform-specific piece is the script text itself. Every player
//! script guards on `application "X" is running` to avoid launching a player
//! that is closed.

use std::sync::Arc;
use std::time::Duration;

use crate::command_runner::CommandRunner;
use crate::error::{PollError, PollResult};
use crate::models::{MediaApp, TrackInfo, TransportCommand};

const OSASCRIPT: &str = "/usr/bin/osascript";
const TRACK_DELIMITER: &str = "|||";
const NO_TRACK: &str = "no track";
const NOT_RUNNING: &str = "not running";
/// Prefix the track script puts on a caught AppleScript error.
const SCRIPT_ERROR_PREFIX: &str = "error: ";

#[derive(Clone)]
pub struct ScriptBridge {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl ScriptBridge {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    pub async fn eval(&self, script: &str) -> PollResult<String> {
        self.runner
            .run(OSASCRIPT, &["-e", script], self.timeout)
            .await
    }

    pub async fn is_playing(&self, app: MediaApp) -> PollResult<bool> {
        let output = self.eval(&player_state_script(app)).await?;
        parse_bool(&output)
    }

    pub async fn current_track(&self, app: MediaApp) -> PollResult<TrackInfo> {
        let output = self.eval(&current_track_script(app)).await?;
        parse_track(&output)
    }

    pub async fn send(&self, app: MediaApp, command: TransportCommand) -> PollResult<()> {
        match self.eval(&transport_script(app, command)).await {
            // Transport verbs return nothing on success.
            Ok(_) | Err(PollError::NoData) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

pub fn player_state_script(app: MediaApp) -> String {
    let name = app.application_name();
    format!(
        r#"if application "{name}" is running then
    tell application "{name}"
        return (player state is playing)
    end tell
end if
return false"#
    )
}

pub fn current_track_script(app: MediaApp) -> String {
    let name = app.application_name();
    format!(
        r#"if application "{name}" is running then
    tell application "{name}"
        try
            if current track exists then
                set trackName to name of current track
                set artistName to artist of current track
                set albumName to album of current track
                return trackName & "{TRACK_DELIMITER}" & artistName & "{TRACK_DELIMITER}" & albumName
            else
                return "{NO_TRACK}"
            end if
        on error errMsg
            return "error: " & errMsg
        end try
    end tell
else
    return "{NOT_RUNNING}"
end if"#
    )
}

pub fn transport_script(app: MediaApp, command: TransportCommand) -> String {
    let verb = match command {
        TransportCommand::PlayPause => "playpause",
        TransportCommand::Next => "next track",
        TransportCommand::Previous => "previous track",
    };
    format!(r#"tell application "{}" to {verb}"#, app.application_name())
}

pub fn parse_bool(output: &str) -> PollResult<bool> {
    match output.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(PollError::Decode(format!("expected boolean, got '{other}'"))),
    }
}

pub fn parse_track(output: &str) -> PollResult<TrackInfo> {
    let output = output.trim();
    if output.is_empty()
        || output == NO_TRACK
        || output == NOT_RUNNING
        || output.starts_with(SCRIPT_ERROR_PREFIX)
    {
        return Err(PollError::NoData);
    }

    let mut parts = output.split(TRACK_DELIMITER);
    let title = parts.next().unwrap_or_default();
    let Some(artist) = parts.next() else {
        return Err(PollError::Decode(format!(
            "track info missing artist: '{output}'"
        )));
    };
    let album = parts.next().unwrap_or_default();

    Ok(TrackInfo {
        title: title.to_string(),
        artist: artist.to_string(),
        album: album.to_string(),
    })
}
