pub mod source;
pub mod watcher;

pub use source::{MediaSourceAdapter, ScriptedPlayer};
pub use watcher::{MediaPoll, MediaWatcher};
