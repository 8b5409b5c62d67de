pub mod controller;
pub mod events;

pub use controller::{PollingController, Probes};
pub use events::PollEvent;
