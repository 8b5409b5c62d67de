pub mod dock;
pub mod media;
pub mod weather;

pub use dock::{DisplayInfo, DockEdge, DockGeometry};
pub use media::{MediaApp, NowPlayingSnapshot, TrackInfo, TransportCommand};
pub use weather::{Coordinate, TemperatureUnit, WeatherIcon, WeatherReport, WeatherSnapshot};
