pub mod api;
pub mod client;
pub mod http;
pub mod service;

pub use client::{WeatherClient, WeatherQuery};
pub use http::{HttpBackend, HttpResponse, ReqwestBackend};
pub use service::{location_provider, FixedLocation, LocationProvider, NoLocation, WeatherService};
