//! Current weather for the diary's metadata section.

mod client;
pub mod commands;
pub mod models;

pub use client::{OpenWeatherApi, WeatherService, WeatherSource, OPENWEATHER_API_BASE};
pub use models::{Coordinates, WeatherReport};
