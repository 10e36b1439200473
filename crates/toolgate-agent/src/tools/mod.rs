//! Built-in tools.

pub mod weather;

pub use weather::WeatherTool;
