//! Wetterbericht - daily market "weather report" generator
//!
//! This library scrapes market quotes and a weather forecast, turns them into
//! German prose lines with a randomized word bank and composes the daily post.

pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod forecast;
pub mod forum;
pub mod instrument;
pub mod prose;
pub mod providers;
pub mod weather;

// Re-export commonly used types
pub use config::{AppConfig, InstrumentCatalog, InstrumentDescriptor};
pub use error::{FetchError, ForecastError, FormatError, ResolveError, ValueError, WeatherError};
pub use forecast::{Forecaster, ReportEntry};
pub use instrument::{Instrument, InstrumentLine, InstrumentValues, MarketState, Readings};
pub use prose::{ProseGenerator, WordBank};
pub use providers::{Provider, ProviderContext, ProviderRegistry, Resolution};
pub use weather::{WeatherSource, WetterComStation};

#[cfg(test)]
mod forecast_tests;
