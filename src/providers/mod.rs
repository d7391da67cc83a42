//! Data sources for instruments
//!
//! Each provider knows one upstream's URL scheme and payload shape and turns
//! it into [`traits::Resolution`]. Providers are looked up by name through the
//! static [`registry::ProviderRegistry`].

pub mod numbers;
pub mod registry;
pub mod traits;

pub mod cnbc;
pub mod coingecko;
pub mod investing;
pub mod investiny;
pub mod letf;
pub mod onvista;
pub mod yahoo;

pub use registry::{ProviderContext, ProviderRegistry};
pub use traits::{resolve, Provider, Resolution};

use scraper::ElementRef;

/// Visible text of an element with whitespace collapsed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
