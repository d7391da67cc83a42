//! Weather line builder
//!
//! Scrapes the two middle forecast cells of a wetter.com location page and
//! turns them into a short German fragment such as "bewölkt und nebelig".

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::config::WeatherSettings;
use crate::constants::prose::CONJUNCTION;
use crate::error::WeatherError;
use crate::fetch::Fetcher;
use crate::instrument::{InstrumentLine, LineFields, LineSpec, LineTemplate};
use crate::providers::element_text;

static FORECAST_CELL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("td.text--center.delta.portable-pb").expect("static selector is valid")
});

/// Anything that can produce the rendered weather fragment of a report.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fragment(&self) -> Result<String, WeatherError>;
}

/// wetter.com location page.
pub struct WetterComStation {
    fetcher: Fetcher,
    settings: WeatherSettings,
    line: InstrumentLine,
}

impl WetterComStation {
    /// `line` is the catalog's `weather` template.
    pub fn new(fetcher: Fetcher, settings: WeatherSettings, line: &LineSpec) -> Self {
        Self {
            fetcher,
            settings,
            line: InstrumentLine::new(LineTemplate::from_spec(line, false), false),
        }
    }
}

#[async_trait]
impl WeatherSource for WetterComStation {
    async fn fragment(&self) -> Result<String, WeatherError> {
        info!("🌦️ Fetching weather forecast from {}", self.settings.url);
        let page = self.fetcher.fetch(&self.settings.url, &[]).await?;

        let terms = forecast_terms(&page.body)?;
        debug!("Weather terms: {:?}", terms);
        let attributes = prettify(terms, &self.settings.transformers)?;
        render_fragment(&self.line, &attributes, &self.settings.url)
    }
}

/// Normalized text of forecast cells 1 and 2, empty cells dropped.
pub fn forecast_terms(body: &str) -> Result<Vec<String>, WeatherError> {
    let document = Html::parse_document(body);
    let cells: Vec<String> = document.select(&FORECAST_CELL).map(element_text).collect();
    if cells.len() < 3 {
        return Err(WeatherError::Layout { found: cells.len() });
    }

    Ok(cells[1..3]
        .iter()
        .map(|cell| cell.to_lowercase())
        .filter(|cell| !cell.is_empty())
        .collect())
}

/// Apply the substitution table, deduplicate and join.
pub fn prettify(
    terms: Vec<String>,
    transformers: &BTreeMap<String, String>,
) -> Result<String, WeatherError> {
    let unique: BTreeSet<String> = terms
        .into_iter()
        .map(|term| {
            let key = term.replace(' ', "_");
            transformers.get(&key).cloned().unwrap_or(term)
        })
        .collect();

    if unique.is_empty() {
        return Err(WeatherError::NoForecast);
    }
    Ok(join_terms(&unique.into_iter().collect::<Vec<_>>()))
}

/// "a", "a und b", "a, b und c".
pub fn join_terms(terms: &[String]) -> String {
    match terms {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{}{}{}", head.join(", "), CONJUNCTION, last),
    }
}

pub fn render_fragment(line: &InstrumentLine, attributes: &str, url: &str) -> Result<String, WeatherError> {
    let fields = LineFields::new()
        .with("weather_attributes", attributes)
        .with("url", url);
    Ok(line.render(&fields)?)
}
