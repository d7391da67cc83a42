use async_trait::async_trait;
use serde::Deserialize;

use super::traits::{Provider, Resolution};
use crate::config::InstrumentDescriptor;
use crate::constants::endpoints::YAHOO_CHART;
use crate::error::{ProviderResult, ResolveError};
use crate::fetch::{with_query, Fetcher};
use crate::instrument::{Currency, InstrumentValues};

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
}

/// Yahoo Finance chart API; change is computed against the previous close.
pub struct YahooProvider {
    fetcher: Fetcher,
    currency: Currency,
}

impl YahooProvider {
    pub fn new(fetcher: Fetcher, currency: Currency) -> Self {
        Self { fetcher, currency }
    }
}

#[async_trait]
impl Provider for YahooProvider {
    fn name(&self) -> &'static str {
        match self.currency {
            Currency::Dollar => "yahoo_dollar",
            _ => "yahoo",
        }
    }

    async fn fetch_readings(&self, descriptor: &InstrumentDescriptor) -> ProviderResult<Resolution> {
        let base = format!("{}{}", YAHOO_CHART, descriptor.require_symbol()?);
        let url = with_query(&base, &[("interval", "1d"), ("range", "1d")])?;
        let response = self.fetcher.fetch(&url, &[]).await?;
        parse_chart(&response.body)
    }

    fn currency(&self) -> Currency {
        self.currency
    }
}

pub fn parse_chart(body: &str) -> ProviderResult<Resolution> {
    let response: ChartResponse = serde_json::from_str(body)?;
    let meta = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .map(|result| result.meta)
        .ok_or_else(|| ResolveError::layout("chart result is empty"))?;

    let current = meta
        .regular_market_price
        .ok_or_else(|| ResolveError::layout("regularMarketPrice missing"))?;
    let previous = meta
        .chart_previous_close
        .or(meta.previous_close)
        .ok_or_else(|| ResolveError::layout("previous close missing"))?;

    Ok(Resolution::quote(InstrumentValues::from_previous(current, previous)?))
}
