use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, REFERER};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use super::traits::{Provider, Resolution};
use crate::config::{FetchSettings, InstrumentDescriptor};
use crate::constants::endpoints::{INVESTINY_HOST, INVESTINY_REFERER};
use crate::error::{FetchError, ProviderResult, ResolveError};
use crate::fetch::{with_query, Fetcher, RetryPolicy};
use crate::instrument::{InstrumentValues, RawNumber};

/// The quotes API answers mobile Chrome and blocks generic clients.
const MOBILE_CHROME: &str = "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/114.0.0.0 Mobile Safari/537.36";

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    s: String,
    #[serde(default)]
    d: Vec<QuoteEntry>,
}

#[derive(Debug, Deserialize)]
struct QuoteEntry {
    n: String,
    v: Value,
}

/// investing.com's TradingView quotes endpoint, keyed by symbols like `Eurex:DE30`.
pub struct InvestinyProvider {
    /// Without the fingerprint headers every request is blocked, so a failed build is kept as an error.
    fetcher: Result<Fetcher, String>,
    reversed: bool,
}

impl InvestinyProvider {
    /// Builds its own HTTP client with the headers the endpoint expects.
    pub fn new(settings: &FetchSettings, reversed: bool) -> Self {
        Self::with_user_agent(settings, MOBILE_CHROME, reversed)
    }

    fn with_user_agent(settings: &FetchSettings, user_agent: &str, reversed: bool) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(INVESTINY_REFERER));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let fetcher = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map(|client| Fetcher::with_client(client, RetryPolicy::from(settings)))
            .map_err(|e| e.to_string());
        if let Err(e) = &fetcher {
            warn!("❌ Could not build the investiny HTTP client: {}", e);
        }

        Self { fetcher, reversed }
    }
}

#[async_trait]
impl Provider for InvestinyProvider {
    fn name(&self) -> &'static str {
        if self.reversed {
            "investiny_upsidedown"
        } else {
            "investiny"
        }
    }

    async fn fetch_readings(&self, descriptor: &InstrumentDescriptor) -> ProviderResult<Resolution> {
        let symbol = descriptor.require_symbol()?;
        let base = format!("{}/{}/0/0/0/0/quotes", INVESTINY_HOST, Uuid::new_v4().simple());
        let url = with_query(&base, &[("symbols", symbol)])?;

        let fetcher = self
            .fetcher
            .as_ref()
            .map_err(|reason| FetchError::Client(reason.clone()))?;
        let response = fetcher.fetch(&url, &[]).await?;
        parse_quotes(&response.body, symbol)
    }

    fn reversed_lines(&self) -> bool {
        self.reversed
    }
}

/// `chp` is the percent change, `lp` the last price.
pub fn parse_quotes(body: &str, symbol: &str) -> ProviderResult<Resolution> {
    let quotes: QuotesResponse = serde_json::from_str(body)?;
    if quotes.s != "ok" {
        return Err(ResolveError::layout(format!("quotes status '{}'", quotes.s)));
    }

    let entry = quotes
        .d
        .iter()
        .find(|entry| entry.n == symbol)
        .ok_or_else(|| ResolveError::layout(format!("no quote for {}", symbol)))?;

    let field = |name: &str| {
        entry
            .v
            .get(name)
            .map(RawNumber::from)
            .ok_or_else(|| ResolveError::layout(format!("quote field '{}' missing", name)))
    };

    let values = InstrumentValues::new(field("chp")?, field("lp")?)?;
    Ok(Resolution::quote(values))
}
