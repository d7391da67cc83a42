use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::debug;

use super::{
    element_text,
    numbers::extract_number,
    traits::{Provider, Resolution},
};
use crate::config::InstrumentDescriptor;
use crate::constants::endpoints::CNBC_QUOTE;
use crate::error::{ProviderResult, ResolveError};
use crate::fetch::{with_query, Fetcher};
use crate::instrument::{Currency, InstrumentValues, MarketState};

/// The API sometimes answers in XML even when JSON is requested
const JSON_HEADERS: [(&str, &str); 2] = [
    ("Accept", "application/json"),
    ("Content-Type", "application/json"),
];

static XML_LAST: Lazy<Selector> = Lazy::new(|| css("formattedquote last"));
static XML_PREVIOUS: Lazy<Selector> = Lazy::new(|| css("formattedquote previous_day_closing"));
static XML_STATUS: Lazy<Selector> = Lazy::new(|| css("formattedquote curmktstatus"));

fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector is valid")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QuoteEnvelope {
    formatted_quote_result: QuoteResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QuoteResult {
    formatted_quote: Vec<FormattedQuote>,
}

#[derive(Debug, Deserialize)]
struct FormattedQuote {
    last: String,
    previous_day_closing: String,
    #[serde(default)]
    curmktstatus: Option<String>,
}

/// CNBC quote service, keyed by CNBC symbols such as `US10Y` or `@CL.1`.
pub struct CnbcProvider {
    fetcher: Fetcher,
    currency: Currency,
}

impl CnbcProvider {
    pub fn new(fetcher: Fetcher, currency: Currency) -> Self {
        Self { fetcher, currency }
    }
}

#[async_trait]
impl Provider for CnbcProvider {
    fn name(&self) -> &'static str {
        match self.currency {
            Currency::Dollar => "cnbc_dollar",
            _ => "cnbc",
        }
    }

    async fn fetch_readings(&self, descriptor: &InstrumentDescriptor) -> ProviderResult<Resolution> {
        let url = with_query(CNBC_QUOTE, &[("symbols", descriptor.require_symbol()?)])?;
        let response = self.fetcher.fetch(&url, &JSON_HEADERS).await?;
        parse_quote(&response.body)
    }

    fn currency(&self) -> Currency {
        self.currency
    }
}

/// Parse a restQuote answer (JSON, or XML as fallback).
pub fn parse_quote(body: &str) -> ProviderResult<Resolution> {
    let quote = match serde_json::from_str::<QuoteEnvelope>(body) {
        Ok(envelope) => envelope
            .formatted_quote_result
            .formatted_quote
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::layout("FormattedQuote is empty"))?,
        Err(e) => {
            debug!("CNBC answer is not JSON ({}), trying XML", e);
            parse_xml(body)?
        }
    };

    let current = extract_number(&quote.last)?;
    let previous = extract_number(&quote.previous_day_closing)?;
    let values = InstrumentValues::from_previous(current, previous)?;

    Ok(Resolution::quote(values).with_market_state(market_state(quote.curmktstatus.as_deref())))
}

fn parse_xml(body: &str) -> ProviderResult<FormattedQuote> {
    let document = Html::parse_document(body);
    let text = |selector: &Selector, name: &str| {
        document
            .select(selector)
            .next()
            .map(element_text)
            .ok_or_else(|| ResolveError::layout(format!("{} missing from XML quote", name)))
    };

    Ok(FormattedQuote {
        last: text(&XML_LAST, "last")?,
        previous_day_closing: text(&XML_PREVIOUS, "previous_day_closing")?,
        curmktstatus: text(&XML_STATUS, "curmktstatus").ok(),
    })
}

fn market_state(status: Option<&str>) -> MarketState {
    match status {
        Some("REG_MKT") => MarketState::Open,
        Some("POST_MKT") | Some("PRE_MKT") | Some("CLOSED") => MarketState::Closed,
        _ => MarketState::Unknown,
    }
}
