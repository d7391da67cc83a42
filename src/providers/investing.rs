use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::{
    element_text,
    numbers::strip_thousands,
    traits::{Provider, Resolution},
};
use crate::config::InstrumentDescriptor;
use crate::error::{ProviderResult, ResolveError};
use crate::fetch::Fetcher;
use crate::instrument::{InstrumentValues, MarketState};

static PRICE: Lazy<Selector> = Lazy::new(|| css(r#"[data-test="instrument-price-last"]"#));
static CHANGE_PCT: Lazy<Selector> =
    Lazy::new(|| css(r#"[data-test="instrument-price-change-percent"]"#));
static HEADER_METADATA: Lazy<Selector> = Lazy::new(|| {
    css(r#"[data-test="instrument-header-details"] span[class*="instrument-metadata_text__"]"#)
});

fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector is valid")
}

/// investing.com instrument pages (indices, futures, commodities).
pub struct InvestingProvider {
    fetcher: Fetcher,
}

impl InvestingProvider {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Provider for InvestingProvider {
    fn name(&self) -> &'static str {
        "investing"
    }

    async fn fetch_readings(&self, descriptor: &InstrumentDescriptor) -> ProviderResult<Resolution> {
        let page = self.fetcher.fetch(descriptor.require_url()?, &[]).await?;
        parse_page(&page.body)
    }
}

/// Extract price, percent change and trading state from an instrument page.
pub fn parse_page(body: &str) -> ProviderResult<Resolution> {
    let document = Html::parse_document(body);

    let price = document
        .select(&PRICE)
        .next()
        .map(element_text)
        .ok_or_else(|| ResolveError::layout("instrument-price-last not found"))?;

    // Rendered as "(+0.54%)" or "(-0.54%)"
    let change = document
        .select(&CHANGE_PCT)
        .next()
        .map(element_text)
        .ok_or_else(|| ResolveError::layout("instrument-price-change-percent not found"))?;
    let change: String = change
        .chars()
        .filter(|c| !matches!(c, '(' | ')') && !c.is_whitespace())
        .collect();

    let state = match document.select(&HEADER_METADATA).nth(1).map(element_text) {
        Some(text) if text.eq_ignore_ascii_case("closed") => MarketState::Closed,
        Some(_) => MarketState::Open,
        None => MarketState::Unknown,
    };

    let values = InstrumentValues::new(change, strip_thousands(&price))?;
    Ok(Resolution::quote(values).with_market_state(state))
}
