use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::{
    element_text,
    numbers::parse_european,
    traits::{Provider, Resolution},
};
use crate::config::InstrumentDescriptor;
use crate::error::{ProviderResult, ResolveError};
use crate::fetch::Fetcher;
use crate::instrument::{values::round2, Currency, InstrumentValues};

static QUOTE_BOX: Lazy<Selector> = Lazy::new(|| {
    css("div.flex-layout.flex-layout__align-items--baseline.ov-flex-layout--column-sm.text-size--xlarge")
});
static PRICE: Lazy<Selector> =
    Lazy::new(|| css("data.text-nowrap.text-weight--medium.outer-spacing--xsmall-right"));
// The change is styled differently depending on its sign
static CHANGE: Lazy<Selector> = Lazy::new(|| {
    css("data.color--cd-positive.text-nowrap.outer-spacing--xsmall-right, \
         data.color--cd-negative.text-nowrap.outer-spacing--xsmall-right")
});

fn css(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector is valid")
}

/// onvista.de certificate and index pages, European number format, prices in Euro.
pub struct OnvistaProvider {
    fetcher: Fetcher,
}

impl OnvistaProvider {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Provider for OnvistaProvider {
    fn name(&self) -> &'static str {
        "onvista"
    }

    async fn fetch_readings(&self, descriptor: &InstrumentDescriptor) -> ProviderResult<Resolution> {
        let page = self.fetcher.fetch(descriptor.require_url()?, &[]).await?;
        parse_page(&page.body)
    }

    fn currency(&self) -> Currency {
        Currency::Euro
    }
}

pub fn parse_page(body: &str) -> ProviderResult<Resolution> {
    let document = Html::parse_document(body);
    let quote_box = document
        .select(&QUOTE_BOX)
        .next()
        .ok_or_else(|| ResolveError::layout("onvista quote box not found"))?;

    let price = quote_box
        .select(&PRICE)
        .next()
        .map(element_text)
        .ok_or_else(|| ResolveError::layout("onvista price not found"))?;
    let change = quote_box
        .select(&CHANGE)
        .next()
        .map(element_text)
        .ok_or_else(|| ResolveError::layout("onvista change not found"))?;

    let values = InstrumentValues::new(round2(parse_european(&change)?), round2(parse_european(&price)?))?;
    Ok(Resolution::quote(values))
}
