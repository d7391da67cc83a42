use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::warn;

use super::traits::{Provider, Resolution};
use crate::config::InstrumentDescriptor;
use crate::constants::endpoints::LETF_OVERVIEW;
use crate::error::{ProviderResult, ResolveError};
use crate::fetch::Fetcher;
use crate::instrument::{Cross, IndicatorValues, RawNumber, Readings};

const DEFAULT_SMA: &str = "sma200";

/// LETF overview API: current course against a simple moving average.
pub struct LetfProvider {
    fetcher: Fetcher,
}

impl LetfProvider {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Provider for LetfProvider {
    fn name(&self) -> &'static str {
        "letf"
    }

    async fn fetch_readings(&self, descriptor: &InstrumentDescriptor) -> ProviderResult<Resolution> {
        let url = format!("{}{}", LETF_OVERVIEW, descriptor.require_symbol()?);
        let sma_type = descriptor.sma_type.as_deref().unwrap_or(DEFAULT_SMA);
        let response = self
            .fetcher
            .fetch(&url, &[("Accept", "application/json"), ("Content-Type", "application/json")])
            .await?;
        parse_overview(&response.body, sma_type)
    }
}

pub fn parse_overview(body: &str, sma_type: &str) -> ProviderResult<Resolution> {
    let overview: Map<String, Value> = serde_json::from_str(body)?;

    let number = |key: &str| -> ProviderResult<f64> {
        let raw = overview
            .get(key)
            .ok_or_else(|| ResolveError::layout(format!("'{}' missing", key)))?;
        Ok(RawNumber::from(raw).parse()?)
    };

    let current = number("current_course")?;
    let difference = current - number(sma_type)?;

    let mut crosses = Vec::new();
    for (key, flag) in &overview {
        if !key.ends_with("_cross") || !flag.as_bool().unwrap_or(false) {
            continue;
        }
        match Cross::from_key(key) {
            Some(cross) => crosses.push(cross),
            None => warn!("Ignoring unknown LETF cross flag '{}'", key),
        }
    }
    crosses.sort();

    let relation = if difference >= 0.0 { "über" } else { "unter" };
    let values = IndicatorValues::new(current, difference, crosses)?;

    Ok(Resolution::new(Readings::Indicator(values))
        .with_extra("sma_type", sma_type.to_uppercase())
        .with_extra("sma_relation", relation))
}
