use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::traits::{Provider, Resolution};
use crate::config::InstrumentDescriptor;
use crate::constants::endpoints::COINGECKO_API;
use crate::error::{ProviderResult, ResolveError};
use crate::fetch::{with_query, Fetcher};
use crate::instrument::{values::round2, Currency, InstrumentValues};

const DEFAULT_COIN: &str = "bitcoin";

#[derive(Debug, Deserialize)]
struct CoinResponse {
    market_data: MarketData,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    price_change_percentage_24h: Option<f64>,
    current_price: HashMap<String, f64>,
}

/// CoinGecko coin API. The coin id comes from `coin` (default bitcoin).
pub struct CoinGeckoProvider {
    fetcher: Fetcher,
}

impl CoinGeckoProvider {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Provider for CoinGeckoProvider {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn fetch_readings(&self, descriptor: &InstrumentDescriptor) -> ProviderResult<Resolution> {
        let coin = descriptor.coin.as_deref().unwrap_or(DEFAULT_COIN);
        let base = format!("{}/coins/{}", COINGECKO_API, coin);
        let url = with_query(
            &base,
            &[
                ("tickers", "false"),
                ("market_data", "true"),
                ("community_data", "false"),
                ("developer_data", "false"),
                ("sparkline", "false"),
            ],
        )?;

        let response = self.fetcher.fetch(&url, &[]).await?;
        parse_coin(&response.body, vs_currency(descriptor.currency.unwrap_or(self.currency())))
    }

    fn currency(&self) -> Currency {
        Currency::Dollar
    }
}

fn vs_currency(currency: Currency) -> &'static str {
    match currency {
        Currency::Euro => "eur",
        _ => "usd",
    }
}

pub fn parse_coin(body: &str, vs_currency: &str) -> ProviderResult<Resolution> {
    let coin: CoinResponse = serde_json::from_str(body)?;
    let price = coin
        .market_data
        .current_price
        .get(vs_currency)
        .copied()
        .ok_or_else(|| ResolveError::layout(format!("no {} price", vs_currency)))?;
    let change = coin
        .market_data
        .price_change_percentage_24h
        .ok_or_else(|| ResolveError::layout("price_change_percentage_24h missing"))?;

    Ok(Resolution::quote(InstrumentValues::new(round2(change), price)?))
}
