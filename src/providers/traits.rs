use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use crate::config::{InstrumentCatalog, InstrumentDescriptor};
use crate::constants::prose::CLOSED_SUFFIX;
use crate::error::{ProviderResult, ResolveError};
use crate::instrument::{
    Currency, Instrument, InstrumentLine, InstrumentValues, LineTemplate, MarketState, Readings,
};

/// What a provider extracted for one instrument.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub readings: Readings,
    pub market_state: MarketState,
    pub extra: BTreeMap<String, String>,
}

impl Resolution {
    pub fn new(readings: Readings) -> Self {
        Self {
            readings,
            market_state: MarketState::Unknown,
            extra: BTreeMap::new(),
        }
    }

    pub fn quote(values: InstrumentValues) -> Self {
        Self::new(Readings::Quote(values))
    }

    pub fn with_market_state(mut self, state: MarketState) -> Self {
        self.market_state = state;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A named data source. Implementations perform exactly one fetch per call.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_readings(&self, descriptor: &InstrumentDescriptor) -> ProviderResult<Resolution>;

    /// Currency used for quote values unless the descriptor names one.
    fn currency(&self) -> Currency {
        Currency::Plain
    }

    /// Render this provider's lines upside down.
    fn reversed_lines(&self) -> bool {
        false
    }
}

/// Resolve one descriptor into an Instrument through `provider`.
pub async fn resolve(
    provider: &dyn Provider,
    descriptor: &InstrumentDescriptor,
    catalog: &InstrumentCatalog,
) -> Result<Instrument, ResolveError> {
    let resolution = provider.fetch_readings(descriptor).await?;

    let readings = match resolution.readings {
        Readings::Quote(values) => {
            let currency = descriptor.currency.unwrap_or_else(|| provider.currency());
            Readings::Quote(values.with_currency(currency))
        }
        indicator => indicator,
    };

    let key = descriptor.line_key();
    let closed_key = format!("{}{}", key, CLOSED_SUFFIX);
    let spec = match resolution.market_state {
        MarketState::Closed => catalog.line(&closed_key).or_else(|| catalog.line(key)),
        _ => catalog.line(key),
    }
    .ok_or_else(|| ResolveError::Descriptor(format!("no line template '{}'", key)))?;

    let mut extra = resolution.extra;
    if let Some(symbol) = &descriptor.symbol {
        extra.entry("symbol".to_string()).or_insert_with(|| symbol.clone());
    }

    debug!(
        "[{}] resolved '{}' ({:?})",
        provider.name(),
        descriptor.description,
        resolution.market_state
    );

    Ok(Instrument {
        description: descriptor.description.clone(),
        kind: descriptor.kind.clone(),
        priority: descriptor.priority,
        url: descriptor.url.clone(),
        readings,
        line: InstrumentLine::new(
            LineTemplate::from_spec(spec, provider.reversed_lines()),
            descriptor.plural,
        ),
        market_state: resolution.market_state,
        extra,
    })
}
