use std::collections::HashMap;
use std::sync::Arc;

use crate::config::FetchSettings;
use crate::error::ForecastError;
use crate::fetch::Fetcher;

use super::{
    cnbc::CnbcProvider,
    coingecko::CoinGeckoProvider,
    investing::InvestingProvider,
    investiny::InvestinyProvider,
    letf::LetfProvider,
    onvista::OnvistaProvider,
    traits::Provider,
    yahoo::YahooProvider,
};
use crate::instrument::Currency;

/// Shared resources handed to provider factories.
#[derive(Clone)]
pub struct ProviderContext {
    pub fetcher: Fetcher,
    pub settings: FetchSettings,
}

pub type ProviderFactory = Arc<dyn Fn(&ProviderContext) -> Arc<dyn Provider> + Send + Sync>;

/// Provider name to factory, filled at process start.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every provider shipped in this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("investing", |ctx| Arc::new(InvestingProvider::new(ctx.fetcher.clone())));
        registry.register("investiny", |ctx| Arc::new(InvestinyProvider::new(&ctx.settings, false)));
        registry.register("investiny_upsidedown", |ctx| {
            Arc::new(InvestinyProvider::new(&ctx.settings, true))
        });
        registry.register("cnbc", |ctx| {
            Arc::new(CnbcProvider::new(ctx.fetcher.clone(), Currency::Plain))
        });
        registry.register("cnbc_dollar", |ctx| {
            Arc::new(CnbcProvider::new(ctx.fetcher.clone(), Currency::Dollar))
        });
        registry.register("onvista", |ctx| Arc::new(OnvistaProvider::new(ctx.fetcher.clone())));
        registry.register("yahoo", |ctx| {
            Arc::new(YahooProvider::new(ctx.fetcher.clone(), Currency::Plain))
        });
        registry.register("yahoo_dollar", |ctx| {
            Arc::new(YahooProvider::new(ctx.fetcher.clone(), Currency::Dollar))
        });
        registry.register("coingecko", |ctx| Arc::new(CoinGeckoProvider::new(ctx.fetcher.clone())));
        registry.register("letf", |ctx| Arc::new(LetfProvider::new(ctx.fetcher.clone())));
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderContext) -> Arc<dyn Provider> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn build(&self, name: &str, ctx: &ProviderContext) -> Result<Arc<dyn Provider>, ForecastError> {
        self.factories
            .get(name)
            .map(|factory| factory(ctx))
            .ok_or_else(|| ForecastError::UnregisteredProvider {
                name: name.to_string(),
            })
    }
}
