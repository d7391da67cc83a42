//! Integration tests for the forecast pipeline.
//! These tests drive the public API end to end with stub data sources.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;

use wetterbericht::config::{FetchSettings, InstrumentCatalog, InstrumentDescriptor, WeatherSettings};
use wetterbericht::error::{FetchError, ProviderResult, ResolveError, WeatherError};
use wetterbericht::fetch::{Fetcher, RetryPolicy};
use wetterbericht::instrument::{InstrumentValues, LineTemplate, MarketState};
use wetterbericht::providers::{resolve, Provider, ProviderContext, ProviderRegistry, Resolution};
use wetterbericht::weather::{join_terms, prettify, render_fragment, WeatherSource};
use wetterbericht::{Forecaster, InstrumentLine, ProseGenerator, WordBank};

const WORD_BANK: &str = r#"
futures:
  green: ["grün"]
  red: ["rot"]
  unchanged: ["unverändert"]
  prefixes:
    light: ["hellgrau-"]
    heavy: ["tief"]
special:
  green: ["bullisch"]
  red: ["bärisch"]
  unchanged: ["langweilig"]
  prefixes:
    light: ["ein bisschen "]
    heavy: ["extrem "]
"#;

const INSTRUMENTS: &str = r#"
defaults:
  plural: false
lines:
  futures: "* [{name}]({url}) {verb} **{change_word}**, mit **{pct_change}** (Kurs: {absolute_value})."
  special: "* [{name}]({url}) {verb} **{change_word}**. Der Preis liegt bei **{absolute_value}**."
  upsidedown:
    - "* ["
    - "{name}"
    - "]({url}) "
    - "{verb} **{change_word}**"
  error: "* [{name}]({url}) {verb} **unverständlich/fehlerhaft**: **{pct_change}** (Kurs: {absolute_value})."
  weather: "* [Die Wettervorhersage]({url}) für Dachsenhausen sagt einen **{weather_attributes}** Tag voraus."
providers:
  - provider: futures_feed
    defaults:
      type: futures
    instruments:
      - description: Dow Jones Futures
        url: "https://example.com/dow"
        plural: true
        priority: 2
  - provider: special_feed
    defaults:
      type: special
    instruments:
      - description: Bitcoin
        url: "https://example.com/btc"
        priority: 1
"#;

/// Always answers with a fixed percentage change.
struct FixedQuote(f64);

#[async_trait]
impl Provider for FixedQuote {
    fn name(&self) -> &'static str {
        "futures_feed"
    }

    async fn fetch_readings(&self, _descriptor: &InstrumentDescriptor) -> ProviderResult<Resolution> {
        Ok(Resolution::quote(InstrumentValues::new(self.0, 33_512.25)?).with_market_state(MarketState::Open))
    }
}

/// Fails like an upstream that keeps answering 503.
struct Unreachable;

#[async_trait]
impl Provider for Unreachable {
    fn name(&self) -> &'static str {
        "special_feed"
    }

    async fn fetch_readings(&self, descriptor: &InstrumentDescriptor) -> ProviderResult<Resolution> {
        Err(ResolveError::Fetch(FetchError::RetriesExhausted {
            url: descriptor.url.clone(),
            attempts: 4,
            last: "HTTP 503".to_string(),
        }))
    }
}

/// Renders a fixed set of terms through the catalog's weather template.
struct FixedWeather {
    line: InstrumentLine,
    terms: Vec<String>,
}

#[async_trait]
impl WeatherSource for FixedWeather {
    async fn fragment(&self) -> Result<String, WeatherError> {
        let settings = WeatherSettings::default();
        let attributes = prettify(self.terms.clone(), &settings.transformers)?;
        render_fragment(&self.line, &attributes, &settings.url)
    }
}

fn build_forecaster(registry: ProviderRegistry, terms: &[&str]) -> Forecaster {
    let catalog = InstrumentCatalog::from_yaml_str(INSTRUMENTS, Path::new("instruments.yaml")).unwrap();
    let word_bank = WordBank::from_yaml_str(WORD_BANK, "prose.yaml").unwrap();
    let prose = ProseGenerator::new(word_bank, catalog.document_template()).unwrap();

    let weather_line = InstrumentLine::new(
        LineTemplate::from_spec(catalog.line("weather").unwrap(), false),
        false,
    );
    let weather = FixedWeather {
        line: weather_line,
        terms: terms.iter().map(|t| t.to_string()).collect(),
    };

    let settings = FetchSettings {
        max_retries: 0,
        backoff_secs: 0,
        ..FetchSettings::default()
    };
    let context = ProviderContext {
        fetcher: Fetcher::new(&settings).unwrap(),
        settings,
    };
    Forecaster::new(registry, context, catalog, prose, Box::new(weather))
}

fn stub_registry(futures_pct: f64) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register("futures_feed", move |_ctx| Arc::new(FixedQuote(futures_pct)));
    registry.register("special_feed", |_ctx| Arc::new(Unreachable));
    registry
}

/// Error line for priority 1 first, then the heavy green futures line, then the weather.
#[tokio::test]
async fn test_end_to_end_failed_special_and_heavy_green_futures() {
    let forecaster = build_forecaster(stub_registry(1.2), &["sonnig", "heiter"]);
    let document = forecaster
        .run(&mut StdRng::seed_from_u64(1))
        .await
        .unwrap();

    let error_line = "* [Bitcoin](https://example.com/btc) ist **unverständlich/fehlerhaft**: **n/a** (Kurs: n/a).";
    let futures_line = "* [Dow Jones Futures](https://example.com/dow) sind **tiefgrün**, mit **+1.20%** (Kurs: 33,512.25).";
    let weather_line = "für Dachsenhausen sagt einen **heiter und sonnig** Tag voraus.";

    let error_at = document.find(error_line).expect("error line present");
    let futures_at = document.find(futures_line).expect("futures line present");
    let weather_at = document.find(weather_line).expect("weather line present");
    assert!(error_at < futures_at);
    assert!(futures_at < weather_at);

    assert!(document.starts_with("Guten Morgen zusammen"));
    assert!(!document.contains("bullisch"));
    assert!(!document.contains("bärisch"));
}

#[tokio::test]
async fn test_end_to_end_weather_terms_are_normalized() {
    let forecaster = build_forecaster(stub_registry(-0.05), &["nebel", "leichter regen und windig", "nebel"]);
    let document = forecaster
        .run(&mut StdRng::seed_from_u64(2))
        .await
        .unwrap();

    assert!(document.contains("**hellgrau-rot**"));
    assert!(document.contains("**leicht regnerisch und windig und nebelig**"));
}

#[tokio::test]
async fn test_end_to_end_without_weather_fails() {
    let forecaster = build_forecaster(stub_registry(0.5), &[]);
    let result = forecaster.run(&mut StdRng::seed_from_u64(3)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_upside_down_line_from_catalog() {
    let catalog = InstrumentCatalog::from_yaml_str(INSTRUMENTS, Path::new("instruments.yaml")).unwrap();
    let descriptor: InstrumentDescriptor = serde_yaml::from_str(
        "{description: Gold, type: futures, line: upsidedown, url: 'https://example.com/gold'}",
    )
    .unwrap();

    let instrument = resolve(&FixedQuote(0.5), &descriptor, &catalog).await.unwrap();
    let prose = ProseGenerator::new(
        WordBank::from_yaml_str(WORD_BANK, "prose.yaml").unwrap(),
        catalog.document_template(),
    )
    .unwrap();
    let line = instrument.render(&prose, &mut StdRng::seed_from_u64(4)).unwrap();

    assert!(line.starts_with("* ["));
    assert!(line.contains("](https://example.com/gold) "));
    assert!(!line.contains("Gold"));
    assert!(!line.contains("grün"));
}

#[tokio::test]
async fn test_end_to_end_with_empty_registry() {
    let forecaster = build_forecaster(ProviderRegistry::new(), &["sonnig"]);
    let document = forecaster.run(&mut StdRng::seed_from_u64(5)).await.unwrap();

    assert!(document.contains("**sonnig**"));
    assert!(!document.contains("* [Bitcoin]"));
}

#[test]
fn test_join_terms_rule() {
    let terms: Vec<String> = ["a", "b", "c"].iter().map(|t| t.to_string()).collect();
    assert_eq!(join_terms(&terms[..1]), "a");
    assert_eq!(join_terms(&terms[..2]), "a und b");
    assert_eq!(join_terms(&terms), "a, b und c");
}

#[test]
fn test_retry_policy_from_settings() {
    let policy = RetryPolicy::from(&FetchSettings::default());
    assert_eq!(policy.attempts(), 4);
    assert_eq!(policy.delay(2).as_secs(), 10);
}
