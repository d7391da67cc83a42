//! Unit tests for the pipeline orchestrator.

#[cfg(test)]
mod forecast_tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::config::{FetchSettings, InstrumentCatalog, InstrumentDescriptor};
    use crate::error::{FetchError, ForecastError, ProviderResult, ResolveError, WeatherError};
    use crate::fetch::Fetcher;
    use crate::forecast::*;
    use crate::instrument::{InstrumentValues, MarketState};
    use crate::prose::{ProseGenerator, WordBank};
    use crate::providers::{Provider, ProviderContext, ProviderRegistry, Resolution};
    use crate::weather::WeatherSource;

    const WORD_BANK: &str = r#"
futures:
  green: ["grün"]
  red: ["rot"]
  unchanged: ["flach"]
  prefixes: {light: ["leicht "], heavy: ["tief"]}
"#;

    #[derive(Clone, Copy)]
    enum Outcome {
        Open(f64),
        Closed(f64),
        Fail,
    }

    /// Answers by description; unknown descriptions fail like a 404.
    struct StubProvider {
        outcomes: Arc<HashMap<String, Outcome>>,
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn fetch_readings(&self, descriptor: &InstrumentDescriptor) -> ProviderResult<Resolution> {
            let outcome = self
                .outcomes
                .get(&descriptor.description)
                .copied()
                .unwrap_or(Outcome::Fail);
            match outcome {
                Outcome::Open(pct) => Ok(Resolution::quote(InstrumentValues::new(pct, 1000.0)?)
                    .with_market_state(MarketState::Open)),
                Outcome::Closed(pct) => Ok(Resolution::quote(InstrumentValues::new(pct, 1000.0)?)
                    .with_market_state(MarketState::Closed)),
                Outcome::Fail => Err(ResolveError::Fetch(FetchError::Http {
                    url: descriptor.url.clone(),
                    status: 404,
                })),
            }
        }
    }

    struct StubWeather(Option<&'static str>);

    #[async_trait]
    impl WeatherSource for StubWeather {
        async fn fragment(&self) -> Result<String, WeatherError> {
            self.0.map(str::to_string).ok_or(WeatherError::NoForecast)
        }
    }

    fn catalog(providers: &str) -> InstrumentCatalog {
        let yaml = format!(
            r#"
document: "{{prose_lines}}\n--\n{{weather}}"
defaults:
  type: futures
  url: "https://example.com"
lines:
  futures: "* {{name}} {{verb}} {{change_word}} ({{pct_change}})"
  futures_closed: "* {{name}} war {{change_word}}"
  broken: "* {{name}} {{sma_type}}"
  error: "* {{name}} {{verb}} fehlerhaft ({{pct_change}})"
  weather: "{{weather_attributes}}"
providers:
{}"#,
            providers
        );
        InstrumentCatalog::from_yaml_str(&yaml, Path::new("instruments.yaml")).unwrap()
    }

    fn forecaster(providers: &str, outcomes: &[(&str, Outcome)], weather: Option<&'static str>) -> Forecaster {
        let catalog = catalog(providers);
        let bank = WordBank::from_yaml_str(WORD_BANK, "test").unwrap();
        let prose = ProseGenerator::new(bank, catalog.document_template()).unwrap();

        let outcomes: Arc<HashMap<String, Outcome>> = Arc::new(
            outcomes
                .iter()
                .map(|(name, outcome)| (name.to_string(), *outcome))
                .collect(),
        );
        let mut registry = ProviderRegistry::new();
        registry.register("stub", move |_ctx| {
            Arc::new(StubProvider {
                outcomes: outcomes.clone(),
            })
        });

        let settings = FetchSettings::default();
        let context = ProviderContext {
            fetcher: Fetcher::new(&settings).unwrap(),
            settings,
        };
        Forecaster::new(registry, context, catalog, prose, Box::new(StubWeather(weather)))
    }

    fn prose_lines(document: &str) -> Vec<&str> {
        let (lines, _) = document.split_once("\n--\n").unwrap();
        lines.lines().collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    // ============= Failure Isolation Tests =============

    #[tokio::test]
    async fn test_k_of_n_failures_become_error_lines() {
        let providers = r#"
  - provider: stub
    instruments:
      - {description: A, priority: 1}
      - {description: B, priority: 2}
      - {description: C, priority: 3}
      - {description: D, priority: 4}
      - {description: E, priority: 5}
"#;
        let outcomes = [
            ("A", Outcome::Open(0.5)),
            ("C", Outcome::Open(-2.0)),
            ("E", Outcome::Open(0.0)),
        ];
        let document = forecaster(providers, &outcomes, Some("sonnig"))
            .run(&mut rng())
            .await
            .unwrap();

        let lines = prose_lines(&document);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines.iter().filter(|l| l.contains("fehlerhaft")).count(), 2);
        assert_eq!(
            lines,
            vec![
                "* A ist grün (+0.50%)",
                "* B ist fehlerhaft (n/a)",
                "* C ist tiefrot (-2.00%)",
                "* D ist fehlerhaft (n/a)",
                "* E ist flach (0.00%)",
            ]
        );
        assert!(document.ends_with("\n--\nsonnig"));
    }

    #[tokio::test]
    async fn test_priority_order_is_ascending_and_stable() {
        let providers = r#"
  - provider: stub
    instruments:
      - {description: Drei, priority: 3}
      - {description: Eins, priority: 1}
      - {description: Zwei, priority: 2}
      - {description: EinsB, priority: 1}
"#;
        let outcomes = [
            ("Drei", Outcome::Open(0.5)),
            ("Eins", Outcome::Open(0.5)),
            ("Zwei", Outcome::Open(0.5)),
            ("EinsB", Outcome::Open(0.5)),
        ];
        let document = forecaster(providers, &outcomes, Some("sonnig"))
            .run(&mut rng())
            .await
            .unwrap();

        let names: Vec<&str> = prose_lines(&document)
            .iter()
            .map(|l| l.split_whitespace().nth(1).unwrap())
            .collect();
        assert_eq!(names, vec!["Eins", "EinsB", "Zwei", "Drei"]);
    }

    #[tokio::test]
    async fn test_unknown_provider_group_is_skipped() {
        let providers = r#"
  - provider: teletext
    instruments:
      - {description: Videotext, priority: 1}
  - provider: stub
    instruments:
      - {description: A, priority: 2}
"#;
        let document = forecaster(providers, &[("A", Outcome::Open(1.5))], Some("sonnig"))
            .run(&mut rng())
            .await
            .unwrap();

        assert_eq!(prose_lines(&document), vec!["* A ist tiefgrün (+1.50%)"]);
    }

    #[tokio::test]
    async fn test_invalid_descriptor_becomes_error_line() {
        let providers = r#"
  - provider: stub
    instruments:
      - {description: Kaputt, priority: 1, plural: true, type: [1, 2]}
      - {description: A, priority: 2}
"#;
        let document = forecaster(providers, &[("A", Outcome::Open(0.5))], Some("sonnig"))
            .run(&mut rng())
            .await
            .unwrap();

        assert_eq!(
            prose_lines(&document),
            vec!["* Kaputt sind fehlerhaft (n/a)", "* A ist grün (+0.50%)"]
        );
    }

    #[tokio::test]
    async fn test_render_failure_becomes_error_line() {
        let providers = r#"
  - provider: stub
    instruments:
      - {description: A, priority: 1, line: broken}
"#;
        let document = forecaster(providers, &[("A", Outcome::Open(-0.25))], Some("sonnig"))
            .run(&mut rng())
            .await
            .unwrap();

        assert_eq!(prose_lines(&document), vec!["* A ist fehlerhaft (-0.25%)"]);
    }

    #[tokio::test]
    async fn test_missing_line_template_becomes_error_line() {
        let providers = r#"
  - provider: stub
    instruments:
      - {description: A, priority: 1, line: nirgendwo}
"#;
        let document = forecaster(providers, &[("A", Outcome::Open(0.5))], Some("sonnig"))
            .run(&mut rng())
            .await
            .unwrap();

        assert_eq!(prose_lines(&document), vec!["* A ist fehlerhaft (n/a)"]);
    }

    #[tokio::test]
    async fn test_closed_market_uses_closed_line() {
        let providers = r#"
  - provider: stub
    instruments:
      - {description: A, priority: 1}
"#;
        let document = forecaster(providers, &[("A", Outcome::Closed(-0.5))], Some("sonnig"))
            .run(&mut rng())
            .await
            .unwrap();

        assert_eq!(prose_lines(&document), vec!["* A war rot"]);
    }

    // ============= Run-level Failure Tests =============

    #[tokio::test]
    async fn test_missing_prose_kind_propagates() {
        let providers = r#"
  - provider: stub
    instruments:
      - {description: A, priority: 1, type: bonds, line: futures}
"#;
        let result = forecaster(providers, &[("A", Outcome::Open(0.5))], Some("sonnig"))
            .run(&mut rng())
            .await;

        assert!(matches!(result, Err(ForecastError::MissingProseKind { kind }) if kind == "bonds"));
    }

    #[tokio::test]
    async fn test_weather_failure_aborts_run() {
        let providers = r#"
  - provider: stub
    instruments:
      - {description: A, priority: 1}
"#;
        let result = forecaster(providers, &[("A", Outcome::Open(0.5))], None)
            .run(&mut rng())
            .await;

        assert!(matches!(result, Err(ForecastError::Weather(WeatherError::NoForecast))));
    }

    // ============= Error Line Tests =============

    #[test]
    fn test_error_context_from_mapping() {
        let merged: serde_yaml::Mapping =
            serde_yaml::from_str("{description: Gold, type: futures, priority: 7, url: ''}").unwrap();
        let context = ErrorContext::from_mapping(&merged);

        assert_eq!(context.description, "Gold");
        assert_eq!(context.kind, "futures");
        assert_eq!(context.url, "n/a");
        assert!(!context.plural);
        assert_eq!(merged_priority(&merged), 7);
    }

    #[test]
    fn test_error_line_falls_back_when_template_is_broken() {
        let providers = "  []\n";
        let mut subject = forecaster(providers, &[], Some("sonnig"));
        let context = ErrorContext {
            description: "Gold".to_string(),
            kind: "futures".to_string(),
            url: "n/a".to_string(),
            plural: true,
            pct_change: "n/a".to_string(),
            absolute_value: "n/a".to_string(),
        };
        assert_eq!(subject.error_line(&context), "* Gold sind fehlerhaft (n/a)");

        // Replace the catalog with one whose error line needs an unknown field
        let broken = InstrumentCatalog::from_yaml_str(
            "lines:\n  error: \"{name} {crosses}\"\n  weather: \"{weather_attributes}\"\n",
            Path::new("instruments.yaml"),
        )
        .unwrap();
        let bank = WordBank::from_yaml_str(WORD_BANK, "test").unwrap();
        let prose = ProseGenerator::new(bank, broken.document_template()).unwrap();
        let settings = FetchSettings::default();
        subject = Forecaster::new(
            ProviderRegistry::new(),
            ProviderContext {
                fetcher: Fetcher::new(&settings).unwrap(),
                settings,
            },
            broken,
            prose,
            Box::new(StubWeather(Some("sonnig"))),
        );
        assert_eq!(
            subject.error_line(&context),
            "* Gold sind **unverständlich/fehlerhaft**."
        );

        let singular = ErrorContext {
            plural: false,
            ..context
        };
        assert_eq!(
            subject.error_line(&singular),
            "* Gold ist **unverständlich/fehlerhaft**."
        );
    }
}
