//! Pipeline orchestrator
//!
//! Resolves every configured instrument through its provider, downgrades
//! per-instrument failures to pre-rendered error lines, orders the entries by
//! priority and composes the final document around the weather fragment.

use std::sync::Arc;

use rand::Rng;
use serde_yaml::{Mapping, Value};
use tracing::{error, info, warn};

use crate::config::{InstrumentCatalog, ProviderGroup};
use crate::constants::prose::{ERROR_LINE, PLACEHOLDER, VERB_PLURAL, VERB_SINGULAR};
use crate::error::ForecastError;
use crate::instrument::{Instrument, InstrumentLine, LineFields, LineTemplate};
use crate::prose::ProseGenerator;
use crate::providers::{resolve, Provider, ProviderContext, ProviderRegistry};
use crate::weather::WeatherSource;

/// One slot of the report, before rendering.
#[derive(Clone, Debug)]
pub enum ReportEntry {
    Resolved(Instrument),
    /// Resolution failed; the error line is already rendered
    Failed { priority: i64, line: String },
}

impl ReportEntry {
    pub fn priority(&self) -> i64 {
        match self {
            ReportEntry::Resolved(instrument) => instrument.priority,
            ReportEntry::Failed { priority, .. } => *priority,
        }
    }
}

/// What an error line may know about the instrument it replaces.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorContext {
    pub description: String,
    pub kind: String,
    pub url: String,
    pub plural: bool,
    pub pct_change: String,
    pub absolute_value: String,
}

impl ErrorContext {
    /// Best effort identity from a merged descriptor mapping that may not deserialize.
    pub fn from_mapping(merged: &Mapping) -> Self {
        let text = |key: &str| {
            merged
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(PLACEHOLDER)
                .to_string()
        };
        Self {
            description: text("description"),
            kind: text("type"),
            url: text("url"),
            plural: merged.get("plural").and_then(Value::as_bool).unwrap_or(false),
            pct_change: PLACEHOLDER.to_string(),
            absolute_value: PLACEHOLDER.to_string(),
        }
    }

    pub fn from_instrument(instrument: &Instrument) -> Self {
        let or_placeholder = |s: &str| {
            if s.trim().is_empty() {
                PLACEHOLDER.to_string()
            } else {
                s.to_string()
            }
        };
        Self {
            description: or_placeholder(&instrument.description),
            kind: or_placeholder(&instrument.kind),
            url: or_placeholder(&instrument.url),
            plural: instrument.line.is_plural(),
            pct_change: instrument
                .readings
                .pretty_pct_change()
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            absolute_value: or_placeholder(&instrument.readings.pretty_absolute_value()),
        }
    }

    fn fields(&self) -> LineFields {
        LineFields::new()
            .with("description", self.description.as_str())
            .with("name", self.description.as_str())
            .with("type", self.kind.as_str())
            .with("url", self.url.as_str())
            .with("pct_change", self.pct_change.as_str())
            .with("absolute_value", self.absolute_value.as_str())
    }
}

pub fn merged_priority(merged: &Mapping) -> i64 {
    merged.get("priority").and_then(Value::as_i64).unwrap_or(0)
}

pub struct Forecaster {
    registry: ProviderRegistry,
    context: ProviderContext,
    catalog: InstrumentCatalog,
    prose: ProseGenerator,
    weather: Box<dyn WeatherSource>,
}

impl Forecaster {
    pub fn new(
        registry: ProviderRegistry,
        context: ProviderContext,
        catalog: InstrumentCatalog,
        prose: ProseGenerator,
        weather: Box<dyn WeatherSource>,
    ) -> Self {
        Self {
            registry,
            context,
            catalog,
            prose,
            weather,
        }
    }

    /// Produce the full document. Fails only on configuration defects and a
    /// missing weather forecast.
    pub async fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String, ForecastError> {
        info!("🚀 Starting forecast run ({} provider groups)", self.catalog.providers.len());

        let mut entries = self.collect().await;
        entries.sort_by_key(ReportEntry::priority);

        let lines = self.render_lines(entries, rng)?;
        let weather = self.weather.fragment().await?;

        info!("📝 Composed forecast with {} lines", lines.len());
        Ok(self.prose.compose_document(&lines, &weather))
    }

    /// Resolve every instrument of every known provider group, in config order.
    pub async fn collect(&self) -> Vec<ReportEntry> {
        let mut entries = Vec::new();

        for group in &self.catalog.providers {
            let provider = match self.registry.build(&group.provider, &self.context) {
                Ok(provider) => provider,
                Err(e) => {
                    warn!("⚠️ Skipping {} instruments: {}", group.instruments.len(), e);
                    continue;
                }
            };
            info!("📡 [{}] resolving {} instruments", provider.name(), group.instruments.len());

            for raw in &group.instruments {
                entries.push(self.resolve_entry(&provider, group, raw).await);
            }
        }
        entries
    }

    async fn resolve_entry(
        &self,
        provider: &Arc<dyn Provider>,
        group: &ProviderGroup,
        raw: &Mapping,
    ) -> ReportEntry {
        let merged = self.catalog.merged(group, raw);
        let priority = merged_priority(&merged);

        let result = match self.catalog.descriptor(group, raw) {
            Ok(descriptor) => resolve(provider.as_ref(), &descriptor, &self.catalog).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(instrument) => ReportEntry::Resolved(instrument),
            Err(e) => {
                let context = ErrorContext::from_mapping(&merged);
                error!("❌ [{}] '{}' failed: {}", provider.name(), context.description, e);
                ReportEntry::Failed {
                    priority,
                    line: self.error_line(&context),
                }
            }
        }
    }

    /// Render resolved instruments; failed entries keep their error line.
    pub fn render_lines<R: Rng + ?Sized>(
        &self,
        entries: Vec<ReportEntry>,
        rng: &mut R,
    ) -> Result<Vec<String>, ForecastError> {
        let mut lines = Vec::with_capacity(entries.len());
        for entry in entries {
            let line = match entry {
                ReportEntry::Failed { line, .. } => line,
                ReportEntry::Resolved(instrument) => match instrument.render(&self.prose, rng) {
                    Ok(line) => line,
                    Err(ForecastError::Format(e)) => {
                        warn!("⚠️ Line for '{}' could not be rendered: {}", instrument.description, e);
                        self.error_line(&ErrorContext::from_instrument(&instrument))
                    }
                    Err(e) => return Err(e),
                },
            };
            lines.push(line);
        }
        Ok(lines)
    }

    /// The catalog's error template; a fixed sentence if that template is itself broken.
    pub fn error_line(&self, context: &ErrorContext) -> String {
        let rendered = self.catalog.line(ERROR_LINE).map(|spec| {
            InstrumentLine::new(LineTemplate::from_spec(spec, false), context.plural)
                .render(&context.fields())
        });

        match rendered {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                warn!("⚠️ Error template unusable: {}", e);
                fallback_error_line(context)
            }
            None => fallback_error_line(context),
        }
    }
}

fn fallback_error_line(context: &ErrorContext) -> String {
    let verb = if context.plural { VERB_PLURAL } else { VERB_SINGULAR };
    format!("* {} {} **unverständlich/fehlerhaft**.", context.description, verb)
}
