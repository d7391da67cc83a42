pub mod line;
pub mod upside_down;
pub mod values;

use std::collections::BTreeMap;

use rand::Rng;

use crate::error::ForecastError;
use crate::prose::ProseGenerator;

pub use line::{InstrumentLine, LineFields, LineSpec, LineTemplate, Segment};
pub use values::{Cross, Currency, IndicatorValues, InstrumentValues, RawNumber, Readings};

#[cfg(test)]
mod line_tests;

/// Trading state reported by the source, if it reports one at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MarketState {
    Open,
    Closed,
    #[default]
    Unknown,
}

/// One resolved instrument of a report run.
#[derive(Clone, Debug)]
pub struct Instrument {
    pub description: String,
    /// Word bank kind, e.g. "futures"
    pub kind: String,
    pub priority: i64,
    pub url: String,
    pub readings: Readings,
    pub line: InstrumentLine,
    pub market_state: MarketState,
    /// Provider specific fields exposed to the template (symbol, sma_type, ...)
    pub extra: BTreeMap<String, String>,
}

impl Instrument {
    /// Everything a template may reference, except the change word.
    pub fn fields(&self) -> LineFields {
        let mut fields = LineFields::new()
            .with("description", self.description.as_str())
            .with("name", self.description.as_str())
            .with("url", self.url.as_str())
            .with("verb", self.line.verb())
            .with("absolute_value", self.readings.pretty_absolute_value());

        match &self.readings {
            Readings::Quote(values) => {
                fields.insert("pct_change", values.pretty_pct_change());
            }
            Readings::Indicator(values) => {
                fields.insert("sma_difference", values.pretty_sma_difference());
                fields.insert("crosses", values.pretty_crosses());
            }
        }

        fields.extend(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        fields
    }

    /// Render the prose line. Quotes consult the word bank for a change word,
    /// indicators do not.
    pub fn render<R: Rng + ?Sized>(
        &self,
        prose: &ProseGenerator,
        rng: &mut R,
    ) -> Result<String, ForecastError> {
        let mut fields = self.fields();
        if let Readings::Quote(values) = &self.readings {
            let word = prose.choose_change_word(rng, values.pct_change(), &self.kind)?;
            fields.insert("change_word", word.clone());
            fields.insert("word_change", word);
        }
        Ok(self.line.render(&fields)?)
    }
}
