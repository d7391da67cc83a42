use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::prose::{CROSS_CONJUNCTION, NO_CROSS};
use crate::error::ValueError;

/// A number as it arrives from upstream: already numeric or still text.
#[derive(Clone, Debug, PartialEq)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    /// Parse into a finite float. Text may carry a trailing `%` and a leading `+`.
    pub fn parse(&self) -> Result<f64, ValueError> {
        let value = match self {
            RawNumber::Number(n) => *n,
            RawNumber::Text(raw) => {
                let cleaned = raw.trim().trim_end_matches('%').trim();
                let cleaned = cleaned.strip_prefix('+').unwrap_or(cleaned);
                cleaned
                    .parse::<f64>()
                    .map_err(|_| ValueError::NotANumber { raw: raw.clone() })?
            }
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ValueError::NotFinite { value })
        }
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        RawNumber::Number(value)
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        RawNumber::Text(value.to_string())
    }
}

impl From<String> for RawNumber {
    fn from(value: String) -> Self {
        RawNumber::Text(value)
    }
}

impl From<&Value> for RawNumber {
    fn from(value: &Value) -> Self {
        match value {
            Value::Number(n) => n
                .as_f64()
                .map(RawNumber::Number)
                .unwrap_or_else(|| RawNumber::Text(n.to_string())),
            Value::String(s) => RawNumber::Text(s.clone()),
            other => RawNumber::Text(other.to_string()),
        }
    }
}

/// Formatting strategy for absolute values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    Plain,
    Dollar,
    Euro,
}

impl Currency {
    pub fn decorate(self, amount: String) -> String {
        match self {
            Currency::Plain => amount,
            Currency::Dollar => format!("${}", amount),
            Currency::Euro => format!("{} €", amount),
        }
    }
}

/// Canonical price and percentage change of an instrument.
#[derive(Clone, Debug, PartialEq)]
pub struct InstrumentValues {
    pct_change: f64,
    absolute_value: f64,
    currency: Currency,
}

impl InstrumentValues {
    pub fn new(
        pct_change: impl Into<RawNumber>,
        absolute_value: impl Into<RawNumber>,
    ) -> Result<Self, ValueError> {
        Ok(Self {
            pct_change: pct_change.into().parse()?,
            absolute_value: absolute_value.into().parse()?,
            currency: Currency::Plain,
        })
    }

    /// Build from current and previous period values.
    pub fn from_previous(current: f64, previous: f64) -> Result<Self, ValueError> {
        Self::new(percent_change(current, previous), current)
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn pct_change(&self) -> f64 {
        self.pct_change
    }

    pub fn absolute_value(&self) -> f64 {
        self.absolute_value
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Two decimals and a percent sign. A change that displays as zero carries no sign.
    pub fn pretty_pct_change(&self) -> String {
        let digits = format!("{:.2}", self.pct_change);
        match digits.as_str() {
            "0.00" | "-0.00" => "0.00%".to_string(),
            _ if self.pct_change > 0.0 => format!("+{}%", digits),
            _ => format!("{}%", digits),
        }
    }

    pub fn pretty_absolute_value(&self) -> String {
        self.currency
            .decorate(group_thousands(&self.absolute_value.to_string()))
    }
}

/// `(current - previous) / previous * 100`, rounded to two decimals.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    round2((current - previous) / previous * 100.0)
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Insert `,` separators into the integer part of a plain decimal string.
pub fn group_thousands(number: &str) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match fraction {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// Named threshold crossings reported by the LETF source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Cross {
    Sma200,
    Sma220,
    Golden,
    Death,
}

impl Cross {
    /// Map an upstream flag key such as `is_golden_cross`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "is_sma200_cross" => Some(Cross::Sma200),
            "is_sma220_cross" => Some(Cross::Sma220),
            "is_golden_cross" => Some(Cross::Golden),
            "is_death_cross" => Some(Cross::Death),
            _ => None,
        }
    }

    pub fn phrase(self) -> &'static str {
        match self {
            Cross::Sma200 => "eine SMA200✝️igung",
            Cross::Sma220 => "eine SMA220✝️igung",
            Cross::Golden => "eine 👑✝️igung",
            Cross::Death => "eine ☠️✝️igung",
        }
    }
}

/// Values of a computed-indicator instrument (price vs. moving average).
#[derive(Clone, Debug, PartialEq)]
pub struct IndicatorValues {
    absolute_value: f64,
    sma_difference: f64,
    crosses: Vec<Cross>,
}

impl IndicatorValues {
    pub fn new(
        absolute_value: impl Into<RawNumber>,
        sma_difference: impl Into<RawNumber>,
        crosses: Vec<Cross>,
    ) -> Result<Self, ValueError> {
        Ok(Self {
            absolute_value: absolute_value.into().parse()?,
            sma_difference: sma_difference.into().parse()?,
            crosses,
        })
    }

    pub fn absolute_value(&self) -> f64 {
        self.absolute_value
    }

    pub fn crosses(&self) -> &[Cross] {
        &self.crosses
    }

    pub fn pretty_absolute_value(&self) -> String {
        group_thousands(&(self.absolute_value.trunc() as i64).to_string())
    }

    /// Unsigned whole-number distance to the moving average.
    pub fn pretty_sma_difference(&self) -> String {
        group_thousands(&(self.sma_difference.trunc() as i64).unsigned_abs().to_string())
    }

    pub fn pretty_crosses(&self) -> String {
        if self.crosses.is_empty() {
            return NO_CROSS.to_string();
        }
        self.crosses
            .iter()
            .map(|c| c.phrase())
            .collect::<Vec<_>>()
            .join(CROSS_CONJUNCTION)
    }
}

/// What a provider measured for one instrument.
#[derive(Clone, Debug, PartialEq)]
pub enum Readings {
    Quote(InstrumentValues),
    Indicator(IndicatorValues),
}

impl Readings {
    pub fn pretty_pct_change(&self) -> Option<String> {
        match self {
            Readings::Quote(v) => Some(v.pretty_pct_change()),
            Readings::Indicator(_) => None,
        }
    }

    pub fn pretty_absolute_value(&self) -> String {
        match self {
            Readings::Quote(v) => v.pretty_absolute_value(),
            Readings::Indicator(v) => v.pretty_absolute_value(),
        }
    }
}
