//! Text cleanup for inconsistently formatted upstream numbers

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValueError;
use crate::instrument::RawNumber;

/// First number in a string, with optional `,` thousands groups and decimals
static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[-+]?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?").expect("number pattern is valid")
});

/// Remove `,` thousands separators ("18,245.5" -> "18245.5").
pub fn strip_thousands(raw: &str) -> String {
    raw.trim().replace(',', "")
}

/// Pull the number out of text with currency pre- or suffixes ("US$4,512.25").
pub fn extract_number(raw: &str) -> Result<f64, ValueError> {
    let found = NUMBER
        .find(raw)
        .ok_or_else(|| ValueError::NotANumber { raw: raw.to_string() })?;
    RawNumber::from(strip_thousands(found.as_str())).parse()
}

/// Parse a European formatted number ("1.234,56 €" -> 1234.56).
pub fn parse_european(raw: &str) -> Result<f64, ValueError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '-' | '+'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Err(ValueError::NotANumber { raw: raw.to_string() });
    }
    RawNumber::from(cleaned).parse()
}
