use std::collections::BTreeMap;

use serde::Deserialize;

use super::upside_down::upside_down;
use crate::constants::prose::{VERB_PLURAL, VERB_SINGULAR};
use crate::error::FormatError;

/// Named substitutions for a line template.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineFields {
    values: BTreeMap<String, String>,
}

impl LineFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for LineFields {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

/// Substitute `{name}` placeholders. `{{` and `}}` are literal braces.
pub fn fill(template: &str, fields: &LineFields) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;
    let mut offset = 0;

    while let Some(pos) = rest.find(|c| c == '{' || c == '}') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            offset += pos + 2;
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            offset += pos + 2;
        } else if tail.starts_with('}') {
            return Err(FormatError::Malformed {
                position: offset + pos,
            });
        } else {
            let close = tail.find('}').ok_or(FormatError::Malformed {
                position: offset + pos,
            })?;
            let key = &tail[1..close];
            if key.is_empty() || key.contains('{') {
                return Err(FormatError::Malformed {
                    position: offset + pos,
                });
            }
            let value = fields.get(key).ok_or_else(|| FormatError::MissingField {
                field: key.to_string(),
            })?;
            if value.trim().is_empty() {
                return Err(FormatError::EmptyValue {
                    field: key.to_string(),
                });
            }
            out.push_str(value);
            rest = &tail[close + 1..];
            offset += pos + close + 1;
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// One piece of a reversed template.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Segment {
    pub text: String,
    #[serde(default)]
    pub reversed: bool,
}

impl Segment {
    pub fn new(text: impl Into<String>, reversed: bool) -> Self {
        Self {
            text: text.into(),
            reversed,
        }
    }
}

/// Line template as written in the instruments file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LineSpec {
    Plain(String),
    /// Every second entry (odd index) is written upside down.
    Alternating(Vec<String>),
    Flagged(Vec<Segment>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineTemplate {
    Standard(String),
    Reversed(Vec<Segment>),
}

impl LineTemplate {
    /// `force_reversed` turns a plain template into a single upside-down segment.
    pub fn from_spec(spec: &LineSpec, force_reversed: bool) -> Self {
        match spec {
            LineSpec::Plain(text) if force_reversed => {
                LineTemplate::Reversed(vec![Segment::new(text.clone(), true)])
            }
            LineSpec::Plain(text) => LineTemplate::Standard(text.clone()),
            LineSpec::Alternating(parts) => LineTemplate::Reversed(
                parts
                    .iter()
                    .enumerate()
                    .map(|(i, text)| Segment::new(text.clone(), i % 2 == 1))
                    .collect(),
            ),
            LineSpec::Flagged(segments) => LineTemplate::Reversed(segments.clone()),
        }
    }
}

/// A line template plus the grammatical number of the instrument's name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstrumentLine {
    template: LineTemplate,
    plural: bool,
}

impl InstrumentLine {
    pub fn new(template: LineTemplate, plural: bool) -> Self {
        Self { template, plural }
    }

    pub fn is_plural(&self) -> bool {
        self.plural
    }

    pub fn verb(&self) -> &'static str {
        if self.plural {
            VERB_PLURAL
        } else {
            VERB_SINGULAR
        }
    }

    /// Fill the template. `verb` is supplied from plurality unless already set.
    pub fn render(&self, fields: &LineFields) -> Result<String, FormatError> {
        let mut fields = fields.clone();
        if !fields.contains("verb") {
            fields.insert("verb", self.verb());
        }

        match &self.template {
            LineTemplate::Standard(text) => fill(text, &fields),
            LineTemplate::Reversed(segments) => {
                let mut line = String::new();
                // Segments stay in reading order; only their characters are mirrored.
                for segment in segments {
                    let filled = fill(&segment.text, &fields)?;
                    if segment.reversed {
                        line.push_str(&upside_down(&filled));
                    } else {
                        line.push_str(&filled);
                    }
                }
                Ok(line)
            }
        }
    }
}
