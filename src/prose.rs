//! Word bank and change-word selection
//!
//! Phrases are grouped per instrument kind into green, red and unchanged
//! buckets. Small moves get a "light" prefix, big moves a "heavy" one.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use tracing::debug;

use crate::error::ForecastError;

/// Changes at or above this magnitude (in percent) get a heavy prefix
pub const HEAVY_THRESHOLD: f64 = 1.0;
/// Changes at or below this magnitude get a light prefix
pub const LIGHT_THRESHOLD: f64 = 0.1;

const PROSE_LINES_TOKEN: &str = "{prose_lines}";
const WEATHER_TOKEN: &str = "{weather}";

#[derive(Clone, Debug, Deserialize)]
pub struct Prefixes {
    pub light: Vec<String>,
    pub heavy: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProseKind {
    pub green: Vec<String>,
    pub red: Vec<String>,
    pub unchanged: Vec<String>,
    pub prefixes: Prefixes,
}

impl ProseKind {
    fn buckets(&self) -> [(&'static str, &Vec<String>); 5] {
        [
            ("green", &self.green),
            ("red", &self.red),
            ("unchanged", &self.unchanged),
            ("prefixes.light", &self.prefixes.light),
            ("prefixes.heavy", &self.prefixes.heavy),
        ]
    }
}

/// Phrases keyed by instrument kind (`futures`, `special`, ...).
#[derive(Clone, Debug, Deserialize)]
#[serde(transparent)]
pub struct WordBank {
    kinds: HashMap<String, ProseKind>,
}

impl WordBank {
    pub fn load(path: &Path) -> Result<Self, ForecastError> {
        let content = fs::read_to_string(path).map_err(|source| ForecastError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content, &path.display().to_string())
    }

    /// Parse and validate. The word bank may be written as YAML or JSON.
    pub fn from_yaml_str(content: &str, origin: &str) -> Result<Self, ForecastError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let bank: WordBank =
            serde_yaml::from_str(content).map_err(|source| ForecastError::Yaml {
                path: origin.to_string(),
                source,
            })?;
        bank.validate()?;
        debug!("Loaded word bank with {} kinds from {}", bank.kinds.len(), origin);
        Ok(bank)
    }

    /// Every bucket must offer at least one phrase.
    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.kinds.is_empty() {
            return Err(ForecastError::Config("word bank is empty".to_string()));
        }
        for (name, kind) in &self.kinds {
            for (bucket, phrases) in kind.buckets() {
                if phrases.is_empty() {
                    return Err(ForecastError::Config(format!(
                        "word bank kind '{}' has no {} phrases",
                        name, bucket
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn kind(&self, kind: &str) -> Result<&ProseKind, ForecastError> {
        self.kinds
            .get(kind)
            .ok_or_else(|| ForecastError::MissingProseKind {
                kind: kind.to_string(),
            })
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

pub struct ProseGenerator {
    word_bank: WordBank,
    document_template: String,
}

impl ProseGenerator {
    pub fn new(word_bank: WordBank, document_template: impl Into<String>) -> Result<Self, ForecastError> {
        let document_template = document_template.into();
        if !document_template.contains(PROSE_LINES_TOKEN) || !document_template.contains(WEATHER_TOKEN) {
            return Err(ForecastError::Config(format!(
                "document template must contain {} and {}",
                PROSE_LINES_TOKEN, WEATHER_TOKEN
            )));
        }
        Ok(Self {
            word_bank,
            document_template,
        })
    }

    pub fn word_bank(&self) -> &WordBank {
        &self.word_bank
    }

    /// Pick a phrase describing a percentage move for the given kind.
    pub fn choose_change_word<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        pct_change: f64,
        kind: &str,
    ) -> Result<String, ForecastError> {
        let prose = self.word_bank.kind(kind)?;

        if pct_change == 0.0 {
            return pick(rng, &prose.unchanged, kind);
        }

        let color = if pct_change > 0.0 {
            pick(rng, &prose.green, kind)?
        } else {
            pick(rng, &prose.red, kind)?
        };

        let magnitude = pct_change.abs();
        if magnitude >= HEAVY_THRESHOLD {
            Ok(pick(rng, &prose.prefixes.heavy, kind)? + &color)
        } else if magnitude > LIGHT_THRESHOLD {
            Ok(color)
        } else {
            Ok(pick(rng, &prose.prefixes.light, kind)? + &color)
        }
    }

    /// Fill the document template with the prose lines and the weather line.
    pub fn compose_document(&self, lines: &[String], weather_fragment: &str) -> String {
        let prose_lines = lines.join("\n");
        let mut document = String::with_capacity(self.document_template.len() + prose_lines.len());
        let mut rest = self.document_template.as_str();

        loop {
            let next = [
                (rest.find(PROSE_LINES_TOKEN), PROSE_LINES_TOKEN, prose_lines.as_str()),
                (rest.find(WEATHER_TOKEN), WEATHER_TOKEN, weather_fragment),
            ]
            .into_iter()
            .filter_map(|(pos, token, value)| pos.map(|p| (p, token, value)))
            .min_by_key(|(pos, _, _)| *pos);

            match next {
                Some((pos, token, value)) => {
                    document.push_str(&rest[..pos]);
                    document.push_str(value);
                    rest = &rest[pos + token.len()..];
                }
                None => {
                    document.push_str(rest);
                    break;
                }
            }
        }
        document
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, phrases: &[String], kind: &str) -> Result<String, ForecastError> {
    phrases
        .choose(rng)
        .cloned()
        .ok_or_else(|| ForecastError::Config(format!("word bank kind '{}' has an empty bucket", kind)))
}
