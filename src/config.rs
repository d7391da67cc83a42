use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::{ForecastError, ResolveError};
use crate::instrument::{Currency, LineSpec};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Clone, Debug, Deserialize)]
pub struct FetchSettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    constants::fetch::MAX_RETRIES
}
fn default_backoff_secs() -> u64 {
    constants::fetch::BACKOFF.as_secs()
}
fn default_user_agent() -> String {
    constants::fetch::USER_AGENT.to_string()
}
fn default_timeout_secs() -> u64 {
    constants::fetch::TIMEOUT.as_secs()
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_secs: default_backoff_secs(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WeatherSettings {
    #[serde(default = "default_weather_url")]
    pub url: String,
    /// Awkward phrasings keyed by lowercase, underscore-joined forecast text
    #[serde(default = "default_transformers")]
    pub transformers: BTreeMap<String, String>,
}

fn default_weather_url() -> String {
    constants::endpoints::WETTER_COM.to_string()
}

fn default_transformers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("nebel".to_string(), "nebelig".to_string()),
        (
            "leichter_regen_und_windig".to_string(),
            "leicht regnerisch und windig".to_string(),
        ),
    ])
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            url: default_weather_url(),
            transformers: default_transformers(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ForumSettings {
    #[serde(default = "default_subreddit")]
    pub subreddit: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_signature")]
    pub signature: String,
    #[serde(default = "default_hot_limit")]
    pub hot_limit: u32,
}

fn default_subreddit() -> String {
    constants::forum::SUBREDDIT.to_string()
}
fn default_signature() -> String {
    constants::forum::SIGNATURE.to_string()
}
fn default_hot_limit() -> u32 {
    constants::forum::HOT_LIMIT
}

impl Default for ForumSettings {
    fn default() -> Self {
        Self {
            subreddit: default_subreddit(),
            user_agent: default_user_agent(),
            signature: default_signature(),
            hot_limit: default_hot_limit(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub prose_file: PathBuf,
    pub instruments_file: PathBuf,

    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub weather: WeatherSettings,
    #[serde(default)]
    pub forum: ForumSettings,

    /// Print instead of posting
    #[serde(default)]
    pub dry_run: bool,
}

impl AppConfig {
    /// Load from `$WETTERBERICHT_CONFIG` or `config.yaml`. Relative data file
    /// paths are resolved against the config file's directory.
    pub fn load() -> Result<Self, ForecastError> {
        let path = env::var("WETTERBERICHT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_path(Path::new(&path))?;

        if let Ok(flag) = env::var("WETTERBERICHT_DRY_RUN") {
            config.dry_run = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ForecastError> {
        let content = read_file(path)?;
        let mut config: AppConfig = parse_yaml(&content, path)?;

        if let Some(base) = path.parent() {
            config.prose_file = base.join(&config.prose_file);
            config.instruments_file = base.join(&config.instruments_file);
        }
        Ok(config)
    }
}

/// A provider name plus the instruments it serves.
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderGroup {
    pub provider: String,
    #[serde(default)]
    pub defaults: Mapping,
    #[serde(default)]
    pub instruments: Vec<Mapping>,
}

/// The instrument definitions document.
#[derive(Clone, Debug, Deserialize)]
pub struct InstrumentCatalog {
    /// Outer document template, `{prose_lines}` and `{weather}` are filled in
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub defaults: Mapping,
    pub lines: HashMap<String, LineSpec>,
    #[serde(default)]
    pub providers: Vec<ProviderGroup>,
}

impl InstrumentCatalog {
    pub fn load(path: &Path) -> Result<Self, ForecastError> {
        let content = read_file(path)?;
        Self::from_yaml_str(&content, path)
    }

    pub fn from_yaml_str(content: &str, origin: &Path) -> Result<Self, ForecastError> {
        let catalog: InstrumentCatalog = parse_yaml(content, origin)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), ForecastError> {
        for required in [constants::prose::ERROR_LINE, constants::prose::WEATHER_LINE] {
            if !self.lines.contains_key(required) {
                return Err(ForecastError::Config(format!(
                    "instruments file has no '{}' line template",
                    required
                )));
            }
        }
        Ok(())
    }

    pub fn document_template(&self) -> &str {
        self.document
            .as_deref()
            .unwrap_or(constants::prose::DOCUMENT_TEMPLATE)
    }

    pub fn line(&self, key: &str) -> Option<&LineSpec> {
        self.lines.get(key)
    }

    /// Global defaults, then group defaults, then the instrument's own fields.
    pub fn merged(&self, group: &ProviderGroup, raw: &Mapping) -> Mapping {
        let mut merged = self.defaults.clone();
        overlay(&mut merged, &group.defaults);
        overlay(&mut merged, raw);
        merged
    }

    pub fn descriptor(&self, group: &ProviderGroup, raw: &Mapping) -> Result<InstrumentDescriptor, ResolveError> {
        serde_yaml::from_value(Value::Mapping(self.merged(group, raw)))
            .map_err(|e| ResolveError::Descriptor(e.to_string()))
    }
}

fn overlay(base: &mut Mapping, top: &Mapping) {
    for (key, value) in top {
        base.insert(key.clone(), value.clone());
    }
}

/// Merged configuration of one instrument.
#[derive(Clone, Debug, Deserialize)]
pub struct InstrumentDescriptor {
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub plural: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub symbol: Option<String>,
    /// LETF: which moving average to compare against, e.g. "sma200"
    #[serde(default)]
    pub sma_type: Option<String>,
    /// CoinGecko coin id
    #[serde(default)]
    pub coin: Option<String>,
    #[serde(default)]
    pub currency: Option<Currency>,
    /// Line template key, defaults to the type
    #[serde(default)]
    pub line: Option<String>,
}

impl InstrumentDescriptor {
    pub fn line_key(&self) -> &str {
        self.line.as_deref().unwrap_or(&self.kind)
    }

    pub fn require_symbol(&self) -> Result<&str, ResolveError> {
        self.symbol
            .as_deref()
            .ok_or_else(|| ResolveError::Descriptor(format!("'{}' has no symbol", self.description)))
    }

    pub fn require_url(&self) -> Result<&str, ResolveError> {
        if self.url.is_empty() {
            return Err(ResolveError::Descriptor(format!("'{}' has no url", self.description)));
        }
        Ok(&self.url)
    }
}

fn read_file(path: &Path) -> Result<String, ForecastError> {
    fs::read_to_string(path).map_err(|source| ForecastError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn parse_yaml<T: serde::de::DeserializeOwned>(content: &str, path: &Path) -> Result<T, ForecastError> {
    // Strip BOM if present
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    serde_yaml::from_str(content).map_err(|source| ForecastError::Yaml {
        path: path.display().to_string(),
        source,
    })
}
