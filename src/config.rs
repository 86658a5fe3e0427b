use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::llm::{SearchMode, DEFAULT_BASE_URL};

pub const API_KEY_ENV: &str = "GROK_API_KEY";
pub const MODEL_ENV: &str = "GROK_MODEL";
pub const BASE_URL_ENV: &str = "GROK_BASE_URL";
pub const TIMEOUT_ENV: &str = "GROK_TIMEOUT_SECS";
pub const MAX_ROUND_TRIPS_ENV: &str = "GROK_MAX_ROUND_TRIPS";
pub const SEARCH_MODE_ENV: &str = "GROK_SEARCH_MODE";
pub const CONFIG_PATH_ENV: &str = "GROK_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "grok-4".into()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default = "default_return_citations")]
    pub return_citations: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            return_citations: default_return_citations(),
        }
    }
}

fn default_return_citations() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Upper bound on model round-trips per utterance; `None` means unbounded.
    #[serde(default = "default_max_round_trips")]
    pub max_round_trips: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            max_round_trips: default_max_round_trips(),
        }
    }
}

fn default_system_prompt() -> String {
    "You are a helpful AI agent.".into()
}

fn default_max_round_trips() -> Option<usize> {
    Some(25)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let mut cfg: Self = toml::from_str(&raw)
            .map_err(|err| AgentError::Config(format!("failed to parse configuration: {err}")))?;
        // a zero limit means unbounded, as it does in the environment
        cfg.agent.max_round_trips = cfg.agent.max_round_trips.filter(|&limit| limit > 0);
        Ok(cfg)
    }

    /// Defaults, then the file named by `GROK_CONFIG` if set, then the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = match lookup(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.apply_overrides(&lookup)?;
        Ok(cfg)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.model.api_key = Some(key);
        }
        if let Some(model) = lookup(MODEL_ENV).filter(|v| !v.is_empty()) {
            self.model.model = model;
        }
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.is_empty()) {
            self.model.base_url = url;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            self.model.timeout_secs = parse_number(TIMEOUT_ENV, &raw)?;
        }
        if let Some(raw) = lookup(MAX_ROUND_TRIPS_ENV) {
            let limit: usize = parse_number(MAX_ROUND_TRIPS_ENV, &raw)?;
            self.agent.max_round_trips = (limit > 0).then_some(limit);
        }
        if let Some(raw) = lookup(SEARCH_MODE_ENV) {
            self.search.mode = match raw.to_ascii_lowercase().as_str() {
                "auto" => SearchMode::Auto,
                "on" => SearchMode::On,
                "off" => SearchMode::Off,
                other => {
                    return Err(AgentError::Config(format!(
                        "{SEARCH_MODE_ENV} must be auto, on or off, got `{other}`"
                    )))
                }
            };
        }
        Ok(())
    }

    /// The API key is the only setting without a usable default.
    pub fn validate(&self) -> Result<()> {
        if self.model.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(AgentError::Config(format!(
                "Please set the {API_KEY_ENV} environment variable."
            )));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AgentError::Config(format!("{key} must be a non-negative integer, got `{raw}`")))
}
