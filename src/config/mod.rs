mod error;

pub use error::{ConfigError, ConfigResult};

use crate::connection::Credential;
use crate::console::VerbosityLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::Path, path::PathBuf};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-0613";
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that can call pre-defined functions. ";

/// Where the chat service lives and how to reach it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub chat_path: String,
    pub models_path: String,
    pub api_key_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            host: "api.openai.com".to_string(),
            port: 443,
            chat_path: "/v1/chat/completions".to_string(),
            models_path: "/v1/models".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            connect_timeout_secs: 30,
            request_timeout_secs: 300,
        }
    }
}

impl EndpointConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Token budget that triggers history compaction.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct BudgetConfig {
    pub threshold: usize,
    pub max_summary_tokens: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            threshold: 500,
            max_summary_tokens: 50,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub verbosity: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbosity: None,
            model: default_model(),
            system_prompt: default_system_prompt(),
            endpoint: EndpointConfig::default(),
            budget: BudgetConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the user config, writing the defaults out on first run.
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the configured verbosity level, falling back to Normal if not set
    pub fn get_verbosity(&self) -> VerbosityLevel {
        self.verbosity
            .as_deref()
            .and_then(VerbosityLevel::parse)
            .unwrap_or(VerbosityLevel::Normal)
    }

    pub fn update_setting(&mut self, key: &str, value: String) -> ConfigResult<()> {
        match key {
            "verbosity" => {
                if VerbosityLevel::parse(&value).is_none() {
                    return Err(invalid(key, value));
                }
                self.verbosity = Some(value);
            }
            "model" => self.model = value,
            "system_prompt" => self.system_prompt = value,
            "endpoint.scheme" => {
                if !matches!(value.as_str(), "http" | "https") {
                    return Err(invalid(key, value));
                }
                self.endpoint.scheme = value;
            }
            "endpoint.host" => self.endpoint.host = value,
            "endpoint.port" => self.endpoint.port = parse_number(key, value)?,
            "endpoint.chat_path" => self.endpoint.chat_path = value,
            "endpoint.models_path" => self.endpoint.models_path = value,
            "endpoint.api_key_env" => self.endpoint.api_key_env = value,
            "endpoint.api_key" => self.endpoint.api_key = Some(value),
            "endpoint.connect_timeout_secs" => {
                self.endpoint.connect_timeout_secs = parse_number(key, value)?
            }
            "endpoint.request_timeout_secs" => {
                self.endpoint.request_timeout_secs = parse_number(key, value)?
            }
            "budget.threshold" => self.budget.threshold = parse_number(key, value)?,
            "budget.max_summary_tokens" => {
                self.budget.max_summary_tokens = parse_number(key, value)?
            }
            _ => {
                return Err(ConfigError::UnknownConfigKey {
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Resolves the API key from the environment, then the config file.
    pub fn resolve_credential(&self) -> ConfigResult<Credential> {
        self.resolve_credential_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_credential_with<F>(&self, lookup: F) -> ConfigResult<Credential>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.endpoint.api_key_env)
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                self.endpoint
                    .api_key
                    .clone()
                    .filter(|key| !key.trim().is_empty())
            })
            .map(Credential::new)
            .ok_or_else(|| ConfigError::MissingCredential {
                var: self.endpoint.api_key_env.clone(),
            })
    }

    pub fn config_path() -> ConfigResult<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| ConfigError::NoHomeDirectory)?;
        let mut path = PathBuf::from(home);
        path.push(".config");
        path.push("parley");
        path.push("config.toml");
        Ok(path)
    }
}

fn invalid(field: &str, value: String) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value,
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: String) -> ConfigResult<T> {
    value.parse().map_err(|_| invalid(field, value))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
