//! Configuration management for Washday

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Which backend implementation to talk to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// Hosted REST database and auth endpoints
    #[default]
    Rest,
    /// In-process backend seeded from a JSON fixture
    Memory,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub provider: BackendProvider,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Seed file for the memory provider
    pub fixture: Option<String>,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("provider", &self.provider)
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .field("fixture", &self.fixture)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_delivery_fee")]
    pub delivery_fee: Decimal,
    #[serde(default = "default_custom_item_price")]
    pub custom_item_price: Decimal,
    /// Unit price used when a catalog item carries no price
    #[serde(default = "default_fallback_unit_price")]
    pub fallback_unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_path")]
    pub path: String,
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_currency() -> String {
    "EUR".to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_delivery_fee() -> Decimal {
    Decimal::from(5)
}

fn default_custom_item_price() -> Decimal {
    Decimal::from(35)
}

fn default_fallback_unit_price() -> Decimal {
    Decimal::from(10)
}

fn default_session_path() -> String {
    "~/.local/share/washday/session.json".to_string()
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            locale: default_locale(),
            delivery_fee: default_delivery_fee(),
            custom_item_price: default_custom_item_price(),
            fallback_unit_price: default_fallback_unit_price(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            backend: BackendConfig {
                provider: BackendProvider::Rest,
                url: "https://example.supabase.co".to_string(),
                anon_key: String::new(),
                timeout_secs: default_timeout_secs(),
                fixture: None,
            },
            pricing: PricingConfig::default(),
            session: SessionConfig::default(),
        }
    }

    /// Check that the selected provider has what it needs
    pub fn validate(&self) -> Result<()> {
        match self.backend.provider {
            BackendProvider::Rest => {
                if self.backend.url.trim().is_empty() {
                    return Err(ConfigError::MissingField("backend.url".to_string()).into());
                }
                if self.backend.anon_key.trim().is_empty() {
                    return Err(ConfigError::MissingField("backend.anon_key".to_string()).into());
                }
            }
            BackendProvider::Memory => {}
        }

        if rusty_money::iso::find(&self.pricing.currency).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "pricing.currency".to_string(),
                reason: format!("unknown ISO currency '{}'", self.pricing.currency),
            }
            .into());
        }

        if self.pricing.delivery_fee.is_sign_negative() {
            return Err(ConfigError::InvalidValue {
                field: "pricing.delivery_fee".to_string(),
                reason: "must not be negative".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Session file path with `~` expanded
    pub fn session_path(&self) -> PathBuf {
        expand_path(&self.session.path)
    }

    /// Fixture path with `~` expanded, if one is configured
    pub fn fixture_path(&self) -> Option<PathBuf> {
        self.backend.fixture.as_deref().map(expand_path)
    }
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Resolve the configuration file path (XDG config directory unless overridden)
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("WASHDAY_CONFIG") {
        return Ok(expand_path(&path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("washday").join("config.toml"))
}
