//! Configuration management for Crosspost

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::provider::Provider;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub facebook: Option<FacebookConfig>,
    pub linkedin: Option<LinkedInConfig>,
    pub wordpress: Option<WordPressConfig>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacebookConfig {
    pub enabled: bool,
    pub token_file: String,
    /// Page to publish to when none is given on the command line
    pub page_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInConfig {
    pub enabled: bool,
    pub token_file: String,
    /// Member id (`sub`), saves the identity lookup when known
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordPressConfig {
    pub enabled: bool,
    pub token_file: String,
    pub site_id: Option<u64>,
    pub parent_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("crosspost/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub platforms: Vec<String>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// A configuration with no providers
    pub fn empty() -> Self {
        Self {
            facebook: None,
            linkedin: None,
            wordpress: None,
            http: HttpConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            facebook: Some(FacebookConfig {
                enabled: false,
                token_file: "~/.config/crosspost/facebook.token".to_string(),
                page_id: None,
            }),
            linkedin: Some(LinkedInConfig {
                enabled: true,
                token_file: "~/.config/crosspost/linkedin.token".to_string(),
                user_id: None,
            }),
            wordpress: Some(WordPressConfig {
                enabled: false,
                token_file: "~/.config/crosspost/wordpress.token".to_string(),
                site_id: None,
                parent_id: None,
            }),
            http: HttpConfig::default(),
            defaults: DefaultsConfig {
                platforms: vec!["linkedin".to_string()],
            },
        }
    }

    /// Whether the provider has a section with `enabled = true`
    pub fn is_enabled(&self, provider: Provider) -> bool {
        match provider {
            Provider::Facebook => self.facebook.as_ref().is_some_and(|c| c.enabled),
            Provider::LinkedIn => self.linkedin.as_ref().is_some_and(|c| c.enabled),
            Provider::WordPress => self.wordpress.as_ref().is_some_and(|c| c.enabled),
        }
    }

    /// Providers to publish to when the caller does not choose
    ///
    /// `[defaults] platforms` wins; otherwise every enabled provider.
    pub fn default_providers(&self) -> std::result::Result<Vec<Provider>, String> {
        if self.defaults.platforms.is_empty() {
            return Ok(Provider::ALL
                .into_iter()
                .filter(|p| self.is_enabled(*p))
                .collect());
        }

        self.defaults
            .platforms
            .iter()
            .map(|name| name.parse::<Provider>())
            .collect()
    }
}

/// Resolve the configuration file path following XDG Base Directory conventions
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CROSSPOST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("crosspost").join("config.toml"))
}
