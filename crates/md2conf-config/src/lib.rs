//! Configuration management for md2conf.
//!
//! Parses `md2conf.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `confluence.domain`
//! - `confluence.base_path`
//! - `confluence.username`
//! - `confluence.api_key`
//! - `confluence.space_key`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "md2conf.toml";

/// Footer text appended to every page unless disabled.
pub const DEFAULT_GENERATED_BY: &str = "This page has been generated with a tool.";

/// Default REST base path for Atlassian-hosted Confluence.
pub const DEFAULT_BASE_PATH: &str = "/wiki/";

/// Accepted values for `log.level` / `--loglevel`.
pub const LOG_LEVELS: &[&str] = &["debug", "info", "warning", "error", "critical"];

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override Confluence domain.
    pub domain: Option<String>,
    /// Override wiki base path.
    pub base_path: Option<String>,
    /// Override user name.
    pub username: Option<String>,
    /// Override API key.
    pub api_key: Option<String>,
    /// Override target space key.
    pub space_key: Option<String>,
    /// Override invalid URL policy.
    pub ignore_invalid_url: Option<bool>,
    /// Override footer text (or disable it).
    pub generated_by: Option<GeneratedBy>,
    /// Override partial success policy.
    pub tolerate_partial: Option<bool>,
    /// Override root page title.
    pub root_page: Option<String>,
    /// Override log level.
    pub log_level: Option<String>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Confluence connection settings.
    pub confluence: ConfluenceConfig,
    /// Publishing behavior.
    pub publish: PublishConfig,
    /// Logging verbosity.
    pub log: LogConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Confluence connection configuration as written in the file.
///
/// Every field may also come from the command line, so nothing is required
/// at parse time. Use [`Config::require_confluence`] to get validated values.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConfluenceConfig {
    /// Organization domain, e.g. `example.atlassian.net`.
    pub domain: Option<String>,
    /// Base path of the wiki on the domain.
    pub base_path: String,
    /// User name (e-mail address on Atlassian cloud).
    pub username: Option<String>,
    /// API token.
    pub api_key: Option<String>,
    /// Target space key; the user's personal space when omitted.
    pub space_key: Option<String>,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            domain: None,
            base_path: DEFAULT_BASE_PATH.to_owned(),
            username: None,
            api_key: None,
            space_key: None,
        }
    }
}

/// Validated Confluence connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfluenceSettings {
    pub domain: String,
    pub base_path: String,
    pub username: String,
    pub api_key: String,
    pub space_key: Option<String>,
}

/// Publishing configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Warn about and render as plain text links that point nowhere,
    /// instead of failing the document.
    pub ignore_invalid_url: bool,
    /// Footer line appended to every page.
    pub generated_by: GeneratedBy,
    /// Exit successfully even if some documents failed.
    pub tolerate_partial: bool,
    /// Title of an existing page to publish top-level pages under.
    pub root_page: Option<String>,
}

/// "Generated by" footer setting.
///
/// Accepts a string or a boolean in TOML: `true` keeps the default text,
/// `false` or an empty string disables the footer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawGeneratedBy")]
pub struct GeneratedBy(Option<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawGeneratedBy {
    Text(String),
    Toggle(bool),
}

impl From<RawGeneratedBy> for GeneratedBy {
    fn from(raw: RawGeneratedBy) -> Self {
        match raw {
            RawGeneratedBy::Text(text) => Self::text(text),
            RawGeneratedBy::Toggle(true) => Self::default(),
            RawGeneratedBy::Toggle(false) => Self::disabled(),
        }
    }
}

impl Default for GeneratedBy {
    fn default() -> Self {
        Self(Some(DEFAULT_GENERATED_BY.to_owned()))
    }
}

impl GeneratedBy {
    /// Footer with custom text. Empty text disables the footer.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            Self(None)
        } else {
            Self(Some(text))
        }
    }

    /// No footer.
    #[must_use]
    pub fn disabled() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    #[must_use]
    pub fn into_inner(self) -> Option<String> {
        self.0
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// One of [`LOG_LEVELS`].
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

impl LogConfig {
    /// Translate the configured level into a `tracing` filter directive.
    #[must_use]
    pub fn filter_directive(&self) -> &'static str {
        match self.level.to_ascii_lowercase().as_str() {
            "debug" => "debug",
            "warning" | "warn" => "warn",
            "error" | "critical" => "error",
            _ => "info",
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`confluence.api_key`").
        field: String,
        /// Error message (e.g., "${`CONFLUENCE_API_KEY`} not set").
        message: String,
    },
}

/// Require a string field to be present and non-empty.
fn require_non_empty<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ConfigError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Validation(format!("{field} cannot be empty"))),
    }
}

/// Require a bare host name: no scheme, no path, no whitespace.
fn require_bare_domain(domain: &str, field: &str) -> Result<(), ConfigError> {
    if domain.contains("://") {
        return Err(ConfigError::Validation(format!(
            "{field} must be a host name without http:// or https://"
        )));
    }
    if domain.contains('/') || domain.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "{field} must be a host name without path or whitespace"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `md2conf.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails, or
    /// the merged configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        let confluence = &mut self.confluence;
        if let Some(domain) = &settings.domain {
            confluence.domain = Some(domain.clone());
        }
        if let Some(base_path) = &settings.base_path {
            confluence.base_path.clone_from(base_path);
        }
        if let Some(username) = &settings.username {
            confluence.username = Some(username.clone());
        }
        if let Some(api_key) = &settings.api_key {
            confluence.api_key = Some(api_key.clone());
        }
        if let Some(space_key) = &settings.space_key {
            confluence.space_key = Some(space_key.clone());
        }

        let publish = &mut self.publish;
        if let Some(ignore) = settings.ignore_invalid_url {
            publish.ignore_invalid_url = ignore;
        }
        if let Some(generated_by) = &settings.generated_by {
            publish.generated_by = generated_by.clone();
        }
        if let Some(tolerate) = settings.tolerate_partial {
            publish.tolerate_partial = tolerate;
        }
        if let Some(root_page) = &settings.root_page {
            publish.root_page = Some(root_page.clone());
        }

        if let Some(level) = &settings.log_level {
            self.log.level.clone_from(level);
        }
    }

    /// Get validated Confluence connection settings.
    ///
    /// Use this before connecting; it checks that the domain and base path can
    /// form an endpoint and that credentials are present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if a field is missing or malformed.
    pub fn require_confluence(&self) -> Result<ConfluenceSettings, ConfigError> {
        let conf = &self.confluence;
        let domain = require_non_empty(conf.domain.as_deref(), "confluence.domain")?;
        require_bare_domain(domain, "confluence.domain")?;
        let username = require_non_empty(conf.username.as_deref(), "confluence.username")?;
        let api_key = require_non_empty(conf.api_key.as_deref(), "confluence.api_key")?;
        let space_key = conf
            .space_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_owned);

        Ok(ConfluenceSettings {
            domain: domain.to_owned(),
            base_path: conf.base_path.clone(),
            username: username.to_owned(),
            api_key: api_key.to_owned(),
            space_key,
        })
    }

    /// Validate configuration values.
    ///
    /// Credentials are not checked here; a config file without them is valid
    /// as long as the command line supplies them later.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.confluence.base_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "confluence.base_path must start with /".to_owned(),
            ));
        }

        let level = self.log.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) && level != "warn" {
            return Err(ConfigError::Validation(format!(
                "log.level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        if let Some(root_page) = &self.publish.root_page
            && root_page.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "publish.root_page cannot be empty".to_owned(),
            ));
        }

        Ok(())
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let conf = &mut self.confluence;
        expand::expand_opt(&mut conf.domain, "confluence.domain")?;
        conf.base_path = expand::expand_env(&conf.base_path, "confluence.base_path")?;
        expand::expand_opt(&mut conf.username, "confluence.username")?;
        expand::expand_opt(&mut conf.api_key, "confluence.api_key")?;
        expand::expand_opt(&mut conf.space_key, "confluence.space_key")?;
        Ok(())
    }
}
