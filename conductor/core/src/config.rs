//! TOML Configuration File Support
//!
//! Centralized configuration loading, from a TOML file at
//! `~/.config/stock-elf/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! The configuration file follows XDG Base Directory specification:
//! - `$XDG_CONFIG_HOME/stock-elf/config.toml` (typically `~/.config/stock-elf/config.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:5000"
//! timeout_secs = 120
//!
//! [session]
//! ticker = "AAPL"
//!
//! [speech]
//! enabled = true
//! command = ["whisper-listen", "--once"]
//! lang = "en-US"
//!
//! [logging]
//! file = "/tmp/stock-elf.log"
//! filter = "stock_elf_core=debug"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::{DEFAULT_GREETING, DEFAULT_TICKER};
use crate::speech::{CommandRecognizer, RecognitionOptions, SpeechRecognizer};

/// Default analysis API base URL
pub const DEFAULT_API_BASE: &str = "http://localhost:5000";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// An explicitly requested config file does not exist
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[api]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToml {
    /// Analysis API base URL
    pub base_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// `[session]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// Ticker pre-filled at startup
    pub ticker: Option<String>,

    /// First bot message
    pub greeting: Option<String>,
}

/// `[speech]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechToml {
    /// Whether voice input is offered at all
    pub enabled: Option<bool>,

    /// External speech-to-text command and its arguments
    pub command: Option<Vec<String>>,

    /// Recognition language tag
    pub lang: Option<String>,
}

/// `[logging]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingToml {
    /// Log file path (stderr when unset)
    pub file: Option<String>,

    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub filter: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StockElfToml {
    /// API section
    pub api: ApiToml,

    /// Session section
    pub session: SessionToml,

    /// Speech section
    pub speech: SpeechToml,

    /// Logging section
    pub logging: LoggingToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Analysis API connection settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL without a trailing slash
    pub base_url: String,

    /// Client-level request timeout
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Voice input settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeechConfig {
    /// Whether voice input is offered
    pub enabled: bool,

    /// External speech-to-text argv; empty means no capability
    pub command: Vec<String>,

    /// Recognition language tag
    pub lang: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: Vec::new(),
            lang: RecognitionOptions::default().lang,
        }
    }
}

impl SpeechConfig {
    /// Single-utterance recognition options
    #[must_use]
    pub fn recognition_options(&self) -> RecognitionOptions {
        RecognitionOptions::single_utterance(self.lang.clone())
    }

    /// The host capability, if one is configured
    #[must_use]
    pub fn recognizer(&self) -> Option<Box<dyn SpeechRecognizer>> {
        if !self.enabled {
            return None;
        }
        CommandRecognizer::from_argv(&self.command)
            .map(|recognizer| Box::new(recognizer) as Box<dyn SpeechRecognizer>)
    }
}

/// Centralized configuration
///
/// Use [`load_config`] to load with proper priority handling, then
/// [`ConfigOverrides::apply`] for command-line values.
#[derive(Clone, Debug)]
pub struct StockElfConfig {
    /// API connection settings
    pub api: ApiConfig,

    /// Ticker pre-filled at startup
    pub ticker: String,

    /// First bot message
    pub greeting: String,

    /// Voice input settings
    pub speech: SpeechConfig,

    /// Log file (stderr when unset)
    pub log_file: Option<PathBuf>,

    /// Fallback `tracing` filter
    pub log_filter: Option<String>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for StockElfConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            ticker: DEFAULT_TICKER.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            speech: SpeechConfig::default(),
            log_file: None,
            log_filter: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl StockElfConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check values and normalize the base URL
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a non-HTTP base URL, a
    /// zero timeout, or an empty speech language.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        let base = self.api.base_url.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "api base URL must start with http:// or https://, got {:?}",
                self.api.base_url
            )));
        }
        self.api.base_url = base.to_string();

        if self.api.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "api timeout must be greater than zero".to_string(),
            ));
        }

        if self.speech.lang.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "speech language must not be empty".to_string(),
            ));
        }

        self.ticker = self.ticker.trim().to_uppercase();
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/stock-elf/config.toml` or
/// `~/.config/stock-elf/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("stock-elf").join("config.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or a
/// value fails validation. A missing config file is not an error.
pub fn load_config() -> Result<StockElfConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path, then the process environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<StockElfConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration from a file the user asked for by name
///
/// Unlike the default path, a missing file here is an error.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if the file does not exist, otherwise
/// the same errors as [`load_config_from_path`].
pub fn load_required_config(path: PathBuf) -> Result<StockElfConfig, ConfigError> {
    load_required_config_with_env(path, |key| std::env::var(key).ok())
}

/// [`load_required_config`] with a custom environment lookup
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if the file does not exist.
pub fn load_required_config_with_env<F>(path: PathBuf, env: F) -> Result<StockElfConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !path.is_file() {
        return Err(ConfigError::NotFound(path));
    }
    load_config_with_env(Some(path), env)
}

/// Load configuration with a custom environment lookup
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<StockElfConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = StockElfConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: StockElfToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut StockElfConfig, toml: &StockElfToml) {
    if let Some(ref base) = toml.api.base_url {
        config.api.base_url = base.clone();
    }
    if let Some(secs) = toml.api.timeout_secs {
        config.api.timeout = Duration::from_secs(secs);
    }

    if let Some(ref ticker) = toml.session.ticker {
        config.ticker = ticker.clone();
    }
    if let Some(ref greeting) = toml.session.greeting {
        config.greeting = greeting.clone();
    }

    if let Some(enabled) = toml.speech.enabled {
        config.speech.enabled = enabled;
    }
    if let Some(ref command) = toml.speech.command {
        config.speech.command = command.clone();
    }
    if let Some(ref lang) = toml.speech.lang {
        config.speech.lang = lang.clone();
    }

    if let Some(ref file) = toml.logging.file {
        config.log_file = Some(PathBuf::from(file));
    }
    if toml.logging.filter.is_some() {
        config.log_filter = toml.logging.filter.clone();
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut StockElfConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(base) = env("STOCK_ELF_API_BASE") {
        config.api.base_url = base;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = env("STOCK_ELF_TIMEOUT_SECS") {
        if let Ok(secs) = timeout.parse::<u64>() {
            config.api.timeout = Duration::from_secs(secs);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(ticker) = env("STOCK_ELF_TICKER") {
        config.ticker = ticker;
        config.source = ConfigSource::Env;
    }
    if let Some(command) = env("STOCK_ELF_SPEECH_COMMAND") {
        config.speech.command = command.split_whitespace().map(str::to_string).collect();
        config.source = ConfigSource::Env;
    }
    if let Some(lang) = env("STOCK_ELF_SPEECH_LANG") {
        config.speech.lang = lang;
        config.source = ConfigSource::Env;
    }
    if let Some(file) = env("STOCK_ELF_LOG") {
        config.log_file = Some(PathBuf::from(file));
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// API base URL override
    pub api_base: Option<String>,

    /// Ticker override
    pub ticker: Option<String>,

    /// Speech command override (argv)
    pub speech_command: Option<Vec<String>>,

    /// Disable voice input
    pub no_speech: bool,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set API base override
    #[must_use]
    pub fn with_api_base(mut self, base: String) -> Self {
        self.api_base = Some(base);
        self
    }

    /// Set ticker override
    #[must_use]
    pub fn with_ticker(mut self, ticker: String) -> Self {
        self.ticker = Some(ticker);
        self
    }

    /// Set speech command override from a whitespace-separated command line
    #[must_use]
    pub fn with_speech_command(mut self, command: &str) -> Self {
        self.speech_command = Some(command.split_whitespace().map(str::to_string).collect());
        self
    }

    /// Disable voice input
    #[must_use]
    pub fn without_speech(mut self) -> Self {
        self.no_speech = true;
        self
    }

    /// Apply overrides to a configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an overridden value is invalid.
    pub fn apply(&self, config: &mut StockElfConfig) -> Result<(), ConfigError> {
        if self.api_base.is_some()
            || self.ticker.is_some()
            || self.speech_command.is_some()
            || self.no_speech
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref base) = self.api_base {
            config.api.base_url = base.clone();
        }
        if let Some(ref ticker) = self.ticker {
            config.ticker = ticker.clone();
        }
        if let Some(ref command) = self.speech_command {
            config.speech.command = command.clone();
        }
        if self.no_speech {
            config.speech.enabled = false;
        }

        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = StockElfConfig::default();

        assert_eq!(config.api.base_url, "http://localhost:5000");
        assert_eq!(config.api.timeout, Duration::from_secs(120));
        assert_eq!(config.ticker, "AAPL");
        assert!(config.speech.enabled);
        assert!(config.speech.command.is_empty());
        assert_eq!(config.speech.lang, "en-US");
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("stock-elf/config.toml"));
        }
    }

    #[test]
    fn test_parse_valid_toml() {
        let file = write_config(
            r#"
[api]
base_url = "https://elf.example.com/"
timeout_secs = 30

[session]
ticker = "msft"

[speech]
command = ["whisper-listen", "--once"]
lang = "en-GB"

[logging]
file = "/tmp/stock-elf.log"
"#,
        );

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.api.base_url, "https://elf.example.com");
        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert_eq!(config.ticker, "MSFT");
        assert_eq!(config.speech.command, vec!["whisper-listen", "--once"]);
        assert_eq!(config.speech.lang, "en-GB");
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/stock-elf.log")));
        assert_eq!(config.source(), ConfigSource::File);
        assert!(config.speech.recognizer().is_some());
    }

    #[test]
    fn test_parse_empty_toml() {
        let file = write_config("");
        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.api.base_url, DEFAULT_API_BASE);
        assert!(config.speech.recognizer().is_none());
    }

    #[test]
    fn test_missing_file_graceful() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let config = load_config_with_env(Some(path), no_env).unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_required_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let result = load_required_config_with_env(path.clone(), no_env);
        assert!(matches!(result, Err(ConfigError::NotFound(p)) if p == path));
    }

    #[test]
    fn test_required_file_loads() {
        let file = write_config("[session]\nticker = \"MSFT\"\n");
        let config = load_required_config_with_env(file.path().to_path_buf(), no_env).unwrap();
        assert_eq!(config.ticker, "MSFT");
        assert_eq!(config.source(), ConfigSource::File);
    }

    #[test]
    fn test_malformed_toml_error() {
        let file = write_config("[api\nbase_url = ");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_config("[api]\nbase_url = \"http://file:5000\"\n");
        let env: HashMap<&str, &str> = [
            ("STOCK_ELF_API_BASE", "http://env:5000"),
            ("STOCK_ELF_TIMEOUT_SECS", "15"),
            ("STOCK_ELF_SPEECH_COMMAND", "listen --lang en"),
        ]
        .into_iter()
        .collect();

        let config = load_config_with_env(Some(file.path().to_path_buf()), |key| {
            env.get(key).map(|v| (*v).to_string())
        })
        .unwrap();

        assert_eq!(config.api.base_url, "http://env:5000");
        assert_eq!(config.api.timeout, Duration::from_secs(15));
        assert_eq!(config.speech.command, vec!["listen", "--lang", "en"]);
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_invalid_env_timeout_is_ignored() {
        let config = load_config_with_env(None, |key| {
            (key == "STOCK_ELF_TIMEOUT_SECS").then(|| "soon".to_string())
        })
        .unwrap();
        assert_eq!(config.api.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let file = write_config("[api]\nbase_url = \"localhost:5000\"\n");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let file = write_config("[api]\ntimeout_secs = 0\n");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = load_config_with_env(None, |key| {
            (key == "STOCK_ELF_TICKER").then(|| "nvda".to_string())
        })
        .unwrap();
        assert_eq!(config.ticker, "NVDA");

        ConfigOverrides::new()
            .with_ticker("tsla".to_string())
            .with_speech_command("listen --once")
            .without_speech()
            .apply(&mut config)
            .unwrap();

        assert_eq!(config.ticker, "TSLA");
        assert_eq!(config.speech.command, vec!["listen", "--once"]);
        assert!(config.speech.recognizer().is_none());
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_config_overrides_empty_no_change() {
        let mut config = StockElfConfig::default();
        ConfigOverrides::new().apply(&mut config).unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI");
        assert_eq!(ConfigSource::Env.to_string(), "environment");
        assert_eq!(ConfigSource::File.to_string(), "config file");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }
}
