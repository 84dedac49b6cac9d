//! Configuration loading for the Bazaar engine.
//!
//! The canonical configuration lives in `bazaar.yaml` next to the binary.
//! Every section is optional: a missing section, or a missing key within
//! one, takes the shipped default. Oracle credentials never live in the
//! file; the API key is read from `ORACLE_API_KEY` and the other oracle
//! settings may be overridden by `ORACLE_*` environment variables.
//!
//! ```yaml
//! pricing:
//!   composer:
//!     max_discount: 0.9
//! oracle:
//!   backend: anthropic
//!   model: claude-3-5-haiku-latest
//!   timeout_ms: 8000
//! logging:
//!   level: debug
//! fallback:
//!   seed: 42
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use bazaar_oracle::{
    BackendType, DEFAULT_API_URL, DEFAULT_BACKEND, DEFAULT_MAX_RETRIES, DEFAULT_MODEL,
    DEFAULT_REQUEST_TIMEOUT, LlmBackendConfig, MAX_RETRIES_CAP, OracleConfig,
};
use bazaar_pricing::PricingConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid config value for {field}: {message}")]
    Invalid {
        /// Dotted path of the offending key.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BazaarConfig {
    /// Price composition, haggling, and fallback balance.
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Remote negotiation oracle.
    #[serde(default)]
    pub oracle: OracleSection,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Local fallback negotiator.
    #[serde(default)]
    pub fallback: FallbackSection,
}

impl BazaarConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if it is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.oracle.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Oracle configuration using the API key in `ORACLE_API_KEY`.
    ///
    /// `Ok(None)` means the remote oracle is disabled or has no key, and
    /// the engine should run on the fallback alone.
    pub fn oracle_config(&self) -> Result<Option<OracleConfig>, ConfigError> {
        let api_key = std::env::var("ORACLE_API_KEY").ok();
        self.oracle.to_oracle_config(api_key)
    }
}

// ---------------------------------------------------------------------------
// Oracle
// ---------------------------------------------------------------------------

/// The `oracle` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OracleSection {
    /// Set to `false` to always negotiate with the local fallback.
    #[serde(default = "default_oracle_enabled")]
    pub enabled: bool,

    /// Backend dialect name (`openai`, `anthropic`, or an alias).
    #[serde(default = "default_oracle_backend")]
    pub backend: String,

    /// API base URL.
    #[serde(default = "default_oracle_api_url")]
    pub api_url: String,

    /// Model identifier.
    #[serde(default = "default_oracle_model")]
    pub model: String,

    /// Per-attempt deadline in milliseconds.
    #[serde(default = "default_oracle_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt for transient failures. Values
    /// above 10 are clamped.
    #[serde(default = "default_oracle_max_retries")]
    pub max_retries: u32,

    /// Sampling temperature.
    #[serde(default = "default_oracle_temperature")]
    pub temperature: f64,

    /// Response token limit.
    #[serde(default = "default_oracle_max_tokens")]
    pub max_tokens: u32,

    /// Directory of prompt templates overriding the built-in ones.
    #[serde(default)]
    pub templates_dir: Option<String>,
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            enabled: default_oracle_enabled(),
            backend: default_oracle_backend(),
            api_url: default_oracle_api_url(),
            model: default_oracle_model(),
            timeout_ms: default_oracle_timeout_ms(),
            max_retries: default_oracle_max_retries(),
            temperature: default_oracle_temperature(),
            max_tokens: default_oracle_max_tokens(),
            templates_dir: None,
        }
    }
}

impl OracleSection {
    /// Override oracle settings with environment variables when set.
    ///
    /// Reads `ORACLE_BACKEND`, `ORACLE_API_URL`, `ORACLE_MODEL`,
    /// `ORACLE_TIMEOUT_MS`, `ORACLE_MAX_RETRIES`, and
    /// `ORACLE_TEMPLATES_DIR`. Unparseable numbers are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ORACLE_BACKEND") {
            self.backend = val;
        }
        if let Ok(val) = std::env::var("ORACLE_API_URL") {
            self.api_url = val;
        }
        if let Ok(val) = std::env::var("ORACLE_MODEL") {
            self.model = val;
        }
        if let Some(val) = std::env::var("ORACLE_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()) {
            self.timeout_ms = val;
        }
        if let Some(val) = std::env::var("ORACLE_MAX_RETRIES").ok().and_then(|v| v.parse().ok()) {
            self.max_retries = val;
        }
        if let Ok(val) = std::env::var("ORACLE_TEMPLATES_DIR") {
            self.templates_dir = Some(val);
        }
    }

    /// Build an [`OracleConfig`] with the given API key.
    ///
    /// Returns `Ok(None)` when the oracle is disabled or the key is
    /// missing or blank.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unknown backend name or a
    /// zero timeout.
    pub fn to_oracle_config(
        &self,
        api_key: Option<String>,
    ) -> Result<Option<OracleConfig>, ConfigError> {
        let Some(api_key) = api_key.filter(|key| !key.trim().is_empty()) else {
            return Ok(None);
        };
        if !self.enabled {
            return Ok(None);
        }

        let backend_type = BackendType::parse(&self.backend).map_err(|e| ConfigError::Invalid {
            field: "oracle.backend",
            message: e.to_string(),
        })?;
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "oracle.timeout_ms",
                message: "must be greater than zero".to_owned(),
            });
        }

        let backend = LlmBackendConfig {
            backend_type,
            api_url: self.api_url.clone(),
            api_key,
            model: self.model.clone(),
        };
        Ok(Some(OracleConfig {
            request_timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.max_retries.min(MAX_RETRIES_CAP),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            templates_dir: self.templates_dir.clone(),
            ..OracleConfig::new(backend)
        }))
    }
}

// ---------------------------------------------------------------------------
// Logging and fallback
// ---------------------------------------------------------------------------

/// The `logging` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// The `fallback` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FallbackSection {
    /// Fixed RNG seed for reproducible play-tests. Unset means seeded from
    /// the operating system.
    #[serde(default)]
    pub seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_oracle_enabled() -> bool {
    true
}

fn default_oracle_backend() -> String {
    DEFAULT_BACKEND.to_owned()
}

fn default_oracle_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_oracle_model() -> String {
    DEFAULT_MODEL.to_owned()
}

fn default_oracle_timeout_ms() -> u64 {
    u64::try_from(DEFAULT_REQUEST_TIMEOUT.as_millis()).unwrap_or(10_000)
}

const fn default_oracle_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

const fn default_oracle_temperature() -> f64 {
    0.7
}

const fn default_oracle_max_tokens() -> u32 {
    300
}

fn default_log_level() -> String {
    "info".to_owned()
}
