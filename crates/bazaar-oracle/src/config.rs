//! Configuration for the remote negotiation oracle.
//!
//! The remote oracle is configured explicitly: build an [`OracleConfig`]
//! directly, or load one from the environment with
//! [`OracleConfig::from_env`]. Nothing is read from global state after
//! construction.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::OracleError;

/// Default per-attempt deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Upper bound on retries; larger configured values are clamped to it.
pub const MAX_RETRIES_CAP: u32 = 10;

/// Backend used when none is configured.
pub const DEFAULT_BACKEND: &str = "openai";

/// API base URL used when none is configured.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Complete oracle configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleConfig {
    /// Which LLM to call and how to reach it.
    pub backend: LlmBackendConfig,
    /// Deadline for a single attempt.
    pub request_timeout: Duration,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// Sampling temperature sent to the backend.
    pub temperature: f64,
    /// Response token limit sent to the backend.
    pub max_tokens: u32,
    /// Directory of prompt templates overriding the built-in ones.
    pub templates_dir: Option<String>,
}

/// Configuration for a single LLM backend.
#[derive(Clone, PartialEq, Eq)]
pub struct LlmBackendConfig {
    /// The API dialect.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

impl fmt::Debug for LlmBackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmBackendConfig")
            .field("backend_type", &self.backend_type)
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

/// Supported LLM API dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions (`OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
}

impl BackendType {
    /// Parse a backend name as written in config files and env vars.
    pub fn parse(name: &str) -> Result<Self, OracleError> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(OracleError::Config(format!("unknown backend type: {other}"))),
        }
    }
}

impl OracleConfig {
    /// Configuration with default timeout, retries, and sampling.
    pub const fn new(backend: LlmBackendConfig) -> Self {
        Self {
            backend,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            temperature: 0.7,
            max_tokens: 300,
            templates_dir: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `ORACLE_API_KEY` -- API key
    ///
    /// Optional variables:
    /// - `ORACLE_BACKEND` -- `openai`, `anthropic`, or an alias (default `openai`)
    /// - `ORACLE_API_URL` -- API base URL (default `OpenAI`)
    /// - `ORACLE_MODEL` -- model name (default `gpt-4o-mini`)
    /// - `ORACLE_TIMEOUT_MS` -- per-attempt deadline in milliseconds (default 10000)
    /// - `ORACLE_MAX_RETRIES` -- retries for transient failures (default 1, at most 10)
    /// - `ORACLE_TEMPLATES_DIR` -- prompt template directory (default built-in)
    pub fn from_env() -> Result<Self, OracleError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable source, using the same names
    /// and defaults as [`OracleConfig::from_env`].
    pub fn from_vars<F>(lookup: F) -> Result<Self, OracleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("ORACLE_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                OracleError::Config("missing required env var ORACLE_API_KEY".to_owned())
            })?;
        let backend_name = lookup("ORACLE_BACKEND").unwrap_or_else(|| DEFAULT_BACKEND.to_owned());

        let backend = LlmBackendConfig {
            backend_type: BackendType::parse(&backend_name)?,
            api_url: lookup("ORACLE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_owned()),
            api_key,
            model: lookup("ORACLE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
        };

        let timeout_ms: u64 = parse_var(&lookup, "ORACLE_TIMEOUT_MS", "10000")?;
        if timeout_ms == 0 {
            return Err(OracleError::Config(
                "ORACLE_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }
        let max_retries: u32 = parse_var(&lookup, "ORACLE_MAX_RETRIES", "1")?;

        Ok(Self {
            request_timeout: Duration::from_millis(timeout_ms),
            max_retries: max_retries.min(MAX_RETRIES_CAP),
            templates_dir: lookup("ORACLE_TEMPLATES_DIR"),
            ..Self::new(backend)
        })
    }
}

/// Read an optional variable and parse it, using `default` when unset.
fn parse_var<F, T>(lookup: &F, name: &str, default: &str) -> Result<T, OracleError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    lookup(name)
        .unwrap_or_else(|| default.to_owned())
        .parse()
        .map_err(|e| OracleError::Config(format!("invalid {name}: {e}")))
}
