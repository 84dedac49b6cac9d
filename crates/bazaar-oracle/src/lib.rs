//! Negotiation oracles for the Bazaar engine.
//!
//! A negotiation oracle plays the merchant in an NPC sale: given the item,
//! the asking price, and the conversation so far, it decides whether to
//! accept, what the merchant says, and whether to counter.
//!
//! # Architecture
//!
//! - [`NegotiationOracle`] -- the contract sessions depend on
//! - [`RemoteOracle`] -- an LLM behind `reqwest`, prompted through `minijinja`
//! - [`DeterministicFallbackOracle`] -- the local, infallible negotiator
//! - [`ResilientOracle`] -- per-attempt deadline, bounded retries, then fallback
//!
//! Remote output is untrusted: [`parse::parse_outcome`] recovers JSON from
//! common LLM formatting mistakes and rejects anything outside the outcome
//! contract, which sends the round to the fallback.
//!
//! # Modules
//!
//! - [`config`] -- Backend, timeout, and retry configuration (env-loadable)
//! - [`error`] -- [`OracleError`] and [`ValidationError`]
//! - [`llm`] -- `OpenAI`-compatible and Anthropic backends
//! - [`prompt`] -- Built-in and on-disk prompt templates
//! - [`parse`] -- Response recovery and validation
//! - [`oracle`] -- The trait and both strategies
//! - [`resilient`] -- Retry-then-fallback composition

pub mod config;
pub mod error;
pub mod llm;
pub mod oracle;
pub mod parse;
pub mod prompt;
pub mod resilient;

pub use config::{
    BackendType, DEFAULT_API_URL, DEFAULT_BACKEND, DEFAULT_MAX_RETRIES, DEFAULT_MODEL,
    DEFAULT_REQUEST_TIMEOUT, LlmBackendConfig, MAX_RETRIES_CAP, OracleConfig,
};
pub use error::{OracleError, ValidationError};
pub use oracle::{DeterministicFallbackOracle, NegotiationOracle, RemoteOracle};
pub use parse::parse_outcome;
pub use prompt::{PromptEngine, RenderedPrompt};
pub use resilient::{OutcomeSource, Resolution, ResilientOracle, RetryPolicy};
