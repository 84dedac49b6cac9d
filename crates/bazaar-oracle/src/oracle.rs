//! The negotiation oracle contract and its two strategies.
//!
//! [`RemoteOracle`] asks an LLM to play the merchant.
//! [`DeterministicFallbackOracle`] plays the merchant locally with the
//! [`FallbackResolver`] and cannot fail. Sessions depend only on the
//! [`NegotiationOracle`] trait, so either one (or a composition of both)
//! can be plugged in.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use bazaar_pricing::FallbackResolver;
use bazaar_types::{NegotiationContext, NegotiationOutcome};

use crate::config::OracleConfig;
use crate::error::OracleError;
use crate::llm::{LlmBackend, create_backend};
use crate::parse::parse_outcome;
use crate::prompt::PromptEngine;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Decides one round of an NPC negotiation.
pub trait NegotiationOracle: Send + Sync {
    /// Name for logs.
    fn name(&self) -> &str;

    /// Judge the proposed price in `context`.
    fn negotiate(
        &self,
        context: &NegotiationContext,
    ) -> impl Future<Output = Result<NegotiationOutcome, OracleError>> + Send;
}

// ---------------------------------------------------------------------------
// RemoteOracle
// ---------------------------------------------------------------------------

/// LLM-backed oracle: render a prompt, call the backend, validate the reply.
pub struct RemoteOracle {
    backend: LlmBackend,
    prompts: PromptEngine,
}

impl std::fmt::Debug for RemoteOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteOracle")
            .field("backend", &self.backend.name())
            .finish_non_exhaustive()
    }
}

impl RemoteOracle {
    /// Assemble from parts.
    pub const fn new(backend: LlmBackend, prompts: PromptEngine) -> Self {
        Self { backend, prompts }
    }

    /// Build the backend and prompt engine an [`OracleConfig`] describes.
    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        let prompts = PromptEngine::from_optional_dir(config.templates_dir.as_deref())?;
        Ok(Self::new(create_backend(config), prompts))
    }
}

impl NegotiationOracle for RemoteOracle {
    fn name(&self) -> &str {
        self.backend.name()
    }

    async fn negotiate(
        &self,
        context: &NegotiationContext,
    ) -> Result<NegotiationOutcome, OracleError> {
        let prompt = self.prompts.render(context)?;

        let start = Instant::now();
        let raw = self.backend.complete(&prompt).await?;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        debug!(
            backend = self.backend.name(),
            latency_ms = latency_ms,
            response_len = raw.len(),
            "oracle responded"
        );

        Ok(parse_outcome(&raw)?)
    }
}

// ---------------------------------------------------------------------------
// DeterministicFallbackOracle
// ---------------------------------------------------------------------------

/// Local oracle backed by [`FallbackResolver`]. Never returns `Err`.
///
/// The RNG sits behind a mutex so one instance can serve concurrent
/// sessions; with a fixed seed and a fixed call order every outcome is
/// reproducible.
#[derive(Debug)]
pub struct DeterministicFallbackOracle {
    resolver: FallbackResolver,
    rng: Mutex<StdRng>,
}

impl DeterministicFallbackOracle {
    /// Oracle with a fixed seed.
    pub fn seeded(resolver: FallbackResolver, seed: u64) -> Self {
        Self {
            resolver,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Oracle seeded from the operating system.
    pub fn from_entropy(resolver: FallbackResolver) -> Self {
        Self {
            resolver,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Decide synchronously.
    pub fn decide(&self, context: &NegotiationContext) -> NegotiationOutcome {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.resolver.resolve(context, &mut *rng)
    }
}

impl NegotiationOracle for DeterministicFallbackOracle {
    fn name(&self) -> &str {
        "fallback"
    }

    fn negotiate(
        &self,
        context: &NegotiationContext,
    ) -> impl Future<Output = Result<NegotiationOutcome, OracleError>> + Send {
        std::future::ready(Ok(self.decide(context)))
    }
}

impl<T: NegotiationOracle> NegotiationOracle for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn negotiate(
        &self,
        context: &NegotiationContext,
    ) -> Result<NegotiationOutcome, OracleError> {
        (**self).negotiate(context).await
    }
}
