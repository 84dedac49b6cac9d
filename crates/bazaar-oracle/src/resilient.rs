//! Retry-then-fallback composition of two oracles.
//!
//! [`ResilientOracle`] wraps a primary oracle with a per-attempt deadline
//! and a bounded retry budget, then hands the round to the
//! [`DeterministicFallbackOracle`] if the primary never produced a usable
//! outcome. The caller always gets an outcome.
//!
//! | Primary result                      | Action                 |
//! |-------------------------------------|------------------------|
//! | well-formed outcome                 | use it                 |
//! | `Unavailable` or deadline exceeded  | retry while budget left|
//! | `Malformed`, `Template`, `Config`   | fall back immediately  |
//! | outcome failing the structural check| fall back immediately  |

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use bazaar_types::{NegotiationContext, NegotiationOutcome};

use crate::config::{DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_TIMEOUT, MAX_RETRIES_CAP, OracleConfig};
use crate::error::{OracleError, ValidationError};
use crate::oracle::{DeterministicFallbackOracle, NegotiationOracle};

/// Which strategy produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeSource {
    /// The primary oracle.
    Oracle,
    /// The local fallback.
    Fallback,
}

impl OutcomeSource {
    /// Lowercase label for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Oracle => "oracle",
            Self::Fallback => "fallback",
        }
    }
}

/// An outcome and how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The outcome to apply.
    pub outcome: NegotiationOutcome,
    /// Who produced it.
    pub source: OutcomeSource,
    /// Primary attempts made, zero when running fallback-only.
    pub attempts: u32,
}

/// Deadline and retry budget for the primary oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deadline for each attempt.
    pub request_timeout: Duration,
    /// Retries after the first attempt. Values above
    /// [`MAX_RETRIES_CAP`] are treated as the cap.
    pub max_retries: u32,
}

impl RetryPolicy {
    /// Retries actually allowed.
    pub const fn retry_budget(&self) -> u32 {
        if self.max_retries > MAX_RETRIES_CAP {
            MAX_RETRIES_CAP
        } else {
            self.max_retries
        }
    }

    /// Longest a [`ResilientOracle::resolve`] call can spend on the
    /// primary: every allowed attempt running to its deadline.
    pub const fn round_budget(&self) -> Duration {
        self.request_timeout.saturating_mul(self.retry_budget().saturating_add(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl From<&OracleConfig> for RetryPolicy {
    fn from(config: &OracleConfig) -> Self {
        Self {
            request_timeout: config.request_timeout,
            max_retries: config.max_retries.min(MAX_RETRIES_CAP),
        }
    }
}

/// Primary oracle with retries and an infallible fallback.
#[derive(Debug)]
pub struct ResilientOracle<P> {
    primary: Option<P>,
    fallback: DeterministicFallbackOracle,
    policy: RetryPolicy,
}

impl<P: NegotiationOracle> ResilientOracle<P> {
    /// Compose a primary oracle with the fallback.
    pub const fn new(
        primary: P,
        fallback: DeterministicFallbackOracle,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            primary: Some(primary),
            fallback,
            policy,
        }
    }

    /// No primary: every round is decided by the fallback.
    pub const fn fallback_only(fallback: DeterministicFallbackOracle) -> Self {
        Self {
            primary: None,
            fallback,
            policy: RetryPolicy {
                request_timeout: DEFAULT_REQUEST_TIMEOUT,
                max_retries: 0,
            },
        }
    }

    /// Whether a primary oracle is configured.
    pub const fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Decide a round, never failing.
    pub async fn resolve(&self, context: &NegotiationContext) -> Resolution {
        let Some(primary) = &self.primary else {
            return self.fall_back(context, 0);
        };

        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);

            let answer = timeout(self.policy.request_timeout, primary.negotiate(context)).await;
            let error = match answer {
                Ok(Ok(outcome)) if outcome.is_well_formed() => {
                    debug!(
                        oracle = primary.name(),
                        attempts = attempts,
                        accepted = outcome.accepted,
                        "oracle outcome accepted"
                    );
                    return Resolution {
                        outcome,
                        source: OutcomeSource::Oracle,
                        attempts,
                    };
                }
                // An outcome built outside `parse_outcome` can still break the contract.
                Ok(Ok(outcome)) => OracleError::Malformed(ValidationError::IllFormed(format!(
                    "relationship change {}, counter offer {:?}, dialogue {} chars",
                    outcome.relationship_change,
                    outcome.counter_offer,
                    outcome.dialogue.trim().len()
                ))),
                Ok(Err(e)) => e,
                Err(_) => OracleError::Timeout,
            };

            let retry = error.is_retryable() && attempts <= self.policy.retry_budget();
            warn!(
                oracle = primary.name(),
                attempt = attempts,
                error = %error,
                retry = retry,
                timeout_ms =
                    u64::try_from(self.policy.request_timeout.as_millis()).unwrap_or(u64::MAX),
                "oracle attempt failed"
            );
            if !retry {
                return self.fall_back(context, attempts);
            }
        }
    }

    fn fall_back(&self, context: &NegotiationContext, attempts: u32) -> Resolution {
        let outcome = self.fallback.decide(context);
        debug!(
            attempts = attempts,
            accepted = outcome.accepted,
            "fallback outcome substituted"
        );
        Resolution {
            outcome,
            source: OutcomeSource::Fallback,
            attempts,
        }
    }
}

impl<P: NegotiationOracle> NegotiationOracle for ResilientOracle<P> {
    fn name(&self) -> &str {
        self.primary.as_ref().map_or("fallback", NegotiationOracle::name)
    }

    async fn negotiate(
        &self,
        context: &NegotiationContext,
    ) -> Result<NegotiationOutcome, OracleError> {
        Ok(self.resolve(context).await.outcome)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use bazaar_pricing::FallbackResolver;
    use bazaar_types::{Item, ItemCategory, Merchant, Personality, Rarity, SkillProfile};

    use super::*;

    /// What a scripted call does.
    enum Step {
        Answer(Result<NegotiationOutcome, OracleError>),
        Hang,
    }

    /// Primary oracle that plays back a script, then reports unavailable.
    struct Scripted {
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl NegotiationOracle for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn negotiate(
            &self,
            _context: &NegotiationContext,
        ) -> Result<NegotiationOutcome, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Answer(result)) => result,
                Some(Step::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3_600)).await;
                    Err(OracleError::Unavailable("woke up".to_owned()))
                }
                None => Err(OracleError::Unavailable("script exhausted".to_owned())),
            }
        }
    }

    fn context() -> NegotiationContext {
        NegotiationContext {
            merchant: Merchant::new("Brannoc", Personality::Friendly, 0.2),
            item: Item::new("Lute", 80, [ItemCategory::Misc], Rarity::Rare).unwrap(),
            proposed_price: 70,
            fair_price: 80,
            relationship_score: 50,
            history: Vec::new(),
            skills: SkillProfile::default(),
        }
    }

    fn remote_outcome() -> NegotiationOutcome {
        NegotiationOutcome {
            accepted: true,
            dialogue: "A fine lute! Agreed.".to_owned(),
            counter_offer: None,
            relationship_change: 2,
        }
    }

    fn oracle(steps: Vec<Step>, max_retries: u32) -> ResilientOracle<Scripted> {
        ResilientOracle::new(
            Scripted::new(steps),
            DeterministicFallbackOracle::seeded(FallbackResolver::default(), 7),
            RetryPolicy {
                request_timeout: Duration::from_secs(10),
                max_retries,
            },
        )
    }

    #[tokio::test]
    async fn valid_primary_outcome_is_used() {
        let oracle = oracle(vec![Step::Answer(Ok(remote_outcome()))], 1);
        let resolution = oracle.resolve(&context()).await;
        assert_eq!(resolution.source, OutcomeSource::Oracle);
        assert_eq!(resolution.outcome, remote_outcome());
        assert_eq!(resolution.attempts, 1);
    }

    #[tokio::test]
    async fn unavailable_is_retried() {
        let oracle = oracle(
            vec![
                Step::Answer(Err(OracleError::Unavailable("503".to_owned()))),
                Step::Answer(Ok(remote_outcome())),
            ],
            1,
        );
        let resolution = oracle.resolve(&context()).await;
        assert_eq!(resolution.source, OutcomeSource::Oracle);
        assert_eq!(resolution.attempts, 2);
    }

    #[tokio::test]
    async fn retries_exhausted_falls_back() {
        let oracle = oracle(Vec::new(), 2);
        let resolution = oracle.resolve(&context()).await;
        assert_eq!(resolution.source, OutcomeSource::Fallback);
        assert_eq!(resolution.attempts, 3);
        assert_eq!(oracle.primary.as_ref().map(Scripted::calls), Some(3));
        assert!(resolution.outcome.is_well_formed());
    }

    #[tokio::test]
    async fn malformed_is_not_retried() {
        let oracle = oracle(
            vec![
                Step::Answer(Err(ValidationError::EmptyDialogue.into())),
                Step::Answer(Ok(remote_outcome())),
            ],
            3,
        );
        let resolution = oracle.resolve(&context()).await;
        assert_eq!(resolution.source, OutcomeSource::Fallback);
        assert_eq!(resolution.attempts, 1);
    }

    #[tokio::test]
    async fn structurally_invalid_outcome_falls_back() {
        let bad = NegotiationOutcome {
            relationship_change: 40,
            ..remote_outcome()
        };
        let oracle = oracle(vec![Step::Answer(Ok(bad))], 3);
        let resolution = oracle.resolve(&context()).await;
        assert_eq!(resolution.source, OutcomeSource::Fallback);
        assert!(resolution.outcome.is_well_formed());
    }

    #[tokio::test]
    async fn retry_budget_is_capped() {
        let oracle = oracle(Vec::new(), u32::MAX);
        let resolution = oracle.resolve(&context()).await;
        assert_eq!(resolution.source, OutcomeSource::Fallback);
        assert_eq!(resolution.attempts, MAX_RETRIES_CAP + 1);
        assert_eq!(oracle.primary.as_ref().map(Scripted::calls), Some(MAX_RETRIES_CAP + 1));
    }

    #[test]
    fn round_budget_covers_every_attempt() {
        let policy = RetryPolicy {
            request_timeout: Duration::from_secs(10),
            max_retries: 2,
        };
        assert_eq!(policy.round_budget(), Duration::from_secs(30));

        let runaway = RetryPolicy {
            max_retries: u32::MAX,
            ..policy
        };
        assert_eq!(runaway.round_budget(), Duration::from_secs(110));
    }

    #[test]
    fn policy_from_config_clamps_retries() {
        let config = OracleConfig {
            max_retries: 500,
            ..OracleConfig::new(crate::config::LlmBackendConfig {
                backend_type: crate::config::BackendType::OpenAi,
                api_url: "http://localhost:11434/v1".to_owned(),
                api_key: "k".to_owned(),
                model: "llama3".to_owned(),
            })
        };
        assert_eq!(RetryPolicy::from(&config).max_retries, MAX_RETRIES_CAP);
    }

    #[test]
    fn ill_formed_outcome_is_reported_as_such() {
        let err: OracleError =
            ValidationError::IllFormed("relationship change 40".to_owned()).into();
        assert!(err.to_string().contains("breaks the contract"));
        assert!(!err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_primary_times_out_then_falls_back() {
        let oracle = oracle(vec![Step::Hang, Step::Hang], 1);
        let started = tokio::time::Instant::now();

        let resolution = oracle.resolve(&context()).await;

        assert_eq!(resolution.source, OutcomeSource::Fallback);
        assert_eq!(resolution.attempts, 2);
        // Two attempts, each cut off at the 10 s deadline.
        assert!(started.elapsed() >= Duration::from_secs(20));
        assert!(started.elapsed() < Duration::from_secs(3_600));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_then_success() {
        let oracle = oracle(vec![Step::Hang, Step::Answer(Ok(remote_outcome()))], 1);
        let resolution = oracle.resolve(&context()).await;
        assert_eq!(resolution.source, OutcomeSource::Oracle);
        assert_eq!(resolution.attempts, 2);
    }

    #[tokio::test]
    async fn fallback_only_never_calls_primary() {
        let oracle: ResilientOracle<Scripted> = ResilientOracle::fallback_only(
            DeterministicFallbackOracle::seeded(FallbackResolver::default(), 3),
        );
        assert!(!oracle.has_primary());
        assert_eq!(oracle.name(), "fallback");

        let resolution = oracle.resolve(&context()).await;
        assert_eq!(resolution.source, OutcomeSource::Fallback);
        assert_eq!(resolution.attempts, 0);
    }

    #[tokio::test]
    async fn trait_impl_never_errors() {
        let oracle = oracle(Vec::new(), 0);
        assert!(oracle.negotiate(&context()).await.is_ok());
    }
}
