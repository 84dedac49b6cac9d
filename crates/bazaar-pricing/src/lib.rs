//! Pure pricing and negotiation math for the Bazaar engine.
//!
//! Nothing in this crate blocks or performs I/O. Randomness is always
//! injected by the caller, so every probabilistic result is reproducible
//! under a seeded RNG.
//!
//! # Modules
//!
//! - [`config`] -- Tunable constants with defaults matching the shipped balance
//! - [`relationship`] -- Per-merchant rapport scores, clamped to `[0, 100]`
//! - [`providers`] -- Reputation and profession discount contracts with default tables
//! - [`composer`] -- Multi-factor final price with an explained breakdown
//! - [`haggle`] -- Single-shot market haggling
//! - [`fallback`] -- Infallible local negotiator used when the oracle cannot answer
//! - [`error`] -- Unrepairable preconditions
//!
//! # Example
//!
//! ```
//! use bazaar_pricing::{HaggleRequest, HaggleResolver};
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//!
//! let resolver = HaggleResolver::default();
//! let request = HaggleRequest {
//!     offered_price: 40,
//!     fair_price: 40,
//!     bargaining_level: 3,
//!     relationship_score: 50,
//! };
//!
//! // 0.5 + 0.3 + 0.0 + 0.2, clamped to 1.0
//! assert!((resolver.success_chance(&request) - 1.0).abs() < f64::EPSILON);
//!
//! let mut rng = SmallRng::seed_from_u64(42);
//! let outcome = resolver.resolve(&request, &mut rng).ok();
//! assert_eq!(outcome.map(|o| o.success), Some(true));
//! ```

pub mod composer;
pub mod config;
pub mod error;
pub mod fallback;
pub mod haggle;
pub mod providers;
pub mod relationship;

pub use composer::{
    ModifierKind, PriceModifier, PriceModifierComposer, PriceQuote, PricingInputs, round_price,
};
pub use config::{ComposerConfig, FallbackConfig, HaggleConfig, PricingConfig};
pub use error::PricingError;
pub use fallback::FallbackResolver;
pub use haggle::{HaggleOutcome, HaggleRequest, HaggleResolver, bernoulli, clamp_probability};
pub use providers::{
    NeutralReputation, NoProfessionDiscount, ProfessionDiscount, ProfessionDiscountProvider,
    ProfessionTable, ReputationProvider, TieredReputation,
};
pub use relationship::{
    RELATIONSHIP_DEFAULT, RELATIONSHIP_MAX, RELATIONSHIP_MIN, RelationshipTier,
    RelationshipTracker,
};
