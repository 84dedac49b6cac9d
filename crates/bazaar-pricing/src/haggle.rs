//! Single-shot market haggling.
//!
//! When browsing a market the player can name a price instead of paying the
//! quoted one. The merchant accepts or refuses in one roll:
//!
//! ```text
//! chance = 0.5 + bargaining_level * 0.1 + (relationship - 50) / 200 + ratio_adjustment
//! ```
//!
//! where `ratio = offered / fair` adjusts the chance by -0.3 below 0.7,
//! -0.1 below 0.85, +0.2 at or above 0.95, and not at all in between. The
//! chance is clamped to `[0, 1]` before the roll.
//!
//! The random source is injected so a seeded RNG reproduces every outcome.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::HaggleConfig;
use crate::error::PricingError;
use crate::relationship::{RELATIONSHIP_DEFAULT, RELATIONSHIP_MAX};

/// One haggle attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaggleRequest {
    /// Price the player offers. Must be positive.
    pub offered_price: u32,
    /// Fair price from the composer.
    pub fair_price: u32,
    /// Player bargaining level.
    pub bargaining_level: u32,
    /// Player-merchant rapport.
    pub relationship_score: u32,
}

impl HaggleRequest {
    /// `offered / fair`, with the fair price floored at 1.
    pub fn price_ratio(&self) -> f64 {
        f64::from(self.offered_price) / f64::from(self.fair_price.max(1))
    }
}

/// Result of a haggle roll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HaggleOutcome {
    /// Whether the merchant accepted the offer.
    pub success: bool,
    /// The price the deal closes at: the offer on success, `None` on failure.
    pub final_price: Option<u32>,
    /// Relationship change to apply.
    pub relationship_delta: i32,
    /// The fair price, for the refusal message.
    pub fair_price: u32,
    /// The clamped chance that was rolled against.
    pub success_chance: f64,
}

/// Resolves market haggles.
#[derive(Debug, Clone, Default)]
pub struct HaggleResolver {
    config: HaggleConfig,
}

impl HaggleResolver {
    /// Create a resolver with explicit configuration.
    pub const fn new(config: HaggleConfig) -> Self {
        Self { config }
    }

    /// Success chance for a request, clamped to `[0, 1]`.
    pub fn success_chance(&self, request: &HaggleRequest) -> f64 {
        let cfg = &self.config;
        let relationship = f64::from(request.relationship_score.min(RELATIONSHIP_MAX));
        let mut chance = cfg.base_chance
            + f64::from(request.bargaining_level) * cfg.bargaining_step
            + (relationship - f64::from(RELATIONSHIP_DEFAULT)) / cfg.relationship_divisor;

        let ratio = request.price_ratio();
        if ratio < 0.7 {
            chance -= 0.3;
        } else if ratio < 0.85 {
            chance -= 0.1;
        } else if ratio >= 0.95 {
            chance += 0.2;
        }

        clamp_probability(chance)
    }

    /// Roll a haggle.
    ///
    /// The caller must already have checked that the player can afford the
    /// offer.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::InvalidPrice`] if the offer is zero.
    pub fn resolve(
        &self,
        request: &HaggleRequest,
        rng: &mut impl Rng,
    ) -> Result<HaggleOutcome, PricingError> {
        if request.offered_price == 0 {
            return Err(PricingError::InvalidPrice {
                price: request.offered_price,
            });
        }

        let success_chance = self.success_chance(request);
        let success = bernoulli(rng, success_chance);

        Ok(HaggleOutcome {
            success,
            final_price: success.then_some(request.offered_price),
            relationship_delta: if success {
                self.config.success_delta
            } else {
                self.config.failure_delta
            },
            fair_price: request.fair_price,
            success_chance,
        })
    }
}

/// Clamp a probability into `[0, 1]`. NaN becomes 0.
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

/// Draw one Bernoulli trial. `p` is clamped first, so any input is safe.
pub fn bernoulli(rng: &mut impl Rng, p: f64) -> bool {
    rng.random::<f64>() < clamp_probability(p)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn request(
        offered_price: u32,
        bargaining_level: u32,
        relationship_score: u32,
    ) -> HaggleRequest {
        HaggleRequest {
            offered_price,
            fair_price: 100,
            bargaining_level,
            relationship_score,
        }
    }

    #[test]
    fn chance_at_fair_price() {
        let resolver = HaggleResolver::default();
        // 0.5 + 0 + 0 + 0.2
        assert!((resolver.success_chance(&request(100, 0, 50)) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn ratio_bands() {
        let resolver = HaggleResolver::default();
        assert!((resolver.success_chance(&request(60, 0, 50)) - 0.2).abs() < 1e-9);
        assert!((resolver.success_chance(&request(80, 0, 50)) - 0.4).abs() < 1e-9);
        assert!((resolver.success_chance(&request(90, 0, 50)) - 0.5).abs() < 1e-9);
        assert!((resolver.success_chance(&request(95, 0, 50)) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn relationship_moves_chance() {
        let resolver = HaggleResolver::default();
        // (100 - 50) / 200 = 0.25
        assert!((resolver.success_chance(&request(90, 0, 100)) - 0.75).abs() < 1e-9);
        assert!((resolver.success_chance(&request(90, 0, 0)) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn chance_is_clamped() {
        let resolver = HaggleResolver::default();
        assert!((resolver.success_chance(&request(100, 30, 100)) - 1.0).abs() < f64::EPSILON);
        assert!(resolver.success_chance(&request(1, 0, 0)).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_offer_is_rejected() {
        let resolver = HaggleResolver::default();
        let mut rng = SmallRng::seed_from_u64(42);
        assert_eq!(
            resolver.resolve(&request(0, 3, 50), &mut rng),
            Err(PricingError::InvalidPrice { price: 0 })
        );
    }

    #[test]
    fn seeded_rolls_are_reproducible() {
        let resolver = HaggleResolver::default();
        let req = HaggleRequest {
            offered_price: 40,
            fair_price: 40,
            bargaining_level: 3,
            relationship_score: 50,
        };

        let run = |seed: u64| {
            let mut rng = SmallRng::seed_from_u64(seed);
            (0..50)
                .map(|_| resolver.resolve(&req, &mut rng).map(|o| o.success).unwrap_or(false))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(42), run(42));
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn certain_success_finalizes_at_offer() {
        let resolver = HaggleResolver::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let outcome = resolver.resolve(&request(100, 10, 100), &mut rng);
        assert_eq!(
            outcome.map(|o| (o.success, o.final_price, o.relationship_delta)),
            Ok((true, Some(100), 5))
        );
    }

    #[test]
    fn certain_failure_reports_fair_price() {
        let resolver = HaggleResolver::default();
        let mut rng = SmallRng::seed_from_u64(1);
        let outcome = resolver.resolve(&request(10, 0, 0), &mut rng);
        assert_eq!(
            outcome.map(|o| (o.success, o.final_price, o.relationship_delta, o.fair_price)),
            Ok((false, None, -3, 100))
        );
    }

    #[test]
    fn bernoulli_tolerates_garbage() {
        let mut rng = SmallRng::seed_from_u64(3);
        assert!(!bernoulli(&mut rng, f64::NAN));
        assert!(!bernoulli(&mut rng, -4.0));
        assert!(bernoulli(&mut rng, 9.0));
    }
}
