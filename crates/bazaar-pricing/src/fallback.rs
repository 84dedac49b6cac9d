//! Local negotiator used whenever the remote oracle cannot answer.
//!
//! [`FallbackResolver`] produces a [`NegotiationOutcome`] for any context
//! and never fails. The acceptance roll is
//!
//! ```text
//! chance = 0.5 + (relationship - 50) / 200 + ratio_adjustment
//! ```
//!
//! with `ratio = proposed / fair` adjusting by -0.4 above 1.3, -0.2 above
//! 1.1, +0.3 at or below 0.9. Dialogue comes from a small set of lines per
//! merchant personality, picked with the same injected RNG as the roll.

use rand::Rng;
use rand::seq::IndexedRandom;

use bazaar_types::{NegotiationContext, NegotiationOutcome, Personality};

use crate::composer::round_price;
use crate::config::FallbackConfig;
use crate::haggle::{bernoulli, clamp_probability};
use crate::relationship::{RELATIONSHIP_DEFAULT, RELATIONSHIP_MAX};

// ---------------------------------------------------------------------------
// Dialogue templates
// ---------------------------------------------------------------------------

const FRIENDLY_ACCEPT: &[&str] = &[
    "{merchant} beams. \"{price} gold it is, friend. Pleasure doing business!\"",
    "\"For you? {price} gold sounds just right,\" says {merchant}.",
];
const FRIENDLY_REJECT: &[&str] = &[
    "{merchant} winces. \"I'd love to, but I can only manage {counter} gold.\"",
    "\"That's a touch steep, friend. Would {counter} gold work?\" asks {merchant}.",
];
const SHREWD_ACCEPT: &[&str] = &[
    "{merchant} weighs it carefully. \"{price} gold. Agreed.\"",
    "\"A fair figure. {price} gold, then,\" {merchant} concedes.",
];
const SHREWD_REJECT: &[&str] = &[
    "{merchant} taps the counter. \"The market says {counter} gold. Not a coin more.\"",
    "\"I know what this is worth. {counter} gold,\" {merchant} replies flatly.",
];
const GREEDY_ACCEPT: &[&str] = &[
    "{merchant}'s eyes glint. \"{price} gold. Done, before you change your mind.\"",
    "\"Hmph. {price} gold. You drive a hard bargain,\" grumbles {merchant}.",
];
const GREEDY_REJECT: &[&str] = &[
    "{merchant} laughs. \"Robbery! {counter} gold and you should thank me.\"",
    "\"Do I look like a charity? {counter} gold,\" sneers {merchant}.",
];
const GRUFF_ACCEPT: &[&str] = &[
    "{merchant} grunts. \"{price}. Fine.\"",
    "\"{price} gold. Take it and go,\" mutters {merchant}.",
];
const GRUFF_REJECT: &[&str] = &[
    "{merchant} shakes their head. \"No. {counter}.\"",
    "\"Too much. {counter} gold or nothing,\" growls {merchant}.",
];
const ECCENTRIC_ACCEPT: &[&str] = &[
    "{merchant} claps delightedly. \"{price} gold! The stars approve!\"",
    "\"{price}, a most harmonious number,\" {merchant} muses. \"Sold!\"",
];
const ECCENTRIC_REJECT: &[&str] = &[
    "{merchant} squints at the ceiling. \"The omens whisper {counter} gold.\"",
    "\"No, no, no. {counter} gold. It rhymes with nothing, but it's right,\" says {merchant}.",
];

const GENERIC_ACCEPT: &str = "{merchant} nods. \"{price} gold. Deal.\"";
const GENERIC_REJECT: &str = "{merchant} shakes their head. \"I can offer {counter} gold.\"";

const fn templates(personality: Personality, accepted: bool) -> &'static [&'static str] {
    match (personality, accepted) {
        (Personality::Friendly, true) => FRIENDLY_ACCEPT,
        (Personality::Friendly, false) => FRIENDLY_REJECT,
        (Personality::Shrewd, true) => SHREWD_ACCEPT,
        (Personality::Shrewd, false) => SHREWD_REJECT,
        (Personality::Greedy, true) => GREEDY_ACCEPT,
        (Personality::Greedy, false) => GREEDY_REJECT,
        (Personality::Gruff, true) => GRUFF_ACCEPT,
        (Personality::Gruff, false) => GRUFF_REJECT,
        (Personality::Eccentric, true) => ECCENTRIC_ACCEPT,
        (Personality::Eccentric, false) => ECCENTRIC_REJECT,
    }
}

fn render(template: &str, merchant: &str, price: u32, counter: u32) -> String {
    let merchant = if merchant.trim().is_empty() {
        "The merchant"
    } else {
        merchant.trim()
    };
    template
        .replace("{merchant}", merchant)
        .replace("{price}", &price.to_string())
        .replace("{counter}", &counter.to_string())
}

// ---------------------------------------------------------------------------
// FallbackResolver
// ---------------------------------------------------------------------------

/// Deterministic, infallible stand-in for the negotiation oracle.
#[derive(Debug, Clone, Default)]
pub struct FallbackResolver {
    config: FallbackConfig,
}

impl FallbackResolver {
    /// Create a resolver with explicit configuration.
    pub const fn new(config: FallbackConfig) -> Self {
        Self { config }
    }

    /// Acceptance chance, clamped to `[0, 1]`.
    ///
    /// Prices below 1 are treated as 1 and the relationship is capped at
    /// 100, so every input produces a usable probability.
    pub fn acceptance_chance(
        &self,
        proposed_price: u32,
        fair_price: u32,
        relationship: u32,
    ) -> f64 {
        let relationship = f64::from(relationship.min(RELATIONSHIP_MAX));
        let mut chance = self.config.base_chance
            + (relationship - f64::from(RELATIONSHIP_DEFAULT)) / self.config.relationship_divisor;

        let ratio = price_ratio(proposed_price, fair_price);
        if ratio > 1.3 {
            chance -= 0.4;
        } else if ratio > 1.1 {
            chance -= 0.2;
        } else if ratio <= 0.9 {
            chance += 0.3;
        }

        clamp_probability(chance)
    }

    /// Decide one negotiation round.
    pub fn resolve(&self, context: &NegotiationContext, rng: &mut impl Rng) -> NegotiationOutcome {
        let proposed = context.proposed_price.max(1);
        let fair = context.fair_price.max(1);
        let ratio = price_ratio(proposed, fair);
        let chance = self.acceptance_chance(proposed, fair, context.relationship_score);
        let accepted = bernoulli(rng, chance);

        let counter = round_price(f64::from(fair) * self.config.counter_offer_factor);
        let template = templates(context.merchant.personality, accepted)
            .choose(rng)
            .copied()
            .unwrap_or(if accepted { GENERIC_ACCEPT } else { GENERIC_REJECT });
        let dialogue = render(template, &context.merchant.name, proposed, counter);

        if accepted {
            NegotiationOutcome {
                accepted,
                dialogue,
                counter_offer: None,
                relationship_change: if ratio <= 1.0 { 3 } else { 1 },
            }
        } else {
            NegotiationOutcome {
                accepted,
                dialogue,
                counter_offer: Some(counter),
                relationship_change: if ratio > 1.5 { -3 } else { -1 },
            }
        }
    }
}

fn price_ratio(proposed: u32, fair: u32) -> f64 {
    f64::from(proposed.max(1)) / f64::from(fair.max(1))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use bazaar_types::{Item, ItemCategory, Merchant, Rarity, SkillProfile};

    use super::*;

    fn context(
        proposed_price: u32,
        fair_price: u32,
        relationship_score: u32,
    ) -> NegotiationContext {
        NegotiationContext {
            merchant: Merchant::new("Hassan", Personality::Shrewd, 0.5),
            item: Item::new("Silk Scarf", 40, [ItemCategory::Misc], Rarity::Common)
                .unwrap_or_else(|| panic!("valid item")),
            proposed_price,
            fair_price,
            relationship_score,
            history: Vec::new(),
            skills: SkillProfile::default(),
        }
    }

    #[test]
    fn chance_formula() {
        let resolver = FallbackResolver::default();
        assert!((resolver.acceptance_chance(9, 10, 50) - 0.8).abs() < 1e-9);
        assert!((resolver.acceptance_chance(10, 10, 50) - 0.5).abs() < 1e-9);
        assert!((resolver.acceptance_chance(12, 10, 50) - 0.3).abs() < 1e-9);
        assert!((resolver.acceptance_chance(14, 10, 50) - 0.1).abs() < 1e-9);
        assert!((resolver.acceptance_chance(10, 10, 100) - 0.75).abs() < 1e-9);
        assert!(resolver.acceptance_chance(30, 10, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn acceptance_rate_matches_chance() {
        let resolver = FallbackResolver::default();
        let ctx = context(9, 10, 50);
        let mut rng = SmallRng::seed_from_u64(42);

        let trials = 10_000_u32;
        let accepted = (0..trials)
            .filter(|_| resolver.resolve(&ctx, &mut rng).accepted)
            .count();
        let rate = f64::from(u32::try_from(accepted).unwrap_or(0)) / f64::from(trials);
        assert!((rate - 0.8).abs() < 0.02, "observed rate {rate}");
    }

    #[test]
    fn overpriced_proposals_get_countered() {
        let resolver = FallbackResolver::default();
        let ctx = context(200, 100, 50);
        let mut rng = SmallRng::seed_from_u64(42);

        let mut rejections = 0;
        for _ in 0..1_000 {
            let outcome = resolver.resolve(&ctx, &mut rng);
            if !outcome.accepted {
                rejections += 1;
                assert_eq!(outcome.counter_offer, Some(85));
                assert_eq!(outcome.relationship_change, -3);
                assert!(outcome.dialogue.contains("85"));
            }
        }
        // chance is 0.1
        assert!(rejections > 850, "only {rejections} rejections");
    }

    #[test]
    fn acceptance_deltas_depend_on_ratio() {
        let resolver = FallbackResolver::default();
        let mut rng = SmallRng::seed_from_u64(5);

        // Relationship 100 at ratio 0.5 makes acceptance certain.
        let cheap = resolver.resolve(&context(50, 100, 100), &mut rng);
        assert!(cheap.accepted);
        assert_eq!(cheap.relationship_change, 3);
        assert_eq!(cheap.counter_offer, None);
        assert!(cheap.dialogue.contains("Hassan"));
        assert!(cheap.dialogue.contains("50"));
    }

    #[test]
    fn mild_overprice_rejection_costs_one() {
        let resolver = FallbackResolver::default();
        let mut rng = SmallRng::seed_from_u64(5);
        // ratio 1.2, relationship 0: 0.5 - 0.25 - 0.2 = 0.05
        let ctx = context(120, 100, 0);
        let outcome = (0..100)
            .map(|_| resolver.resolve(&ctx, &mut rng))
            .find(|o| !o.accepted);
        assert_eq!(outcome.map(|o| o.relationship_change), Some(-1));
    }

    #[test]
    fn edge_inputs_stay_well_formed() {
        let resolver = FallbackResolver::default();
        let mut rng = SmallRng::seed_from_u64(9);
        for (proposed, fair, rel) in [
            (0, 0, 0),
            (0, 100, 50),
            (1, 1, 100),
            (u32::MAX, 1, 500),
            (1, u32::MAX, 0),
        ] {
            for _ in 0..20 {
                let outcome = resolver.resolve(&context(proposed, fair, rel), &mut rng);
                assert!(outcome.is_well_formed(), "{proposed}/{fair}/{rel}: {outcome:?}");
            }
        }
    }

    #[test]
    fn same_seed_same_dialogue() {
        let resolver = FallbackResolver::default();
        let ctx = context(100, 100, 50);
        let run = || {
            let mut rng = SmallRng::seed_from_u64(77);
            (0..10).map(|_| resolver.resolve(&ctx, &mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn blank_merchant_name_is_replaced() {
        let rendered = render(GENERIC_ACCEPT, "  ", 10, 8);
        assert!(rendered.starts_with("The merchant"));
    }
}
