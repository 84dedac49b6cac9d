//! Multi-factor price composition.
//!
//! The composer turns an item's base price into the price a specific player
//! pays a specific merchant. It is a pure function of its inputs:
//!
//! ```text
//! total_discount = min(0.9, bargaining + language + etiquette + relationship + profession)
//! final_price    = max(1, round(base_price * reputation_multiplier * (1 - total_discount)))
//! ```
//!
//! | Component    | Value                                            |
//! |--------------|--------------------------------------------------|
//! | Bargaining   | `level * 0.05`                                   |
//! | Language     | `+0.10` if any merchant language is level >= 2   |
//! | Etiquette    | `+0.10` if etiquette level >= 2                  |
//! | Relationship | `(score - 50) / 500`, so -0.10 to +0.10          |
//! | Profession   | external table, never negative                   |
//!
//! The cap keeps the residual price strictly positive no matter how many
//! bonuses stack. Every contributing modifier is reported in the
//! breakdown so the UI can explain the price.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use bazaar_types::{ItemCategory, Merchant, SkillProfile};

use crate::config::ComposerConfig;
use crate::providers::{
    NoProfessionDiscount, ProfessionDiscountProvider, ReputationProvider, TieredReputation,
    sanitize_discount, sanitize_multiplier,
};
use crate::relationship::{RELATIONSHIP_DEFAULT, RELATIONSHIP_MAX};

// ---------------------------------------------------------------------------
// Breakdown
// ---------------------------------------------------------------------------

/// Which factor a breakdown line describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKind {
    /// Faction reputation multiplier.
    Reputation,
    /// Bargaining skill discount.
    Bargaining,
    /// Shared-language discount.
    Language,
    /// Etiquette discount.
    Etiquette,
    /// Merchant rapport, positive or negative.
    Relationship,
    /// Profession-specific discount.
    Profession,
    /// Marker emitted when the summed discount hit the cap.
    DiscountCap,
}

/// One line of a price explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceModifier {
    /// The factor.
    pub kind: ModifierKind,
    /// Human-readable label, e.g. `"Bargaining"` or `"Elvish"`.
    pub label: String,
    /// Skill or score level behind the modifier, if any.
    pub level: Option<u32>,
    /// Discount fraction, or the multiplier for [`ModifierKind::Reputation`].
    pub value: f64,
}

/// A composed price and how it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// The price the player pays. Always at least 1.
    pub final_price: u32,
    /// The base price used.
    pub base_price: u32,
    /// The sanitized reputation multiplier.
    pub reputation_multiplier: f64,
    /// The summed discount after the cap.
    pub total_discount: f64,
    /// Contributing modifiers in application order.
    pub breakdown: Vec<PriceModifier>,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Borrowed inputs for a single composition.
#[derive(Debug, Clone, Copy)]
pub struct PricingInputs<'a> {
    /// Item list price.
    pub base_price: u32,
    /// Player reputation with the merchant's faction, `[0, 100]`.
    pub reputation_score: u32,
    /// Player skills.
    pub skills: &'a SkillProfile,
    /// The merchant.
    pub merchant: &'a Merchant,
    /// Player-merchant rapport, `[0, 100]`.
    pub relationship_score: u32,
    /// Categories of the item being priced.
    pub categories: &'a BTreeSet<ItemCategory>,
}

// ---------------------------------------------------------------------------
// PriceModifierComposer
// ---------------------------------------------------------------------------

/// Combines reputation, skills, rapport, and profession into a final price.
#[derive(Clone)]
pub struct PriceModifierComposer {
    config: ComposerConfig,
    reputation: Arc<dyn ReputationProvider>,
    professions: Arc<dyn ProfessionDiscountProvider>,
}

impl std::fmt::Debug for PriceModifierComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceModifierComposer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for PriceModifierComposer {
    fn default() -> Self {
        Self::new(
            ComposerConfig::default(),
            Arc::new(TieredReputation),
            Arc::new(NoProfessionDiscount),
        )
    }
}

impl PriceModifierComposer {
    /// Create a composer with explicit providers.
    pub fn new(
        config: ComposerConfig,
        reputation: Arc<dyn ReputationProvider>,
        professions: Arc<dyn ProfessionDiscountProvider>,
    ) -> Self {
        Self {
            config,
            reputation,
            professions,
        }
    }

    /// The composer configuration.
    pub const fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Compose the final price for one item.
    pub fn compose(&self, inputs: &PricingInputs<'_>) -> PriceQuote {
        let cfg = &self.config;
        let base_price = inputs.base_price.max(1);
        let mut breakdown = Vec::new();

        let reputation_multiplier =
            sanitize_multiplier(self.reputation.price_modifier(inputs.reputation_score.min(100)));
        breakdown.push(PriceModifier {
            kind: ModifierKind::Reputation,
            label: "Reputation".to_owned(),
            level: Some(inputs.reputation_score.min(100)),
            value: reputation_multiplier,
        });

        let mut total = 0.0;

        let bargaining = inputs.skills.bargaining_level;
        if bargaining > 0 {
            let value = f64::from(bargaining) * cfg.bargaining_step;
            total += value;
            breakdown.push(PriceModifier {
                kind: ModifierKind::Bargaining,
                label: "Bargaining".to_owned(),
                level: Some(bargaining),
                value,
            });
        }

        if let Some((language, level)) = shared_language(inputs, cfg.skill_bonus_threshold) {
            total += cfg.language_bonus;
            breakdown.push(PriceModifier {
                kind: ModifierKind::Language,
                label: language.to_owned(),
                level: Some(level),
                value: cfg.language_bonus,
            });
        }

        let etiquette = inputs.skills.etiquette_level;
        if etiquette >= cfg.skill_bonus_threshold {
            total += cfg.etiquette_bonus;
            breakdown.push(PriceModifier {
                kind: ModifierKind::Etiquette,
                label: "Etiquette".to_owned(),
                level: Some(etiquette),
                value: cfg.etiquette_bonus,
            });
        }

        let relationship =
            relationship_discount(inputs.relationship_score, cfg.relationship_divisor);
        if relationship.abs() > f64::EPSILON {
            total += relationship;
            breakdown.push(PriceModifier {
                kind: ModifierKind::Relationship,
                label: "Relationship".to_owned(),
                level: Some(inputs.relationship_score.min(RELATIONSHIP_MAX)),
                value: relationship,
            });
        }

        if let Some(profession) = inputs.skills.profession.as_deref() {
            let level = inputs.skills.profession_level;
            let value =
                sanitize_discount(self.professions.discount(profession, level, inputs.categories));
            if value > 0.0 {
                total += value;
                breakdown.push(PriceModifier {
                    kind: ModifierKind::Profession,
                    label: profession.to_owned(),
                    level: Some(level),
                    value,
                });
            }
        }

        let max_discount = cfg.max_discount.clamp(0.0, 0.99);
        if total > max_discount {
            breakdown.push(PriceModifier {
                kind: ModifierKind::DiscountCap,
                label: "Discount cap".to_owned(),
                level: None,
                value: max_discount,
            });
            total = max_discount;
        }

        let raw = f64::from(base_price) * reputation_multiplier * (1.0 - total);

        PriceQuote {
            final_price: round_price(raw),
            base_price,
            reputation_multiplier,
            total_discount: total,
            breakdown,
        }
    }
}

/// First merchant language the player speaks at or above `threshold`.
fn shared_language<'a>(inputs: &PricingInputs<'a>, threshold: u32) -> Option<(&'a str, u32)> {
    inputs.merchant.languages.iter().find_map(|language| {
        let level = inputs.skills.language_level(language);
        (level >= threshold).then_some((language.as_str(), level))
    })
}

/// `(score - 50) / divisor`, with the score clamped to `[0, 100]`.
fn relationship_discount(score: u32, divisor: f64) -> f64 {
    if !divisor.is_finite() || divisor <= 0.0 {
        return 0.0;
    }
    let score = f64::from(score.min(RELATIONSHIP_MAX));
    (score - f64::from(RELATIONSHIP_DEFAULT)) / divisor
}

/// Round a computed price to a whole number, floored at 1.
///
/// Non-finite inputs price at 1 rather than propagating NaN into the ledger.
pub fn round_price(value: f64) -> u32 {
    if !value.is_finite() {
        return 1;
    }
    let rounded = value.round().clamp(1.0, f64::from(u32::MAX));
    // Clamped into u32 range above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let price = rounded as u32;
    price
}
