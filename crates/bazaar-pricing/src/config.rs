//! Tunable constants for price composition, haggling, and the fallback
//! negotiator.
//!
//! [`PricingConfig`] bundles every knob so the engine can load it from the
//! `pricing` section of `bazaar.yaml`. The defaults reproduce the shipped
//! game balance and are what every test assumes unless it says otherwise.

use serde::{Deserialize, Serialize};

/// Complete pricing configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Discount composition parameters.
    pub composer: ComposerConfig,
    /// Market haggling parameters.
    pub haggle: HaggleConfig,
    /// Deterministic fallback negotiator parameters.
    pub fallback: FallbackConfig,
}

/// Parameters for [`PriceModifierComposer`](crate::composer::PriceModifierComposer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Discount per bargaining level (default: 0.05).
    pub bargaining_step: f64,
    /// Minimum language or etiquette level that earns a bonus (default: 2).
    pub skill_bonus_threshold: u32,
    /// Discount for speaking one of the merchant's languages (default: 0.10).
    pub language_bonus: f64,
    /// Discount for good etiquette (default: 0.10).
    pub etiquette_bonus: f64,
    /// Divisor applied to `relationship - 50` (default: 500, i.e. +/-0.10).
    pub relationship_divisor: f64,
    /// Upper bound on the summed discount (default: 0.9).
    pub max_discount: f64,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            bargaining_step: 0.05,
            skill_bonus_threshold: 2,
            language_bonus: 0.10,
            etiquette_bonus: 0.10,
            relationship_divisor: 500.0,
            max_discount: 0.9,
        }
    }
}

/// Parameters for [`HaggleResolver`](crate::haggle::HaggleResolver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HaggleConfig {
    /// Success chance before any modifier (default: 0.5).
    pub base_chance: f64,
    /// Chance added per bargaining level (default: 0.1).
    pub bargaining_step: f64,
    /// Divisor applied to `relationship - 50` (default: 200).
    pub relationship_divisor: f64,
    /// Relationship change on success (default: +5).
    pub success_delta: i32,
    /// Relationship change on failure (default: -3).
    pub failure_delta: i32,
}

impl Default for HaggleConfig {
    fn default() -> Self {
        Self {
            base_chance: 0.5,
            bargaining_step: 0.1,
            relationship_divisor: 200.0,
            success_delta: 5,
            failure_delta: -3,
        }
    }
}

/// Parameters for [`FallbackResolver`](crate::fallback::FallbackResolver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Acceptance chance before any modifier (default: 0.5).
    pub base_chance: f64,
    /// Divisor applied to `relationship - 50` (default: 200).
    pub relationship_divisor: f64,
    /// Counter-offer as a fraction of the fair price (default: 0.85).
    pub counter_offer_factor: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            base_chance: 0.5,
            relationship_divisor: 200.0,
            counter_offer_factor: 0.85,
        }
    }
}
