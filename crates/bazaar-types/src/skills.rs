//! Player skills and faction reputation, as seen by the pricing engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Reputation score treated as neutral when a faction is unknown.
pub const NEUTRAL_REPUTATION: u32 = 50;

/// Highest possible faction reputation.
pub const MAX_REPUTATION: u32 = 100;

/// The player's trade-relevant skills.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SkillProfile {
    /// Bargaining skill level. Each level is worth a flat discount.
    pub bargaining_level: u32,
    /// Spoken languages and the player's level in each.
    pub languages: BTreeMap<String, u32>,
    /// Etiquette skill level.
    pub etiquette_level: u32,
    /// Profession identifier, if the player has one.
    pub profession: Option<String>,
    /// Level in the profession.
    pub profession_level: u32,
}

impl SkillProfile {
    /// Level in a given language, zero if unknown.
    pub fn language_level(&self, language: &str) -> u32 {
        self.languages.get(language).copied().unwrap_or(0)
    }
}

/// Per-faction reputation scores in `[0, 100]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReputationState {
    /// Faction name to score.
    pub factions: BTreeMap<String, u32>,
}

impl ReputationState {
    /// Score with a faction, clamped to `[0, 100]`.
    ///
    /// Unknown factions read as [`NEUTRAL_REPUTATION`].
    pub fn score(&self, faction: &str) -> u32 {
        self.factions
            .get(faction)
            .copied()
            .unwrap_or(NEUTRAL_REPUTATION)
            .min(MAX_REPUTATION)
    }

    /// Set a faction score, clamping to `[0, 100]`.
    pub fn set(&mut self, faction: impl Into<String>, score: u32) {
        self.factions.insert(faction.into(), score.min(MAX_REPUTATION));
    }
}
