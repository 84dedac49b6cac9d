//! Per-merchant rapport tracking.
//!
//! A [`RelationshipTracker`] belongs to one player and holds a score in
//! `[0, 100]` for every merchant that player has dealt with. It is the only
//! place rapport lives: pricing and negotiation read from it, and only
//! settled haggles and negotiation rounds write to it.
//!
//! Scores are clamped on every update, so no delta -- however large --
//! can push a score outside the valid range.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use bazaar_types::MerchantId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Lowest possible relationship score.
pub const RELATIONSHIP_MIN: u32 = 0;

/// Highest possible relationship score.
pub const RELATIONSHIP_MAX: u32 = 100;

/// Score assigned on first contact with a merchant.
pub const RELATIONSHIP_DEFAULT: u32 = 50;

// ---------------------------------------------------------------------------
// RelationshipTier
// ---------------------------------------------------------------------------

/// Coarse label for a relationship score, shown to players and oracles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationshipTier {
    /// Below 20.
    Hostile,
    /// 20 to 39.
    Wary,
    /// 40 to 59.
    Neutral,
    /// 60 to 79.
    Friendly,
    /// 80 and above.
    Trusted,
}

impl RelationshipTier {
    /// Classify a score.
    pub const fn from_score(score: u32) -> Self {
        match score {
            0..=19 => Self::Hostile,
            20..=39 => Self::Wary,
            40..=59 => Self::Neutral,
            60..=79 => Self::Friendly,
            _ => Self::Trusted,
        }
    }

    /// Lowercase label.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hostile => "hostile",
            Self::Wary => "wary",
            Self::Neutral => "neutral",
            Self::Friendly => "friendly",
            Self::Trusted => "trusted",
        }
    }
}

// ---------------------------------------------------------------------------
// RelationshipTracker
// ---------------------------------------------------------------------------

/// Bounded rapport scores between one player and every merchant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipTracker {
    /// Score per merchant. Absent means first contact.
    scores: BTreeMap<MerchantId, u32>,
    /// Number of updates applied per merchant.
    interactions: BTreeMap<MerchantId, u64>,
}

impl RelationshipTracker {
    /// Create an empty tracker.
    pub const fn new() -> Self {
        Self {
            scores: BTreeMap::new(),
            interactions: BTreeMap::new(),
        }
    }

    /// Current score with a merchant, [`RELATIONSHIP_DEFAULT`] if unknown.
    pub fn get(&self, merchant: MerchantId) -> u32 {
        self.scores
            .get(&merchant)
            .copied()
            .unwrap_or(RELATIONSHIP_DEFAULT)
            .min(RELATIONSHIP_MAX)
    }

    /// The score [`update`](Self::update) would produce, without applying it.
    pub fn preview(&self, merchant: MerchantId, delta: i32) -> u32 {
        clamp_score(i64::from(self.get(merchant)).saturating_add(i64::from(delta)))
    }

    /// Apply a delta and return the new, clamped score.
    pub fn update(&mut self, merchant: MerchantId, delta: i32) -> u32 {
        let old = self.get(merchant);
        let new = self.preview(merchant, delta);
        self.scores.insert(merchant, new);

        let count = self.interactions.entry(merchant).or_insert(0);
        *count = count.saturating_add(1);

        debug!(
            merchant_id = %merchant,
            old_score = old,
            delta = delta,
            new_score = new,
            "relationship updated"
        );
        new
    }

    /// Tier label for a merchant.
    pub fn tier(&self, merchant: MerchantId) -> RelationshipTier {
        RelationshipTier::from_score(self.get(merchant))
    }

    /// How many times this merchant's score has been updated.
    pub fn interaction_count(&self, merchant: MerchantId) -> u64 {
        self.interactions.get(&merchant).copied().unwrap_or(0)
    }

    /// Whether the player has ever dealt with this merchant.
    pub fn knows(&self, merchant: MerchantId) -> bool {
        self.scores.contains_key(&merchant)
    }
}

/// Clamp a raw score into `[RELATIONSHIP_MIN, RELATIONSHIP_MAX]`.
fn clamp_score(raw: i64) -> u32 {
    let clamped = raw.clamp(i64::from(RELATIONSHIP_MIN), i64::from(RELATIONSHIP_MAX));
    u32::try_from(clamped).unwrap_or(RELATIONSHIP_DEFAULT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_contact_is_default() {
        let tracker = RelationshipTracker::new();
        let merchant = MerchantId::new();
        assert_eq!(tracker.get(merchant), RELATIONSHIP_DEFAULT);
        assert!(!tracker.knows(merchant));
        assert_eq!(tracker.tier(merchant), RelationshipTier::Neutral);
    }

    #[test]
    fn update_applies_delta() {
        let mut tracker = RelationshipTracker::new();
        let merchant = MerchantId::new();
        assert_eq!(tracker.update(merchant, 5), 55);
        assert_eq!(tracker.update(merchant, -3), 52);
        assert_eq!(tracker.get(merchant), 52);
        assert_eq!(tracker.interaction_count(merchant), 2);
    }

    #[test]
    fn preview_does_not_mutate() {
        let tracker = RelationshipTracker::new();
        let merchant = MerchantId::new();
        assert_eq!(tracker.preview(merchant, 80), RELATIONSHIP_MAX);
        assert!(!tracker.knows(merchant));
        assert_eq!(tracker.interaction_count(merchant), 0);
    }

    #[test]
    fn extreme_deltas_stay_in_range() {
        let mut tracker = RelationshipTracker::new();
        let merchant = MerchantId::new();
        assert_eq!(tracker.update(merchant, i32::MAX), RELATIONSHIP_MAX);
        assert_eq!(tracker.update(merchant, i32::MAX), RELATIONSHIP_MAX);
        assert_eq!(tracker.update(merchant, i32::MIN), RELATIONSHIP_MIN);
        assert_eq!(tracker.update(merchant, i32::MIN), RELATIONSHIP_MIN);
        assert_eq!(tracker.update(merchant, 1), 1);
    }

    #[test]
    fn every_delta_lands_in_range() {
        let mut tracker = RelationshipTracker::new();
        let merchant = MerchantId::new();
        for delta in (-250..=250).step_by(7) {
            let score = tracker.update(merchant, delta);
            assert!(score <= RELATIONSHIP_MAX);
        }
    }

    #[test]
    fn merchants_are_independent() {
        let mut tracker = RelationshipTracker::new();
        let a = MerchantId::new();
        let b = MerchantId::new();
        tracker.update(a, 30);
        assert_eq!(tracker.get(a), 80);
        assert_eq!(tracker.get(b), RELATIONSHIP_DEFAULT);
        assert_eq!(tracker.tier(a), RelationshipTier::Trusted);
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(RelationshipTier::from_score(0), RelationshipTier::Hostile);
        assert_eq!(RelationshipTier::from_score(19), RelationshipTier::Hostile);
        assert_eq!(RelationshipTier::from_score(20), RelationshipTier::Wary);
        assert_eq!(RelationshipTier::from_score(59), RelationshipTier::Neutral);
        assert_eq!(RelationshipTier::from_score(60), RelationshipTier::Friendly);
        assert_eq!(RelationshipTier::from_score(100), RelationshipTier::Trusted);
    }
}
