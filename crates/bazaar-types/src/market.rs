//! Merchants and the items they trade.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::MerchantId;

// ---------------------------------------------------------------------------
// Personality
// ---------------------------------------------------------------------------

/// Merchant personality tag.
///
/// Drives the tone of generated and fallback dialogue. It has no effect on
/// the price math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Personality {
    /// Warm and talkative, happy to make a deal.
    Friendly,
    /// Calculating, respects a good argument.
    Shrewd,
    /// Cares mostly about the coin.
    Greedy,
    /// Curt and impatient.
    Gruff,
    /// Unpredictable and theatrical.
    Eccentric,
}

impl Personality {
    /// Short prose description used when building oracle prompts.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Friendly => "warm, chatty and glad to see customers",
            Self::Shrewd => "calculating and sharp, respects a well-argued price",
            Self::Greedy => "tight-fisted and always angling for more coin",
            Self::Gruff => "curt, impatient and sparing with words",
            Self::Eccentric => "theatrical and unpredictable, fond of odd turns of phrase",
        }
    }
}

// ---------------------------------------------------------------------------
// Merchant
// ---------------------------------------------------------------------------

/// A non-player merchant the player can buy from or sell to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Merchant {
    /// Unique merchant identifier.
    pub id: MerchantId,
    /// Display name.
    pub name: String,
    /// Languages the merchant speaks. A player fluent in any of them earns
    /// the language discount.
    pub languages: BTreeSet<String>,
    /// Personality tag.
    pub personality: Personality,
    /// How hard the merchant resists haggling, in `[0, 1]`.
    pub haggle_resistance: f64,
}

impl Merchant {
    /// Create a merchant with no spoken languages.
    ///
    /// `haggle_resistance` is clamped into `[0, 1]`; non-finite values
    /// become `0.5`.
    pub fn new(name: impl Into<String>, personality: Personality, haggle_resistance: f64) -> Self {
        let haggle_resistance = if haggle_resistance.is_finite() {
            haggle_resistance.clamp(0.0, 1.0)
        } else {
            0.5
        };
        Self {
            id: MerchantId::new(),
            name: name.into(),
            languages: BTreeSet::new(),
            personality,
            haggle_resistance,
        }
    }

    /// Add spoken languages.
    #[must_use]
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages.extend(languages.into_iter().map(Into::into));
        self
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Item category, used by profession discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ItemCategory {
    /// Swords, bows, and other arms.
    Weapon,
    /// Protective gear.
    Armor,
    /// Potions and tinctures.
    Potion,
    /// Raw herbs and reagents.
    Herb,
    /// Food and drink.
    Food,
    /// Ore, timber, cloth, and other crafting stock.
    Material,
    /// Rings, amulets, and gems.
    Jewelry,
    /// Work tools.
    Tool,
    /// Books and scrolls.
    Book,
    /// Anything else.
    Misc,
}

/// Item rarity tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Rarity {
    /// Found everywhere.
    Common,
    /// A little harder to come by.
    Uncommon,
    /// Seldom seen.
    Rare,
    /// Seen once in a long while.
    Epic,
    /// One of a kind.
    Legendary,
}

/// A tradeable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Item {
    /// Display name, also the inventory key.
    pub name: String,
    /// List price before any modifiers. Always greater than zero.
    pub base_price: u32,
    /// Categories the item belongs to.
    pub categories: BTreeSet<ItemCategory>,
    /// Rarity tag.
    pub rarity: Rarity,
}

impl Item {
    /// Create an item. Returns `None` when `base_price` is zero.
    pub fn new(
        name: impl Into<String>,
        base_price: u32,
        categories: impl IntoIterator<Item = ItemCategory>,
        rarity: Rarity,
    ) -> Option<Self> {
        if base_price == 0 {
            return None;
        }
        Some(Self {
            name: name.into(),
            base_price,
            categories: categories.into_iter().collect(),
            rarity,
        })
    }

    /// The base price with the `> 0` invariant re-applied.
    ///
    /// Items that arrive through deserialization bypass [`Item::new`], so
    /// pricing code reads the price through this accessor.
    pub fn checked_base_price(&self) -> u32 {
        self.base_price.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_rejects_zero_price() {
        assert!(Item::new("Dust", 0, [ItemCategory::Misc], Rarity::Common).is_none());
        let item = Item::new("Rope", 4, [ItemCategory::Tool], Rarity::Common);
        assert_eq!(item.map(|i| i.base_price), Some(4));
    }

    #[test]
    fn deserialized_zero_price_is_floored() {
        let item: Item = serde_json::from_value(serde_json::json!({
            "name": "Broken",
            "base_price": 0,
            "categories": [],
            "rarity": "Common"
        }))
        .unwrap_or_else(|_| Item {
            name: String::new(),
            base_price: 0,
            categories: BTreeSet::new(),
            rarity: Rarity::Common,
        });
        assert_eq!(item.checked_base_price(), 1);
    }

    #[test]
    fn merchant_resistance_is_clamped() {
        let resistance = |r: f64| Merchant::new("A", Personality::Gruff, r).haggle_resistance;
        assert!((resistance(3.0) - 1.0).abs() < f64::EPSILON);
        assert!(resistance(-1.0).abs() < f64::EPSILON);
        assert!((resistance(f64::NAN) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn merchant_languages_accumulate() {
        let m = Merchant::new("Ysolde", Personality::Friendly, 0.2)
            .with_languages(["Elvish", "Dwarvish"]);
        assert!(m.languages.contains("Elvish"));
        assert_eq!(m.languages.len(), 2);
    }
}
