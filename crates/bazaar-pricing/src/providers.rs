//! Contracts for the reputation and profession subsystems.
//!
//! Both subsystems live outside the pricing engine. The composer only needs
//! a reputation-to-multiplier curve and a profession discount lookup, so
//! each is a small trait with a default table implementation. Closures
//! implement both traits, which keeps tests short.
//!
//! Provider output is untrusted: [`sanitize_multiplier`] and
//! [`sanitize_discount`] repair non-finite or out-of-domain values before
//! they reach any price math.

use std::collections::BTreeSet;

use bazaar_types::ItemCategory;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Maps a faction reputation score in `[0, 100]` to a price multiplier.
///
/// Implementations should be monotone: higher reputation never raises the
/// multiplier.
pub trait ReputationProvider: Send + Sync {
    /// Price multiplier for a reputation score. Must be positive.
    fn price_modifier(&self, score: u32) -> f64;
}

/// Looks up the discount a profession grants for a set of item categories.
pub trait ProfessionDiscountProvider: Send + Sync {
    /// Discount fraction (`>= 0`) for a profession at a level.
    fn discount(&self, profession: &str, level: u32, categories: &BTreeSet<ItemCategory>) -> f64;
}

impl<F> ReputationProvider for F
where
    F: Fn(u32) -> f64 + Send + Sync,
{
    fn price_modifier(&self, score: u32) -> f64 {
        self(score)
    }
}

impl<F> ProfessionDiscountProvider for F
where
    F: Fn(&str, u32, &BTreeSet<ItemCategory>) -> f64 + Send + Sync,
{
    fn discount(&self, profession: &str, level: u32, categories: &BTreeSet<ItemCategory>) -> f64 {
        self(profession, level, categories)
    }
}

// ---------------------------------------------------------------------------
// Reputation implementations
// ---------------------------------------------------------------------------

/// Reputation that never changes the price.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralReputation;

impl ReputationProvider for NeutralReputation {
    fn price_modifier(&self, _score: u32) -> f64 {
        1.0
    }
}

/// Step table from reputation score to multiplier.
///
/// | Score   | Multiplier |
/// |---------|------------|
/// | 0-19    | 1.25       |
/// | 20-39   | 1.10       |
/// | 40-59   | 1.00       |
/// | 60-79   | 0.95       |
/// | 80-100  | 0.90       |
#[derive(Debug, Clone, Copy, Default)]
pub struct TieredReputation;

impl ReputationProvider for TieredReputation {
    fn price_modifier(&self, score: u32) -> f64 {
        match score {
            0..=19 => 1.25,
            20..=39 => 1.10,
            40..=59 => 1.00,
            60..=79 => 0.95,
            _ => 0.90,
        }
    }
}

// ---------------------------------------------------------------------------
// Profession implementations
// ---------------------------------------------------------------------------

/// No profession discounts at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProfessionDiscount;

impl ProfessionDiscountProvider for NoProfessionDiscount {
    fn discount(
        &self,
        _profession: &str,
        _level: u32,
        _categories: &BTreeSet<ItemCategory>,
    ) -> f64 {
        0.0
    }
}

/// One row of a [`ProfessionTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProfessionDiscount {
    /// Profession identifier, matched case-insensitively.
    pub profession: String,
    /// Categories the discount applies to. Empty means every category.
    pub categories: BTreeSet<ItemCategory>,
    /// Discount per profession level.
    pub per_level: f64,
    /// Maximum discount from this row.
    pub cap: f64,
}

/// Data-driven profession discount table.
///
/// The first matching row wins. A row matches when the profession name
/// matches and the item shares at least one category with the row.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfessionTable {
    rows: Vec<ProfessionDiscount>,
}

impl ProfessionTable {
    /// Build a table from rows.
    pub const fn new(rows: Vec<ProfessionDiscount>) -> Self {
        Self { rows }
    }

    /// Rows in lookup order.
    pub fn rows(&self) -> &[ProfessionDiscount] {
        &self.rows
    }
}

impl Default for ProfessionTable {
    fn default() -> Self {
        let row = |profession: &str, categories: &[ItemCategory], per_level: f64, cap: f64| {
            ProfessionDiscount {
                profession: profession.to_owned(),
                categories: categories.iter().copied().collect(),
                per_level,
                cap,
            }
        };
        Self::new(vec![
            row("merchant", &[], 0.02, 0.10),
            row("alchemist", &[ItemCategory::Potion, ItemCategory::Herb], 0.03, 0.15),
            row(
                "blacksmith",
                &[
                    ItemCategory::Weapon,
                    ItemCategory::Armor,
                    ItemCategory::Tool,
                    ItemCategory::Material,
                ],
                0.03,
                0.15,
            ),
            row("jeweler", &[ItemCategory::Jewelry], 0.04, 0.20),
            row("scholar", &[ItemCategory::Book], 0.04, 0.20),
        ])
    }
}

impl ProfessionDiscountProvider for ProfessionTable {
    fn discount(&self, profession: &str, level: u32, categories: &BTreeSet<ItemCategory>) -> f64 {
        self.rows
            .iter()
            .find(|row| {
                row.profession.eq_ignore_ascii_case(profession)
                    && (row.categories.is_empty() || !row.categories.is_disjoint(categories))
            })
            .map_or(0.0, |row| (row.per_level * f64::from(level)).min(row.cap))
    }
}

// ---------------------------------------------------------------------------
// Sanitizers
// ---------------------------------------------------------------------------

/// Replace a non-finite or non-positive multiplier with `1.0`.
pub fn sanitize_multiplier(multiplier: f64) -> f64 {
    if multiplier.is_finite() && multiplier > 0.0 {
        multiplier
    } else {
        1.0
    }
}

/// Replace a non-finite or negative discount with `0.0`.
pub fn sanitize_discount(discount: f64) -> f64 {
    if discount.is_finite() && discount > 0.0 {
        discount
    } else {
        0.0
    }
}
