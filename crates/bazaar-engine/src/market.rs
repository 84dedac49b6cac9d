//! Market haggling: name a price, one roll, done.
//!
//! Preconditions are checked before the roll so a refused request leaves
//! every balance untouched. A successful haggle buys the item and improves
//! rapport as one step; a failed one only costs rapport.

use rand::Rng;
use tracing::debug;

use bazaar_ledger::{Settlement, TransactionRecord, WealthLedger};
use bazaar_pricing::{HaggleOutcome, HaggleRequest, HaggleResolver, RelationshipTracker};
use bazaar_types::{Item, Merchant};

use crate::error::EngineError;

/// A haggle the player wants to make.
#[derive(Debug, Clone, Copy)]
pub struct MarketOffer<'a> {
    /// The merchant selling.
    pub merchant: &'a Merchant,
    /// The item on offer.
    pub item: &'a Item,
    /// Price the player names.
    pub offered_price: u32,
    /// The quoted fair price.
    pub fair_price: u32,
    /// Player bargaining level.
    pub bargaining_level: u32,
}

/// What a haggle did.
#[derive(Debug, Clone, PartialEq)]
pub struct HaggleReceipt {
    /// The roll and its parameters.
    pub outcome: HaggleOutcome,
    /// Relationship score after the update.
    pub relationship_score: u32,
    /// Receipt of the purchase when the haggle succeeded.
    pub record: Option<TransactionRecord>,
}

/// Haggle for an item in a market.
///
/// # Errors
///
/// - [`EngineError::InvalidProposal`] for an offer of zero
/// - [`EngineError::InsufficientFunds`] when the player cannot pay the offer
/// - [`EngineError::Settlement`] if the ledger refuses the purchase; rapport
///   is not changed in that case
pub fn haggle<L>(
    resolver: &HaggleResolver,
    offer: &MarketOffer<'_>,
    tracker: &mut RelationshipTracker,
    ledger: &mut L,
    rng: &mut impl Rng,
) -> Result<HaggleReceipt, EngineError>
where
    L: WealthLedger + ?Sized,
{
    if offer.offered_price == 0 {
        return Err(EngineError::InvalidProposal {
            price: offer.offered_price,
        });
    }
    let available = ledger.gold();
    if available < u64::from(offer.offered_price) {
        return Err(EngineError::InsufficientFunds {
            price: offer.offered_price,
            available,
        });
    }

    let merchant_id = offer.merchant.id;
    let request = HaggleRequest {
        offered_price: offer.offered_price,
        fair_price: offer.fair_price,
        bargaining_level: offer.bargaining_level,
        relationship_score: tracker.get(merchant_id),
    };
    let outcome = resolver.resolve(&request, rng)?;

    let record = match outcome.final_price {
        Some(price) => Some(ledger.purchase(Settlement {
            merchant: merchant_id,
            item: offer.item.name.clone(),
            price,
            fair_price: offer.fair_price,
            relationship_after: tracker.preview(merchant_id, outcome.relationship_delta),
        })?),
        None => None,
    };
    let relationship_score = tracker.update(merchant_id, outcome.relationship_delta);

    debug!(
        merchant_id = %merchant_id,
        item = %offer.item.name,
        offered_price = offer.offered_price,
        fair_price = offer.fair_price,
        chance = outcome.success_chance,
        success = outcome.success,
        "haggle resolved"
    );

    Ok(HaggleReceipt {
        outcome,
        relationship_score,
        record,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_ledger::PlayerLedger;
    use bazaar_types::{ItemCategory, Personality, PlayerId, Rarity};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn merchant() -> Merchant {
        Merchant::new("Hassan", Personality::Greedy, 0.6)
    }

    fn item() -> Item {
        Item::new("Silk Scarf", 40, [ItemCategory::Misc], Rarity::Uncommon).unwrap()
    }

    #[test]
    fn sure_thing_buys_the_item() {
        let merchant = merchant();
        let item = item();
        let mut tracker = RelationshipTracker::new();
        let mut ledger = PlayerLedger::new(PlayerId::new(), 100);
        let mut rng = SmallRng::seed_from_u64(42);

        // 0.5 + 0.3 + 0.0 + 0.2 clamps to 1.0.
        let offer = MarketOffer {
            merchant: &merchant,
            item: &item,
            offered_price: 40,
            fair_price: 40,
            bargaining_level: 3,
        };
        let resolver = HaggleResolver::default();
        let receipt = haggle(&resolver, &offer, &mut tracker, &mut ledger, &mut rng).unwrap();

        assert!(receipt.outcome.success);
        assert_eq!(receipt.relationship_score, 55);
        assert_eq!(receipt.record.as_ref().map(|r| r.price), Some(40));
        assert_eq!(receipt.record.as_ref().map(|r| r.relationship_after), Some(55));
        assert_eq!(ledger.gold(), 60);
        assert_eq!(ledger.stock_of("Silk Scarf"), 1);
    }

    #[test]
    fn hopeless_offer_costs_rapport_only() {
        let merchant = merchant();
        let item = item();
        let mut tracker = RelationshipTracker::new();
        tracker.update(merchant.id, -50);
        let mut ledger = PlayerLedger::new(PlayerId::new(), 100);
        let mut rng = SmallRng::seed_from_u64(42);

        // 0.5 + 0.0 - 0.25 - 0.3 clamps to 0.0.
        let offer = MarketOffer {
            merchant: &merchant,
            item: &item,
            offered_price: 10,
            fair_price: 40,
            bargaining_level: 0,
        };
        let resolver = HaggleResolver::default();
        let receipt = haggle(&resolver, &offer, &mut tracker, &mut ledger, &mut rng).unwrap();

        assert!(!receipt.outcome.success);
        assert_eq!(receipt.outcome.fair_price, 40);
        assert!(receipt.record.is_none());
        assert_eq!(receipt.relationship_score, 0);
        assert_eq!(ledger.gold(), 100);
    }

    #[test]
    fn unaffordable_offer_is_refused_up_front() {
        let merchant = merchant();
        let item = item();
        let mut tracker = RelationshipTracker::new();
        let mut ledger = PlayerLedger::new(PlayerId::new(), 15);
        let mut rng = SmallRng::seed_from_u64(1);

        let offer = MarketOffer {
            merchant: &merchant,
            item: &item,
            offered_price: 30,
            fair_price: 40,
            bargaining_level: 5,
        };
        let resolver = HaggleResolver::default();
        let result = haggle(&resolver, &offer, &mut tracker, &mut ledger, &mut rng);

        assert!(matches!(
            result,
            Err(EngineError::InsufficientFunds {
                price: 30,
                available: 15
            })
        ));
        assert!(!tracker.knows(merchant.id));
    }

    #[test]
    fn zero_offer_is_invalid() {
        let merchant = merchant();
        let item = item();
        let offer = MarketOffer {
            merchant: &merchant,
            item: &item,
            offered_price: 0,
            fair_price: 40,
            bargaining_level: 0,
        };
        let result = haggle(
            &HaggleResolver::default(),
            &offer,
            &mut RelationshipTracker::new(),
            &mut PlayerLedger::new(PlayerId::new(), 100),
            &mut SmallRng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(EngineError::InvalidProposal { price: 0 })));
    }

    #[test]
    fn same_seed_same_haggle() {
        let merchant = merchant();
        let item = item();
        let offer = MarketOffer {
            merchant: &merchant,
            item: &item,
            offered_price: 33,
            fair_price: 40,
            bargaining_level: 1,
        };
        let run = |seed| {
            let mut ledger = PlayerLedger::new(PlayerId::new(), 100);
            haggle(
                &HaggleResolver::default(),
                &offer,
                &mut RelationshipTracker::new(),
                &mut ledger,
                &mut SmallRng::seed_from_u64(seed),
            )
            .map(|r| r.outcome.success)
            .ok()
        };
        for seed in 0..32 {
            assert_eq!(run(seed), run(seed));
        }
    }
}
