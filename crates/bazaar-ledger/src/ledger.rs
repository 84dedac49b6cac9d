//! One player's purse and pack.
//!
//! [`PlayerLedger`] owns the player's gold, their item stock, and the
//! append-only list of [`TransactionRecord`]s that explain every change
//! since the ledger was opened.
//!
//! Every mutating method validates all preconditions first and only then
//! touches state, so a failed purchase or sale leaves the ledger exactly as
//! it was. All arithmetic is checked.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use bazaar_types::{MerchantId, PlayerId};

use crate::reconcile::{ReconcileResult, reconcile};
use crate::transaction::{TransactionBuilder, TransactionKind, TransactionRecord};
use crate::LedgerError;

// ---------------------------------------------------------------------------
// Settlement parameters
// ---------------------------------------------------------------------------

/// Everything needed to settle one trade.
///
/// Packs the trade details into one struct so purchase and sale share a
/// call shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// Counterparty.
    pub merchant: MerchantId,
    /// Inventory key of the item.
    pub item: String,
    /// Gold changing hands.
    pub price: u32,
    /// Fair price at the time of the trade.
    pub fair_price: u32,
    /// Relationship score once the trade is applied.
    pub relationship_after: u32,
}

// ---------------------------------------------------------------------------
// WealthLedger
// ---------------------------------------------------------------------------

/// The wealth and inventory store the trading engine settles against.
///
/// [`PlayerLedger`] is the in-memory implementation. A game with its own
/// save system implements this trait over that store instead; the contract
/// is that `purchase` and `sale` are all-or-nothing.
pub trait WealthLedger: Send {
    /// Gold on hand.
    fn gold(&self) -> u64;

    /// Units of an item on hand.
    fn stock_of(&self, item: &str) -> u32;

    /// Debit gold and add one unit of the item.
    fn purchase(&mut self, settlement: Settlement) -> Result<TransactionRecord, LedgerError>;

    /// Remove one unit of the item and credit gold.
    fn sale(&mut self, settlement: Settlement) -> Result<TransactionRecord, LedgerError>;
}

// ---------------------------------------------------------------------------
// PlayerLedger
// ---------------------------------------------------------------------------

/// In-memory gold, stock, and transaction history for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLedger {
    /// Owner.
    player: PlayerId,
    /// Gold on hand.
    gold: u64,
    /// Units on hand per item key.
    stock: BTreeMap<String, u32>,
    /// Gold when the ledger was opened.
    opening_gold: u64,
    /// Stock when the ledger was opened.
    opening_stock: BTreeMap<String, u32>,
    /// Settled trades, oldest first.
    records: Vec<TransactionRecord>,
}

impl PlayerLedger {
    /// Open a ledger with a starting purse and no items.
    pub const fn new(player: PlayerId, gold: u64) -> Self {
        Self {
            player,
            gold,
            stock: BTreeMap::new(),
            opening_gold: gold,
            opening_stock: BTreeMap::new(),
            records: Vec::new(),
        }
    }

    /// Open a ledger with a starting purse and stock.
    pub fn with_stock<I, S>(player: PlayerId, gold: u64, stock: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let stock: BTreeMap<String, u32> = stock
            .into_iter()
            .filter(|(_, qty)| *qty > 0)
            .map(|(item, qty)| (item.into(), qty))
            .collect();
        Self {
            player,
            gold,
            opening_gold: gold,
            opening_stock: stock.clone(),
            stock,
            records: Vec::new(),
        }
    }

    /// The owning player.
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// Everything on hand, by item key.
    pub const fn stock(&self) -> &BTreeMap<String, u32> {
        &self.stock
    }

    /// All settled trades, oldest first.
    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    /// Whether the player can pay `price`.
    pub fn can_afford(&self, price: u32) -> bool {
        self.gold >= u64::from(price)
    }

    /// Check the current balances against the opening balances plus every
    /// recorded trade.
    pub fn reconcile(&self) -> ReconcileResult {
        let result = reconcile(
            self.opening_gold,
            &self.opening_stock,
            self.gold,
            &self.stock,
            &self.records,
        );
        if let ReconcileResult::Discrepancy(ref d) = result {
            warn!(player_id = %self.player, discrepancy = %d, "ledger does not reconcile");
        }
        result
    }

    fn settle(
        &mut self,
        kind: TransactionKind,
        settlement: Settlement,
    ) -> Result<TransactionRecord, LedgerError> {
        if settlement.price == 0 {
            return Err(LedgerError::ZeroPrice);
        }
        let price = u64::from(settlement.price);
        let on_hand = self.stock_of(&settlement.item);

        // Compute the post-trade balances before mutating anything.
        let (gold, units) = match kind {
            TransactionKind::Purchase => {
                let gold = self.gold.checked_sub(price).ok_or(LedgerError::InsufficientFunds {
                    price: settlement.price,
                    available: self.gold,
                })?;
                let units = on_hand.checked_add(1).ok_or(LedgerError::Overflow)?;
                (gold, units)
            }
            TransactionKind::Sale => {
                let units = on_hand.checked_sub(1).ok_or_else(|| LedgerError::InsufficientStock {
                    item: settlement.item.clone(),
                })?;
                let gold = self.gold.checked_add(price).ok_or(LedgerError::Overflow)?;
                (gold, units)
            }
        };

        let record = TransactionBuilder::new(kind)
            .merchant(settlement.merchant)
            .item(settlement.item)
            .price(settlement.price)
            .fair_price(settlement.fair_price)
            .relationship_after(settlement.relationship_after)
            .build()?;

        self.gold = gold;
        if units == 0 {
            self.stock.remove(&record.item);
        } else {
            self.stock.insert(record.item.clone(), units);
        }
        self.records.push(record.clone());

        debug!(
            player_id = %self.player,
            merchant_id = %record.merchant,
            kind = record.kind.as_str(),
            item = %record.item,
            price = record.price,
            gold = self.gold,
            "trade settled"
        );
        Ok(record)
    }
}

impl WealthLedger for PlayerLedger {
    fn gold(&self) -> u64 {
        self.gold
    }

    fn stock_of(&self, item: &str) -> u32 {
        self.stock.get(item).copied().unwrap_or(0)
    }

    fn purchase(&mut self, settlement: Settlement) -> Result<TransactionRecord, LedgerError> {
        self.settle(TransactionKind::Purchase, settlement)
    }

    fn sale(&mut self, settlement: Settlement) -> Result<TransactionRecord, LedgerError> {
        self.settle(TransactionKind::Sale, settlement)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn settlement(item: &str, price: u32) -> Settlement {
        Settlement {
            merchant: MerchantId::new(),
            item: item.to_owned(),
            price,
            fair_price: price,
            relationship_after: 50,
        }
    }

    #[test]
    fn purchase_moves_gold_and_stock() {
        let mut ledger = PlayerLedger::new(PlayerId::new(), 100);
        let record = ledger.purchase(settlement("Rope", 30)).unwrap();

        assert_eq!(record.kind, TransactionKind::Purchase);
        assert_eq!(ledger.gold(), 70);
        assert_eq!(ledger.stock_of("Rope"), 1);
        assert_eq!(ledger.records().len(), 1);
    }

    #[test]
    fn sale_moves_gold_and_stock() {
        let mut ledger = PlayerLedger::with_stock(PlayerId::new(), 10, [("Scarf", 2)]);
        ledger.sale(settlement("Scarf", 35)).unwrap();

        assert_eq!(ledger.gold(), 45);
        assert_eq!(ledger.stock_of("Scarf"), 1);
    }

    #[test]
    fn selling_last_unit_removes_key() {
        let mut ledger = PlayerLedger::with_stock(PlayerId::new(), 0, [("Scarf", 1)]);
        ledger.sale(settlement("Scarf", 5)).unwrap();
        assert!(!ledger.stock().contains_key("Scarf"));
    }

    #[test]
    fn insufficient_funds_changes_nothing() {
        let mut ledger = PlayerLedger::new(PlayerId::new(), 20);
        let before = ledger.clone();

        let result = ledger.purchase(settlement("Lantern", 21));
        assert_eq!(
            result,
            Err(LedgerError::InsufficientFunds {
                price: 21,
                available: 20
            })
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn insufficient_stock_changes_nothing() {
        let mut ledger = PlayerLedger::new(PlayerId::new(), 20);
        let before = ledger.clone();

        let result = ledger.sale(settlement("Ghost", 5));
        assert_eq!(
            result,
            Err(LedgerError::InsufficientStock {
                item: "Ghost".to_owned()
            })
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn zero_price_rejected_both_ways() {
        let mut ledger = PlayerLedger::with_stock(PlayerId::new(), 20, [("Rope", 1)]);
        assert_eq!(ledger.purchase(settlement("Rope", 0)), Err(LedgerError::ZeroPrice));
        assert_eq!(ledger.sale(settlement("Rope", 0)), Err(LedgerError::ZeroPrice));
        assert!(ledger.records().is_empty());
    }

    #[test]
    fn gold_overflow_is_an_error() {
        let mut ledger = PlayerLedger::with_stock(PlayerId::new(), u64::MAX, [("Rope", 1)]);
        let before = ledger.clone();
        assert_eq!(ledger.sale(settlement("Rope", 1)), Err(LedgerError::Overflow));
        assert_eq!(ledger, before);
    }

    #[test]
    fn exact_purse_can_be_spent() {
        let mut ledger = PlayerLedger::new(PlayerId::new(), 25);
        assert!(ledger.can_afford(25));
        assert!(!ledger.can_afford(26));
        ledger.purchase(settlement("Rope", 25)).unwrap();
        assert_eq!(ledger.gold(), 0);
    }

    #[test]
    fn history_reconciles() {
        let mut ledger = PlayerLedger::with_stock(PlayerId::new(), 100, [("Scarf", 1)]);
        ledger.purchase(settlement("Rope", 10)).unwrap();
        ledger.sale(settlement("Scarf", 40)).unwrap();
        ledger.purchase(settlement("Rope", 12)).unwrap();

        assert_eq!(ledger.gold(), 118);
        assert_eq!(ledger.reconcile(), ReconcileResult::Balanced);
    }
}
