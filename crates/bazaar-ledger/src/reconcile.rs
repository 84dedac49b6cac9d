//! Replay verification for a player ledger.
//!
//! Gold and stock are never created or destroyed outside a recorded trade:
//!
//! ```text
//! gold  == opening_gold  - sum(purchase prices) + sum(sale prices)
//! stock == opening_stock + purchases per item   - sales per item
//! ```
//!
//! Holds by construction for a [`PlayerLedger`](crate::PlayerLedger). The
//! check catches corruption in ledgers restored from a save file.

use std::collections::{BTreeMap, BTreeSet};

use crate::transaction::{TransactionKind, TransactionRecord};

/// Outcome of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileResult {
    /// Balances match the replayed history.
    Balanced,
    /// Balances and history disagree.
    Discrepancy(LedgerDiscrepancy),
}

/// Where a ledger fails to reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerDiscrepancy {
    /// Gold implied by the history, `None` if the replay over- or underflowed.
    pub expected_gold: Option<u64>,
    /// Gold actually held.
    pub actual_gold: u64,
    /// Items whose stock disagrees: `(expected, actual)`.
    pub stock: BTreeMap<String, (Option<u32>, u32)>,
}

impl std::fmt::Display for LedgerDiscrepancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "gold expected {:?} actual {}, {} item(s) out of balance",
            self.expected_gold,
            self.actual_gold,
            self.stock.len()
        )
    }
}

/// Replay `records` over the opening balances and compare.
pub fn reconcile(
    opening_gold: u64,
    opening_stock: &BTreeMap<String, u32>,
    gold: u64,
    stock: &BTreeMap<String, u32>,
    records: &[TransactionRecord],
) -> ReconcileResult {
    let mut expected_gold = Some(opening_gold);
    let mut expected_stock: BTreeMap<&str, Option<u32>> = opening_stock
        .iter()
        .map(|(item, qty)| (item.as_str(), Some(*qty)))
        .collect();

    for record in records {
        let price = u64::from(record.price);
        let units = expected_stock.entry(record.item.as_str()).or_insert(Some(0));
        match record.kind {
            TransactionKind::Purchase => {
                expected_gold = expected_gold.and_then(|g| g.checked_sub(price));
                *units = units.and_then(|u| u.checked_add(1));
            }
            TransactionKind::Sale => {
                expected_gold = expected_gold.and_then(|g| g.checked_add(price));
                *units = units.and_then(|u| u.checked_sub(1));
            }
        }
    }

    let items: BTreeSet<&str> = expected_stock
        .keys()
        .copied()
        .chain(stock.keys().map(String::as_str))
        .collect();

    let mut mismatched = BTreeMap::new();
    for item in items {
        let expected = expected_stock.get(item).copied().unwrap_or(Some(0));
        let actual = stock.get(item).copied().unwrap_or(0);
        if expected != Some(actual) {
            mismatched.insert(item.to_owned(), (expected, actual));
        }
    }

    if expected_gold == Some(gold) && mismatched.is_empty() {
        ReconcileResult::Balanced
    } else {
        ReconcileResult::Discrepancy(LedgerDiscrepancy {
            expected_gold,
            actual_gold: gold,
            stock: mismatched,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_types::MerchantId;

    use super::*;
    use crate::transaction::TransactionBuilder;

    fn record(kind: TransactionKind, item: &str, price: u32) -> TransactionRecord {
        TransactionBuilder::new(kind)
            .merchant(MerchantId::new())
            .item(item)
            .price(price)
            .relationship_after(50)
            .build()
            .unwrap()
    }

    #[test]
    fn empty_history_balances() {
        let stock = BTreeMap::from([("Rope".to_owned(), 2)]);
        assert_eq!(reconcile(10, &stock, 10, &stock, &[]), ReconcileResult::Balanced);
    }

    #[test]
    fn tampered_gold_is_detected() {
        let records = [record(TransactionKind::Purchase, "Rope", 4)];
        let stock = BTreeMap::from([("Rope".to_owned(), 1)]);
        let result = reconcile(10, &BTreeMap::new(), 9, &stock, &records);

        let ReconcileResult::Discrepancy(d) = result else {
            panic!("expected discrepancy");
        };
        assert_eq!(d.expected_gold, Some(6));
        assert_eq!(d.actual_gold, 9);
        assert!(d.stock.is_empty());
    }

    #[test]
    fn phantom_item_is_detected() {
        let stock = BTreeMap::from([("Crown".to_owned(), 1)]);
        let result = reconcile(10, &BTreeMap::new(), 10, &stock, &[]);

        let ReconcileResult::Discrepancy(d) = result else {
            panic!("expected discrepancy");
        };
        assert_eq!(d.stock.get("Crown"), Some(&(Some(0), 1)));
    }

    #[test]
    fn selling_unowned_item_underflows() {
        let records = [record(TransactionKind::Sale, "Ghost", 4)];
        let result = reconcile(0, &BTreeMap::new(), 4, &BTreeMap::new(), &records);
        let ReconcileResult::Discrepancy(d) = result else {
            panic!("expected discrepancy");
        };
        assert_eq!(d.stock.get("Ghost"), Some(&(None, 0)));
    }
}
