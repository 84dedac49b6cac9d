//! Transaction records and their validated construction.
//!
//! A [`TransactionRecord`] is the immutable receipt of one settled purchase
//! or sale. Records are only produced by [`TransactionBuilder::build`], which
//! rejects missing fields and zero prices before anything is appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_types::{MerchantId, TransactionId};

use crate::LedgerError;

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Direction of a settled trade, from the player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// The player bought an item from a merchant.
    Purchase,
    /// The player sold an item to a merchant.
    Sale,
}

impl TransactionKind {
    /// Lowercase label for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Sale => "sale",
        }
    }
}

/// Receipt of one settled trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique record ID.
    pub id: TransactionId,
    /// Purchase or sale.
    pub kind: TransactionKind,
    /// Counterparty.
    pub merchant: MerchantId,
    /// Inventory key of the item that changed hands.
    pub item: String,
    /// Gold that changed hands. Always positive.
    pub price: u32,
    /// The engine's fair price at the time of the trade.
    pub fair_price: u32,
    /// Relationship score with the merchant once the trade is applied.
    pub relationship_after: u32,
    /// When the trade settled.
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`TransactionRecord`] values.
///
/// # Examples
///
/// ```
/// use bazaar_ledger::{TransactionBuilder, TransactionKind};
/// use bazaar_types::MerchantId;
///
/// let record = TransactionBuilder::new(TransactionKind::Sale)
///     .merchant(MerchantId::new())
///     .item("Silk Scarf")
///     .price(35)
///     .fair_price(40)
///     .relationship_after(53)
///     .build();
///
/// assert!(record.is_ok());
/// ```
#[derive(Debug)]
pub struct TransactionBuilder {
    kind: TransactionKind,
    merchant: Option<MerchantId>,
    item: Option<String>,
    price: Option<u32>,
    fair_price: Option<u32>,
    relationship_after: Option<u32>,
}

impl TransactionBuilder {
    /// Start a record of the given kind.
    pub const fn new(kind: TransactionKind) -> Self {
        Self {
            kind,
            merchant: None,
            item: None,
            price: None,
            fair_price: None,
            relationship_after: None,
        }
    }

    /// Set the counterparty.
    #[must_use]
    pub const fn merchant(mut self, merchant: MerchantId) -> Self {
        self.merchant = Some(merchant);
        self
    }

    /// Set the item key.
    #[must_use]
    pub fn item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    /// Set the settled price.
    #[must_use]
    pub const fn price(mut self, price: u32) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the fair price. Defaults to the settled price.
    #[must_use]
    pub const fn fair_price(mut self, fair_price: u32) -> Self {
        self.fair_price = Some(fair_price);
        self
    }

    /// Set the post-trade relationship score.
    #[must_use]
    pub const fn relationship_after(mut self, score: u32) -> Self {
        self.relationship_after = Some(score);
        self
    }

    /// Validate and produce the record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingField`] if the merchant, item, price, or
    /// relationship score was not set, [`LedgerError::EmptyItem`] for a blank
    /// item key, and [`LedgerError::ZeroPrice`] for a zero price.
    pub fn build(self) -> Result<TransactionRecord, LedgerError> {
        let merchant = self.merchant.ok_or(LedgerError::MissingField("merchant"))?;
        let item = self.item.ok_or(LedgerError::MissingField("item"))?;
        let price = self.price.ok_or(LedgerError::MissingField("price"))?;
        let relationship_after = self
            .relationship_after
            .ok_or(LedgerError::MissingField("relationship_after"))?;

        if item.trim().is_empty() {
            return Err(LedgerError::EmptyItem);
        }
        if price == 0 {
            return Err(LedgerError::ZeroPrice);
        }

        Ok(TransactionRecord {
            id: TransactionId::new(),
            kind: self.kind,
            merchant,
            item,
            price,
            fair_price: self.fair_price.unwrap_or(price),
            relationship_after,
            recorded_at: Utc::now(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn complete(kind: TransactionKind) -> TransactionBuilder {
        TransactionBuilder::new(kind)
            .merchant(MerchantId::new())
            .item("Rope")
            .price(4)
            .relationship_after(50)
    }

    #[test]
    fn builds_complete_record() {
        let record = complete(TransactionKind::Purchase).build().unwrap();
        assert_eq!(record.kind, TransactionKind::Purchase);
        assert_eq!(record.item, "Rope");
        assert_eq!(record.price, 4);
        assert_eq!(record.fair_price, 4);
    }

    #[test]
    fn zero_price_rejected() {
        let result = complete(TransactionKind::Sale).price(0).build();
        assert_eq!(result, Err(LedgerError::ZeroPrice));
    }

    #[test]
    fn blank_item_rejected() {
        let result = complete(TransactionKind::Sale).item("  ").build();
        assert_eq!(result, Err(LedgerError::EmptyItem));
    }

    #[test]
    fn missing_merchant_rejected() {
        let result = TransactionBuilder::new(TransactionKind::Sale)
            .item("Rope")
            .price(4)
            .relationship_after(50)
            .build();
        assert_eq!(result, Err(LedgerError::MissingField("merchant")));
    }

    #[test]
    fn record_serializes() {
        let record = complete(TransactionKind::Sale).fair_price(5).build().unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "Sale");
        assert_eq!(json["fair_price"], 5);
    }
}
