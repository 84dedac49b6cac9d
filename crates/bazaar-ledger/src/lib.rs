//! Player wealth and inventory ledger for the Bazaar engine.
//!
//! Gold and items only ever move through a settled trade. Each trade is
//! validated in full before any balance changes, and leaves behind an
//! append-only [`TransactionRecord`].
//!
//! # Modules
//!
//! - [`ledger`] -- [`PlayerLedger`] and the [`WealthLedger`] trait the engine settles against
//! - [`transaction`] -- [`TransactionRecord`] and its validating [`TransactionBuilder`]
//! - [`reconcile`] -- Replays history against the current balances
//!
//! # Usage
//!
//! ```
//! use bazaar_ledger::{PlayerLedger, ReconcileResult, Settlement, WealthLedger};
//! use bazaar_types::{MerchantId, PlayerId};
//!
//! let mut ledger = PlayerLedger::with_stock(PlayerId::new(), 50, [("Silk Scarf", 1)]);
//!
//! let sold = ledger.sale(Settlement {
//!     merchant: MerchantId::new(),
//!     item: "Silk Scarf".to_owned(),
//!     price: 35,
//!     fair_price: 40,
//!     relationship_after: 53,
//! });
//!
//! assert!(sold.is_ok());
//! assert_eq!(ledger.gold(), 85);
//! assert_eq!(ledger.reconcile(), ReconcileResult::Balanced);
//! ```

pub mod ledger;
pub mod reconcile;
pub mod transaction;

pub use ledger::{PlayerLedger, Settlement, WealthLedger};
pub use reconcile::{LedgerDiscrepancy, ReconcileResult};
pub use transaction::{TransactionBuilder, TransactionKind, TransactionRecord};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when settling a trade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The player cannot pay.
    #[error("insufficient funds: price {price}, available {available}")]
    InsufficientFunds {
        /// Gold required.
        price: u32,
        /// Gold on hand.
        available: u64,
    },

    /// The player has none of the item to sell.
    #[error("no {item} in stock")]
    InsufficientStock {
        /// The missing item.
        item: String,
    },

    /// Trades must move at least one gold.
    #[error("trade price must be non-zero")]
    ZeroPrice,

    /// Item keys must not be blank.
    #[error("item key must not be empty")]
    EmptyItem,

    /// A balance would exceed its integer range.
    #[error("balance overflow")]
    Overflow,

    /// A required field was not set on the builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
