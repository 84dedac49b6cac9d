//! Post-trade notifications for the journal and skill progression.
//!
//! Hooks run after a trade has settled and cannot undo or fail it.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

use bazaar_ledger::TransactionRecord;

/// Bargaining XP for closing a negotiated sale.
pub const NEGOTIATION_XP: u32 = 10;

/// Bargaining XP for a successful market haggle.
pub const HAGGLE_XP: u32 = 5;

/// How a trade came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeChannel {
    /// Bought at the quoted price.
    Market,
    /// Bought after a successful haggle.
    Haggle,
    /// Sold through a negotiation session.
    Negotiation,
}

impl TradeChannel {
    /// Lowercase label for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Haggle => "haggle",
            Self::Negotiation => "negotiation",
        }
    }

    /// Bargaining XP earned by a trade through this channel.
    pub const fn bargaining_xp(self) -> u32 {
        match self {
            Self::Market => 0,
            Self::Haggle => HAGGLE_XP,
            Self::Negotiation => NEGOTIATION_XP,
        }
    }
}

/// Receives every settled trade. Fire-and-forget.
pub trait TransactionHook: Send + Sync {
    /// Called once per settled trade.
    fn on_transaction(&self, channel: TradeChannel, record: &TransactionRecord);
}

/// Journals trades to the log and tallies bargaining XP.
#[derive(Debug, Default)]
pub struct TracingJournal {
    xp: AtomicU64,
    entries: AtomicU64,
}

impl TracingJournal {
    /// Create a journal with nothing recorded.
    pub const fn new() -> Self {
        Self {
            xp: AtomicU64::new(0),
            entries: AtomicU64::new(0),
        }
    }

    /// Total bargaining XP awarded.
    pub fn total_xp(&self) -> u64 {
        self.xp.load(Ordering::Relaxed)
    }

    /// Number of trades journaled.
    pub fn entries(&self) -> u64 {
        self.entries.load(Ordering::Relaxed)
    }
}

impl TransactionHook for TracingJournal {
    fn on_transaction(&self, channel: TradeChannel, record: &TransactionRecord) {
        let xp = channel.bargaining_xp();
        self.xp.fetch_add(u64::from(xp), Ordering::Relaxed);
        self.entries.fetch_add(1, Ordering::Relaxed);

        info!(
            transaction_id = %record.id,
            channel = channel.as_str(),
            kind = record.kind.as_str(),
            merchant_id = %record.merchant,
            item = %record.item,
            price = record.price,
            fair_price = record.fair_price,
            xp = xp,
            "trade journaled"
        );
    }
}

impl<T: TransactionHook + ?Sized> TransactionHook for std::sync::Arc<T> {
    fn on_transaction(&self, channel: TradeChannel, record: &TransactionRecord) {
        (**self).on_transaction(channel, record);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_ledger::{TransactionBuilder, TransactionKind};
    use bazaar_types::MerchantId;

    use super::*;

    fn record(kind: TransactionKind) -> TransactionRecord {
        TransactionBuilder::new(kind)
            .merchant(MerchantId::new())
            .item("Lute")
            .price(70)
            .fair_price(80)
            .relationship_after(53)
            .build()
            .unwrap()
    }

    #[test]
    fn xp_by_channel() {
        let journal = TracingJournal::new();
        journal.on_transaction(TradeChannel::Negotiation, &record(TransactionKind::Sale));
        journal.on_transaction(TradeChannel::Haggle, &record(TransactionKind::Purchase));
        journal.on_transaction(TradeChannel::Market, &record(TransactionKind::Purchase));

        assert_eq!(journal.total_xp(), 15);
        assert_eq!(journal.entries(), 3);
    }

    #[test]
    fn shared_journal_through_arc() {
        let journal = std::sync::Arc::new(TracingJournal::new());
        let hook: Box<dyn TransactionHook> = Box::new(std::sync::Arc::clone(&journal));
        hook.on_transaction(TradeChannel::Haggle, &record(TransactionKind::Purchase));
        assert_eq!(journal.total_xp(), u64::from(HAGGLE_XP));
    }
}
