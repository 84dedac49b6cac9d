//! Error types for trade orchestration.
//!
//! Oracle failures never appear here: they are absorbed by the fallback
//! negotiator before a session sees them. What remains are the synchronous
//! rejections a player can trigger, session lifecycle violations, and
//! settlement failures from the ledger.

use bazaar_ledger::LedgerError;
use bazaar_pricing::PricingError;
use bazaar_types::{MerchantId, SessionId, SessionStatus};

/// Errors raised by sessions, market haggling, and the trade desk.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The player cannot pay the offered price.
    #[error("insufficient funds: price {price}, available {available}")]
    InsufficientFunds {
        /// Gold required.
        price: u32,
        /// Gold on hand.
        available: u64,
    },

    /// A price of zero was offered or proposed.
    #[error("invalid proposal: price {price}")]
    InvalidProposal {
        /// The rejected price.
        price: u32,
    },

    /// The player has none of the item they tried to sell.
    #[error("no {item} in stock")]
    NotInStock {
        /// The missing item.
        item: String,
    },

    /// A proposal is already awaiting the merchant's answer.
    #[error("a proposal is already in flight")]
    ProposalInFlight,

    /// The session is accepted or cancelled.
    #[error("session is closed ({status})")]
    SessionClosed {
        /// The terminal status.
        status: SessionStatus,
    },

    /// An oracle answer arrived for a cancelled or superseded proposal.
    #[error("stale negotiation response discarded")]
    StaleResponse,

    /// A negotiation with this merchant is already open.
    #[error("a negotiation with merchant {0} is already open")]
    SessionAlreadyOpen(MerchantId),

    /// No open session has this ID.
    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    /// The ledger refused the trade. Nothing was changed.
    #[error("settlement failed: {0}")]
    Settlement(#[from] LedgerError),
}

impl From<PricingError> for EngineError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::InvalidPrice { price } => Self::InvalidProposal { price },
        }
    }
}

impl EngineError {
    /// Text to show the player.
    pub fn user_message(&self) -> String {
        match self {
            Self::InsufficientFunds { price, available }
            | Self::Settlement(LedgerError::InsufficientFunds { price, available }) => {
                format!("You cannot afford that: it costs {price} gold and you have {available}.")
            }
            Self::InvalidProposal { .. } => "Name a price of at least 1 gold.".to_owned(),
            Self::NotInStock { item }
            | Self::Settlement(LedgerError::InsufficientStock { item }) => {
                format!("You have no {item} to sell.")
            }
            Self::ProposalInFlight => {
                "The merchant is still considering your last offer.".to_owned()
            }
            Self::SessionClosed { status } => format!("That negotiation is already {status}."),
            Self::SessionAlreadyOpen(_) => {
                "You are already haggling with this merchant.".to_owned()
            }
            Self::StaleResponse | Self::UnknownSession(_) => {
                "That negotiation is no longer open.".to_owned()
            }
            Self::Settlement(_) => format!("The trade could not be completed: {self}"),
        }
    }
}
