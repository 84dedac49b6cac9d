//! Negotiation session data: turns, status, and the oracle contract.
//!
//! [`NegotiationContext`] is what a negotiation oracle receives and
//! [`NegotiationOutcome`] is what it must produce. Remote and fallback
//! oracles share both types, so the session cannot tell them apart.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::market::{Item, Merchant};
use crate::skills::SkillProfile;

/// Largest relationship swing a single negotiation round may cause, in
/// either direction.
pub const MAX_RELATIONSHIP_CHANGE: i32 = 5;

/// Who said a line in the negotiation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Speaker {
    /// The player character.
    Player,
    /// The merchant NPC.
    Merchant,
}

/// One immutable entry in the negotiation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NegotiationTurn {
    /// Who spoke.
    pub speaker: Speaker,
    /// What was said.
    pub text: String,
}

impl NegotiationTurn {
    /// A line spoken by the player.
    pub fn player(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Player,
            text: text.into(),
        }
    }

    /// A line spoken by the merchant.
    pub fn merchant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Merchant,
            text: text.into(),
        }
    }
}

/// Lifecycle state of a negotiation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum SessionStatus {
    /// Opened, no proposal made yet.
    Idle,
    /// A proposal is being evaluated or awaiting the player's next move.
    ProposalPending,
    /// The merchant accepted. Terminal.
    Accepted,
    /// The merchant rejected the last proposal; awaiting the player's next
    /// offer, which moves the session back to `ProposalPending`.
    Rejected,
    /// The player walked away. Terminal.
    Cancelled,
}

impl SessionStatus {
    /// Whether no further proposals are possible.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Cancelled)
    }

    /// Lowercase label for logs and user messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ProposalPending => "proposal_pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an oracle needs to judge a proposed price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NegotiationContext {
    /// The merchant being negotiated with, including persona.
    pub merchant: Merchant,
    /// The item on the table.
    pub item: Item,
    /// The price the player is asking.
    pub proposed_price: u32,
    /// The engine's fair price for the item.
    pub fair_price: u32,
    /// Current player-merchant relationship in `[0, 100]`.
    pub relationship_score: u32,
    /// Full turn history so far, oldest first.
    pub history: Vec<NegotiationTurn>,
    /// The player's skills.
    pub skills: SkillProfile,
}

impl NegotiationContext {
    /// `proposed_price / fair_price`, with both sides floored at 1.
    pub fn price_ratio(&self) -> f64 {
        f64::from(self.proposed_price.max(1)) / f64::from(self.fair_price.max(1))
    }
}

/// Result of one negotiation round, from either the remote or the
/// fallback oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NegotiationOutcome {
    /// Whether the merchant takes the deal at the proposed price.
    pub accepted: bool,
    /// What the merchant says. Never empty.
    pub dialogue: String,
    /// Merchant's counter-offer, if any. Always positive when present.
    pub counter_offer: Option<u32>,
    /// Relationship delta in `[-5, 5]`.
    pub relationship_change: i32,
}

impl NegotiationOutcome {
    /// Check the structural contract: non-empty dialogue, positive
    /// counter-offer, bounded relationship change.
    pub fn is_well_formed(&self) -> bool {
        !self.dialogue.trim().is_empty()
            && self.counter_offer.is_none_or(|c| c > 0)
            && (-MAX_RELATIONSHIP_CHANGE..=MAX_RELATIONSHIP_CHANGE)
                .contains(&self.relationship_change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome() -> NegotiationOutcome {
        NegotiationOutcome {
            accepted: false,
            dialogue: "Too rich for me.".to_owned(),
            counter_offer: Some(8),
            relationship_change: -1,
        }
    }

    #[test]
    fn well_formed_outcome() {
        assert!(outcome().is_well_formed());
    }

    #[test]
    fn blank_dialogue_is_malformed() {
        let mut o = outcome();
        o.dialogue = "   ".to_owned();
        assert!(!o.is_well_formed());
    }

    #[test]
    fn zero_counter_offer_is_malformed() {
        let mut o = outcome();
        o.counter_offer = Some(0);
        assert!(!o.is_well_formed());
    }

    #[test]
    fn relationship_change_is_bounded() {
        let mut o = outcome();
        o.relationship_change = 6;
        assert!(!o.is_well_formed());
        o.relationship_change = -5;
        assert!(o.is_well_formed());
    }

    #[test]
    fn terminal_states() {
        assert!(SessionStatus::Accepted.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(!SessionStatus::Rejected.is_terminal());
        assert!(!SessionStatus::ProposalPending.is_terminal());
    }
}
