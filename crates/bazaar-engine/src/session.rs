//! Multi-turn negotiation for selling an item to a merchant.
//!
//! A [`NegotiationSession`] walks this state machine:
//!
//! ```text
//! Idle --propose--> ProposalPending --accepted--> Accepted (terminal)
//!                        |   ^
//!                rejected|   |propose
//!                        v   |
//!                      Rejected
//!
//! any non-terminal state --cancel--> Cancelled (terminal)
//! ```
//!
//! A proposal is split in two so the oracle call can run without holding
//! the session: [`NegotiationSession::begin_proposal`] validates the price
//! and hands out a [`PendingProposal`] stamped with the session ID and a
//! version, and [`NegotiationSession::complete_proposal`] applies the
//! answer only if that stamp still matches. An answer for a cancelled or
//! superseded proposal is discarded with [`EngineError::StaleResponse`].
//! [`NegotiationSession::propose`] does both around one awaited call, cut
//! off at the session's oracle deadline.
//!
//! Accepted outcomes settle the ledger first and update rapport second. If
//! settlement fails, neither happens.

use std::time::Duration;

use rand::Rng;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use bazaar_ledger::{Settlement, TransactionRecord, WealthLedger};
use bazaar_oracle::{NegotiationOracle, OracleError};
use bazaar_pricing::{
    FallbackResolver, PriceModifierComposer, PriceQuote, PricingInputs, RELATIONSHIP_MAX,
    RelationshipTracker,
};
use bazaar_types::{
    Item, MAX_RELATIONSHIP_CHANGE, Merchant, NegotiationContext, NegotiationOutcome,
    NegotiationTurn, SessionId, SessionStatus, SkillProfile,
};

use crate::error::EngineError;

/// Longest a negotiation round waits for its oracle before the fallback
/// negotiator answers. Covers the default oracle retry budget.
pub const DEFAULT_ORACLE_DEADLINE: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Proposal types
// ---------------------------------------------------------------------------

/// A proposal handed to the oracle, awaiting its answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingProposal {
    session: SessionId,
    version: u64,
    price: u32,
    context: NegotiationContext,
}

impl PendingProposal {
    /// The session that issued this proposal.
    pub const fn session_id(&self) -> SessionId {
        self.session
    }

    /// Proposal version within the session.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// The price the player asked.
    pub const fn price(&self) -> u32 {
        self.price
    }

    /// Snapshot to send to the oracle.
    pub const fn context(&self) -> &NegotiationContext {
        &self.context
    }
}

/// What a completed proposal did.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalResult {
    /// Session status afterwards: `Accepted` or `Rejected`.
    pub status: SessionStatus,
    /// The outcome that was applied.
    pub outcome: NegotiationOutcome,
    /// Relationship score after the update.
    pub relationship_score: u32,
    /// Receipt of the sale when accepted.
    pub record: Option<TransactionRecord>,
    /// Price the UI should pre-fill for the next proposal.
    pub suggested_price: u32,
}

// ---------------------------------------------------------------------------
// NegotiationSession
// ---------------------------------------------------------------------------

/// One NPC sale negotiation. Never persisted.
#[derive(Debug, Clone)]
pub struct NegotiationSession {
    id: SessionId,
    merchant: Merchant,
    item: Item,
    skills: SkillProfile,
    quote: PriceQuote,
    current_proposed_price: u32,
    history: Vec<NegotiationTurn>,
    status: SessionStatus,
    version: u64,
    in_flight: Option<u64>,
    relationship_snapshot: u32,
    fallback: FallbackResolver,
    oracle_deadline: Duration,
}

impl NegotiationSession {
    /// Open a session, pricing the item with `composer`.
    ///
    /// The first suggested price is the fair price.
    pub fn open(
        merchant: Merchant,
        item: Item,
        skills: SkillProfile,
        composer: &PriceModifierComposer,
        reputation_score: u32,
        relationship_score: u32,
    ) -> Self {
        let quote = composer.compose(&PricingInputs {
            base_price: item.checked_base_price(),
            reputation_score,
            skills: &skills,
            merchant: &merchant,
            relationship_score,
            categories: &item.categories,
        });
        let id = SessionId::new();

        info!(
            session_id = %id,
            merchant_id = %merchant.id,
            item = %item.name,
            fair_price = quote.final_price,
            "negotiation opened"
        );

        Self {
            id,
            current_proposed_price: quote.final_price,
            merchant,
            item,
            skills,
            quote,
            history: Vec::new(),
            status: SessionStatus::Idle,
            version: 0,
            in_flight: None,
            relationship_snapshot: relationship_score.min(RELATIONSHIP_MAX),
            fallback: FallbackResolver::default(),
            oracle_deadline: DEFAULT_ORACLE_DEADLINE,
        }
    }

    /// Use a specific fallback negotiator for failed oracle calls.
    #[must_use]
    pub fn with_fallback(mut self, fallback: FallbackResolver) -> Self {
        self.fallback = fallback;
        self
    }

    /// Give up on the oracle after `deadline` in [`propose`](Self::propose).
    #[must_use]
    pub const fn with_oracle_deadline(mut self, deadline: Duration) -> Self {
        self.oracle_deadline = deadline;
        self
    }

    /// How long [`propose`](Self::propose) waits for the oracle.
    pub const fn oracle_deadline(&self) -> Duration {
        self.oracle_deadline
    }

    /// Session identifier.
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// The merchant being negotiated with.
    pub const fn merchant(&self) -> &Merchant {
        &self.merchant
    }

    /// The item for sale.
    pub const fn item(&self) -> &Item {
        &self.item
    }

    /// The fair price fixed when the session opened.
    pub const fn fair_price(&self) -> u32 {
        self.quote.final_price
    }

    /// The full price quote, including its breakdown.
    pub const fn quote(&self) -> &PriceQuote {
        &self.quote
    }

    /// The price to suggest for the next proposal: the last counter-offer,
    /// or the last asked price, or the fair price before any proposal.
    pub const fn suggested_price(&self) -> u32 {
        self.current_proposed_price
    }

    /// Turn log, oldest first.
    pub fn history(&self) -> &[NegotiationTurn] {
        &self.history
    }

    /// Current status.
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Number of proposals begun so far.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Whether a proposal is awaiting an answer.
    pub const fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Relationship score captured with the latest proposal.
    pub const fn relationship_snapshot(&self) -> u32 {
        self.relationship_snapshot
    }

    /// Validate a proposal and snapshot the context for the oracle.
    ///
    /// Nothing changes if validation fails.
    pub fn begin_proposal(
        &mut self,
        price: u32,
        relationship_score: u32,
    ) -> Result<PendingProposal, EngineError> {
        if self.status.is_terminal() {
            return Err(EngineError::SessionClosed {
                status: self.status,
            });
        }
        if self.in_flight.is_some() {
            return Err(EngineError::ProposalInFlight);
        }
        if price == 0 {
            return Err(EngineError::InvalidProposal { price });
        }

        self.version = self.version.wrapping_add(1);
        self.in_flight = Some(self.version);
        self.status = SessionStatus::ProposalPending;
        self.current_proposed_price = price;
        self.relationship_snapshot = relationship_score.min(RELATIONSHIP_MAX);

        debug!(
            session_id = %self.id,
            version = self.version,
            price = price,
            fair_price = self.fair_price(),
            "proposal sent"
        );

        Ok(PendingProposal {
            session: self.id,
            version: self.version,
            price,
            context: NegotiationContext {
                merchant: self.merchant.clone(),
                item: self.item.clone(),
                proposed_price: price,
                fair_price: self.fair_price(),
                relationship_score: self.relationship_snapshot,
                history: self.history.clone(),
                skills: self.skills.clone(),
            },
        })
    }

    /// Apply the answer to a pending proposal.
    ///
    /// On acceptance the item is sold through `ledger` and the session
    /// closes. On rejection rapport is updated, the counter-offer becomes
    /// the suggested price, and the player may propose again.
    pub fn complete_proposal<L>(
        &mut self,
        pending: PendingProposal,
        outcome: NegotiationOutcome,
        tracker: &mut RelationshipTracker,
        ledger: &mut L,
    ) -> Result<ProposalResult, EngineError>
    where
        L: WealthLedger + ?Sized,
    {
        if pending.session != self.id || self.in_flight != Some(pending.version) {
            warn!(
                session_id = %self.id,
                version = pending.version,
                status = %self.status,
                "stale negotiation response discarded"
            );
            return Err(EngineError::StaleResponse);
        }
        self.in_flight = None;

        let outcome = sanitize_outcome(outcome, &self.merchant.name);
        let merchant_id = self.merchant.id;
        let turns = [
            NegotiationTurn::player(format!("I'm asking {} gold.", pending.price)),
            NegotiationTurn::merchant(outcome.dialogue.clone()),
        ];

        if outcome.accepted {
            let settlement = Settlement {
                merchant: merchant_id,
                item: pending.context.item.name,
                price: pending.price,
                fair_price: self.fair_price(),
                relationship_after: tracker.preview(merchant_id, outcome.relationship_change),
            };
            let record = ledger.sale(settlement).map_err(|e| {
                warn!(session_id = %self.id, error = %e, "accepted sale could not settle");
                EngineError::from(e)
            })?;
            let relationship_score = tracker.update(merchant_id, outcome.relationship_change);

            self.history.extend(turns);
            self.status = SessionStatus::Accepted;
            info!(
                session_id = %self.id,
                merchant_id = %merchant_id,
                price = pending.price,
                fair_price = self.fair_price(),
                relationship = relationship_score,
                "negotiation accepted"
            );

            return Ok(ProposalResult {
                status: self.status,
                outcome,
                relationship_score,
                record: Some(record),
                suggested_price: pending.price,
            });
        }

        let relationship_score = tracker.update(merchant_id, outcome.relationship_change);
        self.history.extend(turns);
        if let Some(counter) = outcome.counter_offer {
            self.current_proposed_price = counter;
        }
        // Rejected is non-terminal: the next proposal moves back to ProposalPending.
        self.status = SessionStatus::Rejected;
        debug!(
            session_id = %self.id,
            price = pending.price,
            counter_offer = ?outcome.counter_offer,
            relationship = relationship_score,
            "proposal rejected"
        );

        Ok(ProposalResult {
            status: self.status,
            outcome,
            relationship_score,
            record: None,
            suggested_price: self.current_proposed_price,
        })
    }

    /// Propose a price and wait for the merchant's answer.
    ///
    /// If `oracle` fails, misses the deadline, or returns an outcome that
    /// breaks the contract, the session's fallback negotiator answers
    /// instead.
    pub async fn propose<O, L>(
        &mut self,
        price: u32,
        oracle: &O,
        tracker: &mut RelationshipTracker,
        ledger: &mut L,
        rng: &mut impl Rng,
    ) -> Result<ProposalResult, EngineError>
    where
        O: NegotiationOracle,
        L: WealthLedger + ?Sized,
    {
        let pending = self.begin_proposal(price, tracker.get(self.merchant.id))?;
        let answer = ask_oracle(oracle, pending.context(), self.oracle_deadline).await;
        let outcome = outcome_or_fallback(answer, pending.context(), &self.fallback, rng);
        self.complete_proposal(pending, outcome, tracker, ledger)
    }

    /// Walk away. Cancelling twice is a no-op; cancelling an accepted
    /// session is an error.
    pub fn cancel(&mut self) -> Result<(), EngineError> {
        match self.status {
            SessionStatus::Accepted => Err(EngineError::SessionClosed {
                status: self.status,
            }),
            SessionStatus::Cancelled => Ok(()),
            SessionStatus::Idle | SessionStatus::ProposalPending | SessionStatus::Rejected => {
                self.status = SessionStatus::Cancelled;
                self.in_flight = None;
                info!(
                    session_id = %self.id,
                    merchant_id = %self.merchant.id,
                    turns = self.history.len(),
                    "negotiation cancelled"
                );
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome hygiene
// ---------------------------------------------------------------------------

/// Ask `oracle` about one round, reporting [`OracleError::Timeout`] if it
/// has not answered within `deadline`.
pub(crate) async fn ask_oracle<O: NegotiationOracle>(
    oracle: &O,
    context: &NegotiationContext,
    deadline: Duration,
) -> Result<NegotiationOutcome, OracleError> {
    match timeout(deadline, oracle.negotiate(context)).await {
        Ok(answer) => answer,
        Err(_elapsed) => {
            warn!(
                oracle = oracle.name(),
                deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                "oracle missed the round deadline"
            );
            Err(OracleError::Timeout)
        }
    }
}

/// Use the oracle's answer if it is usable, otherwise ask `fallback`.
pub(crate) fn outcome_or_fallback(
    answer: Result<NegotiationOutcome, OracleError>,
    context: &NegotiationContext,
    fallback: &FallbackResolver,
    rng: &mut impl Rng,
) -> NegotiationOutcome {
    match answer {
        Ok(outcome) if outcome.is_well_formed() => outcome,
        Ok(_) => {
            warn!("oracle outcome failed validation, using fallback");
            fallback.resolve(context, rng)
        }
        Err(e) => {
            warn!(error = %e, "oracle failed, using fallback");
            fallback.resolve(context, rng)
        }
    }
}

/// Force an outcome into its valid domain.
fn sanitize_outcome(mut outcome: NegotiationOutcome, merchant_name: &str) -> NegotiationOutcome {
    outcome.relationship_change = outcome
        .relationship_change
        .clamp(-MAX_RELATIONSHIP_CHANGE, MAX_RELATIONSHIP_CHANGE);
    outcome.counter_offer = outcome.counter_offer.filter(|&c| c > 0);
    if outcome.dialogue.trim().is_empty() {
        outcome.dialogue = format!("{merchant_name} weighs your offer in silence.");
    }
    outcome
}
