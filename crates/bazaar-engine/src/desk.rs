//! One player's trading context.
//!
//! [`TradeDesk`] owns everything a player's commerce touches: their ledger,
//! rapport with every merchant, their skills and reputation, the pricing
//! engine, the negotiation oracle, and the open negotiation sessions (at
//! most one per merchant). Every trade that settles is announced to the
//! registered [`TransactionHook`]s.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use bazaar_ledger::{Settlement, TransactionRecord, WealthLedger};
use bazaar_oracle::NegotiationOracle;
use bazaar_pricing::{
    FallbackResolver, HaggleResolver, PriceModifierComposer, PriceQuote, PricingConfig,
    PricingInputs, ProfessionTable, RelationshipTracker, TieredReputation,
};
use bazaar_types::{
    Item, Merchant, MerchantId, NegotiationOutcome, ReputationState, SessionId, SkillProfile,
};

use crate::error::EngineError;
use crate::hooks::{TradeChannel, TransactionHook};
use crate::market::{HaggleReceipt, MarketOffer, haggle};
use crate::session::{
    DEFAULT_ORACLE_DEADLINE, NegotiationSession, PendingProposal, ProposalResult, ask_oracle,
    outcome_or_fallback,
};

/// Faction whose reputation sets market prices unless configured otherwise.
pub const DEFAULT_TRADE_FACTION: &str = "Merchants Guild";

/// A player's ledger, standing, and open negotiations.
pub struct TradeDesk<L, O> {
    ledger: L,
    skills: SkillProfile,
    reputation: ReputationState,
    faction: String,
    tracker: RelationshipTracker,
    composer: PriceModifierComposer,
    haggler: HaggleResolver,
    fallback: FallbackResolver,
    oracle: O,
    oracle_deadline: Duration,
    hooks: Vec<Box<dyn TransactionHook>>,
    sessions: BTreeMap<SessionId, NegotiationSession>,
    rng: StdRng,
}

impl<L, O> std::fmt::Debug for TradeDesk<L, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeDesk")
            .field("faction", &self.faction)
            .field("open_sessions", &self.sessions.len())
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl<L, O> TradeDesk<L, O>
where
    L: WealthLedger,
    O: NegotiationOracle,
{
    /// Create a desk with the default reputation and profession tables.
    ///
    /// The RNG is seeded from the operating system; use
    /// [`with_seed`](Self::with_seed) for reproducible play.
    pub fn new(ledger: L, skills: SkillProfile, oracle: O, pricing: &PricingConfig) -> Self {
        let composer = PriceModifierComposer::new(
            pricing.composer.clone(),
            Arc::new(TieredReputation),
            Arc::new(ProfessionTable::default()),
        );
        Self {
            ledger,
            skills,
            reputation: ReputationState::default(),
            faction: DEFAULT_TRADE_FACTION.to_owned(),
            tracker: RelationshipTracker::new(),
            composer,
            haggler: HaggleResolver::new(pricing.haggle.clone()),
            fallback: FallbackResolver::new(pricing.fallback.clone()),
            oracle,
            oracle_deadline: DEFAULT_ORACLE_DEADLINE,
            hooks: Vec::new(),
            sessions: BTreeMap::new(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Use a fixed RNG seed for haggles and fallback negotiation.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Cap how long one negotiation round waits for the oracle. When the
    /// oracle retries internally, the deadline should cover all attempts.
    #[must_use]
    pub const fn with_oracle_deadline(mut self, deadline: Duration) -> Self {
        self.oracle_deadline = deadline;
        self
    }

    /// Set reputation and the faction whose score prices trades.
    #[must_use]
    pub fn with_reputation(
        mut self,
        reputation: ReputationState,
        faction: impl Into<String>,
    ) -> Self {
        self.reputation = reputation;
        self.faction = faction.into();
        self
    }

    /// Replace the price composer, e.g. to plug in external providers.
    #[must_use]
    pub fn with_composer(mut self, composer: PriceModifierComposer) -> Self {
        self.composer = composer;
        self
    }

    /// Start from existing rapport.
    #[must_use]
    pub fn with_tracker(mut self, tracker: RelationshipTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Register a hook for settled trades.
    #[must_use]
    pub fn with_hook(mut self, hook: impl TransactionHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// The player's ledger.
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Rapport with every merchant.
    pub const fn tracker(&self) -> &RelationshipTracker {
        &self.tracker
    }

    /// The player's skills.
    pub const fn skills(&self) -> &SkillProfile {
        &self.skills
    }

    /// The negotiation oracle.
    pub const fn oracle(&self) -> &O {
        &self.oracle
    }

    /// An open session.
    pub fn session(&self, id: SessionId) -> Option<&NegotiationSession> {
        self.sessions.get(&id)
    }

    /// The open session with a merchant, if any.
    pub fn session_with(&self, merchant: MerchantId) -> Option<&NegotiationSession> {
        self.sessions.values().find(|s| s.merchant().id == merchant)
    }

    /// Number of open sessions.
    pub fn open_sessions(&self) -> usize {
        self.sessions.len()
    }

    // -----------------------------------------------------------------------
    // Market
    // -----------------------------------------------------------------------

    /// Fair price of an item at a merchant, with its breakdown.
    pub fn quote(&self, merchant: &Merchant, item: &Item) -> PriceQuote {
        self.composer.compose(&PricingInputs {
            base_price: item.checked_base_price(),
            reputation_score: self.reputation.score(&self.faction),
            skills: &self.skills,
            merchant,
            relationship_score: self.tracker.get(merchant.id),
            categories: &item.categories,
        })
    }

    /// Buy an item at the quoted price.
    pub fn buy(
        &mut self,
        merchant: &Merchant,
        item: &Item,
    ) -> Result<TransactionRecord, EngineError> {
        let price = self.quote(merchant, item).final_price;
        let available = self.ledger.gold();
        if available < u64::from(price) {
            return Err(EngineError::InsufficientFunds { price, available });
        }

        let record = self.ledger.purchase(Settlement {
            merchant: merchant.id,
            item: item.name.clone(),
            price,
            fair_price: price,
            relationship_after: self.tracker.get(merchant.id),
        })?;
        self.notify(TradeChannel::Market, &record);
        Ok(record)
    }

    /// Name a price for an item instead of paying the quote.
    pub fn haggle(
        &mut self,
        merchant: &Merchant,
        item: &Item,
        offered_price: u32,
    ) -> Result<HaggleReceipt, EngineError> {
        let offer = MarketOffer {
            merchant,
            item,
            offered_price,
            fair_price: self.quote(merchant, item).final_price,
            bargaining_level: self.skills.bargaining_level,
        };
        let receipt = haggle(
            &self.haggler,
            &offer,
            &mut self.tracker,
            &mut self.ledger,
            &mut self.rng,
        )?;
        if let Some(record) = &receipt.record {
            self.notify(TradeChannel::Haggle, record);
        }
        Ok(receipt)
    }

    // -----------------------------------------------------------------------
    // Negotiation
    // -----------------------------------------------------------------------

    /// Open a negotiation to sell an item the player owns.
    pub fn open_negotiation(
        &mut self,
        merchant: &Merchant,
        item: &Item,
    ) -> Result<SessionId, EngineError> {
        if self.ledger.stock_of(&item.name) == 0 {
            return Err(EngineError::NotInStock {
                item: item.name.clone(),
            });
        }
        if self.session_with(merchant.id).is_some() {
            return Err(EngineError::SessionAlreadyOpen(merchant.id));
        }

        let session = NegotiationSession::open(
            merchant.clone(),
            item.clone(),
            self.skills.clone(),
            &self.composer,
            self.reputation.score(&self.faction),
            self.tracker.get(merchant.id),
        )
        .with_fallback(self.fallback.clone())
        .with_oracle_deadline(self.oracle_deadline);
        let id = session.id();
        self.sessions.insert(id, session);
        Ok(id)
    }

    /// First half of a proposal: validate and snapshot.
    pub fn begin_proposal(
        &mut self,
        id: SessionId,
        price: u32,
    ) -> Result<PendingProposal, EngineError> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(EngineError::UnknownSession(id))?;
        let relationship = self.tracker.get(session.merchant().id);
        session.begin_proposal(price, relationship)
    }

    /// Second half of a proposal: apply the merchant's answer.
    ///
    /// Answers for sessions that have since been cancelled or dismissed
    /// are discarded with [`EngineError::StaleResponse`].
    pub fn complete_proposal(
        &mut self,
        pending: PendingProposal,
        outcome: NegotiationOutcome,
    ) -> Result<ProposalResult, EngineError> {
        let id = pending.session_id();
        let Some(session) = self.sessions.get_mut(&id) else {
            warn!(session_id = %id, "answer for a closed negotiation discarded");
            return Err(EngineError::StaleResponse);
        };

        let result =
            session.complete_proposal(pending, outcome, &mut self.tracker, &mut self.ledger)?;
        if let Some(record) = &result.record {
            self.notify(TradeChannel::Negotiation, record);
            self.sessions.remove(&id);
        }
        Ok(result)
    }

    /// Propose a price and await the merchant's answer.
    ///
    /// Oracle failures, and oracles that miss the round deadline, are
    /// answered by the fallback negotiator.
    pub async fn propose(
        &mut self,
        id: SessionId,
        price: u32,
    ) -> Result<ProposalResult, EngineError> {
        let pending = self.begin_proposal(id, price)?;
        let answer = ask_oracle(&self.oracle, pending.context(), self.oracle_deadline).await;
        let outcome = outcome_or_fallback(answer, pending.context(), &self.fallback, &mut self.rng);
        self.complete_proposal(pending, outcome)
    }

    /// Walk away from a negotiation.
    pub fn cancel(&mut self, id: SessionId) -> Result<(), EngineError> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(EngineError::UnknownSession(id))?;
        session.cancel()?;
        self.sessions.remove(&id);
        Ok(())
    }

    /// Close the negotiation window. Returns whether a session was open.
    pub fn dismiss(&mut self, id: SessionId) -> bool {
        let Some(mut session) = self.sessions.remove(&id) else {
            return false;
        };
        if let Err(e) = session.cancel() {
            debug!(session_id = %id, error = %e, "dismissed session was already closed");
        }
        info!(session_id = %id, "negotiation dismissed");
        true
    }

    fn notify(&self, channel: TradeChannel, record: &TransactionRecord) {
        for hook in &self.hooks {
            hook.on_transaction(channel, record);
        }
    }
}
