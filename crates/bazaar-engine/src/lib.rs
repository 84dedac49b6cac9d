//! Trade orchestration for the Bazaar engine.
//!
//! This crate ties pricing, the ledger, and the negotiation oracle together
//! into the operations the game calls:
//!
//! - market purchases and single-shot haggles ([`market`])
//! - multi-turn NPC sale negotiations ([`session`])
//! - a per-player [`TradeDesk`] that owns rapport, the ledger, and open
//!   sessions, and announces settled trades to [`TransactionHook`]s
//!
//! Oracle failures never reach the caller. A session that cannot get a
//! usable answer from its oracle asks the local fallback negotiator, so a
//! negotiation always progresses.
//!
//! # Modules
//!
//! - [`config`] -- `bazaar.yaml` loading with defaults and env overrides
//! - [`error`] -- [`EngineError`] and its player-facing messages
//! - [`session`] -- [`NegotiationSession`] state machine with stale-response guard
//! - [`market`] -- Market haggling against the ledger
//! - [`hooks`] -- Journal and bargaining-XP notifications
//! - [`desk`] -- [`TradeDesk`], one player's trading context

pub mod config;
pub mod desk;
pub mod error;
pub mod hooks;
pub mod market;
pub mod session;

pub use config::{BazaarConfig, ConfigError, FallbackSection, LoggingConfig, OracleSection};
pub use desk::{DEFAULT_TRADE_FACTION, TradeDesk};
pub use error::EngineError;
pub use hooks::{HAGGLE_XP, NEGOTIATION_XP, TracingJournal, TradeChannel, TransactionHook};
pub use market::{HaggleReceipt, MarketOffer, haggle};
pub use session::{DEFAULT_ORACLE_DEADLINE, NegotiationSession, PendingProposal, ProposalResult};
