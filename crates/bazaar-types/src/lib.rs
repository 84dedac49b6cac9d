//! Shared type definitions for the Bazaar pricing and negotiation engine.
//!
//! Every crate in the workspace speaks in these types. They also flow to
//! `TypeScript` via `ts-rs` so the game UI can render quotes, price
//! breakdowns, and negotiation logs without hand-written mirrors.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for players, merchants, sessions, transactions
//! - [`market`] -- Merchants, items, categories, rarity
//! - [`skills`] -- Player skill profile and faction reputation
//! - [`negotiation`] -- Turn log, session status, oracle context and outcome

pub mod ids;
pub mod market;
pub mod negotiation;
pub mod skills;

// Re-export all public types at crate root for convenience.
pub use ids::{MerchantId, PlayerId, SessionId, TransactionId};
pub use market::{Item, ItemCategory, Merchant, Personality, Rarity};
pub use negotiation::{
    MAX_RELATIONSHIP_CHANGE, NegotiationContext, NegotiationOutcome, NegotiationTurn,
    SessionStatus, Speaker,
};
pub use skills::{MAX_REPUTATION, NEUTRAL_REPUTATION, ReputationState, SkillProfile};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the game UI.

    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::PlayerId::export_all();
        let _ = crate::ids::MerchantId::export_all();
        let _ = crate::ids::SessionId::export_all();
        let _ = crate::ids::TransactionId::export_all();

        // Market
        let _ = crate::market::Personality::export_all();
        let _ = crate::market::Merchant::export_all();
        let _ = crate::market::ItemCategory::export_all();
        let _ = crate::market::Rarity::export_all();
        let _ = crate::market::Item::export_all();

        // Skills
        let _ = crate::skills::SkillProfile::export_all();
        let _ = crate::skills::ReputationState::export_all();

        // Negotiation
        let _ = crate::negotiation::Speaker::export_all();
        let _ = crate::negotiation::NegotiationTurn::export_all();
        let _ = crate::negotiation::SessionStatus::export_all();
        let _ = crate::negotiation::NegotiationContext::export_all();
        let _ = crate::negotiation::NegotiationOutcome::export_all();
    }
}
