//! Error types for the bazaar-pricing crate.
//!
//! Most pricing functions clamp rather than fail. The few preconditions
//! that cannot be repaired by clamping surface here.

/// Errors raised by pricing operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    /// An offered or proposed price was zero.
    #[error("price must be greater than zero, got {price}")]
    InvalidPrice {
        /// The rejected price.
        price: u32,
    },
}
