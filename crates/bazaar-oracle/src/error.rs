//! Error types for the negotiation oracles.
//!
//! [`OracleError`] is what a primary oracle may return. None of it reaches
//! the player: [`ResilientOracle`](crate::ResilientOracle) absorbs every
//! variant by substituting the local fallback outcome.

/// Errors a negotiation oracle can produce.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// The backend could not be reached or returned a non-success status.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    /// The call exceeded the per-attempt deadline.
    #[error("oracle timed out")]
    Timeout,

    /// The backend answered, but not with a valid outcome.
    #[error("oracle response malformed: {0}")]
    Malformed(#[from] ValidationError),

    /// A prompt template failed to load or render.
    #[error("template error: {0}")]
    Template(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),
}

impl OracleError {
    /// Whether another attempt might succeed.
    ///
    /// Transport failures and timeouts are transient. A malformed answer or
    /// a broken template will repeat.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

/// Why a raw oracle response was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No recovery strategy produced a JSON object.
    #[error("response is not a JSON object")]
    NotJson,

    /// A required field is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A field has the wrong JSON type.
    #[error("field `{field}` must be {expected}")]
    WrongType {
        /// The offending field.
        field: &'static str,
        /// What was expected.
        expected: &'static str,
    },

    /// The dialogue is empty after trimming.
    #[error("dialogue is empty")]
    EmptyDialogue,

    /// The counter-offer is zero, negative, or too large.
    #[error("counter offer out of range: {0}")]
    CounterOfferOutOfRange(String),

    /// The relationship change is outside `[-5, 5]`.
    #[error("relationship change {0} outside [-5, 5]")]
    RelationshipChangeOutOfRange(i64),

    /// A typed outcome that breaks the outcome contract, e.g. from an
    /// oracle that does not go through [`parse_outcome`](crate::parse_outcome).
    #[error("outcome breaks the contract: {0}")]
    IllFormed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_variants() {
        assert!(OracleError::Unavailable("503".to_owned()).is_retryable());
        assert!(OracleError::Timeout.is_retryable());
        assert!(!OracleError::Malformed(ValidationError::NotJson).is_retryable());
        assert!(!OracleError::Template("bad".to_owned()).is_retryable());
    }

    #[test]
    fn validation_converts() {
        let err: OracleError = ValidationError::EmptyDialogue.into();
        assert_eq!(err.to_string(), "oracle response malformed: dialogue is empty");
    }
}
