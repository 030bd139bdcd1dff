//! Validation error taxonomy
//!
//! Validation failures are surfaced to the client before any durable effect;
//! everything else (storage, matching) has its own error type next to the
//! component that produces it.

use thiserror::Error;

/// Request validation errors
///
/// Price positivity and quantity non-negativity are enforced by the
/// `Price`/`Quantity` types at deserialization; these variants cover the
/// cross-field rules and the side/kind vocabulary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("quantity must be positive")]
    NonPositiveQuantity,

    #[error("limit order requires a price")]
    MissingLimitPrice,

    #[error("market order must not specify a price")]
    PriceOnMarketOrder,

    #[error("unknown side: {0}")]
    UnknownSide(String),

    #[error("unknown kind: {0}")]
    UnknownKind(String),
}
