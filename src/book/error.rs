//! Book engine error types.

use crate::types::OrderRef;
use thiserror::Error;

/// Errors raised while applying events to the registry and books.
///
/// None of these abort the stream: the engine counts them, logs them at the
/// level mandated by the error policy, and moves on. They surface as `Err`
/// only at the registry/book API boundary so callers can decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BookError {
    /// An Add or Replace tried to register a reference that already exists.
    #[error("duplicate order reference {0}")]
    DuplicateRef(OrderRef),

    /// A Delete/Execute/Cancel/Replace named a reference the registry does
    /// not hold.
    #[error("unknown order reference {0}")]
    UnknownRef(OrderRef),

    /// An Execute or Cancel asked for more shares than the order has left.
    #[error("order {reference}: decrement of {requested} exceeds remaining {remaining}")]
    Underflow {
        /// The order reference.
        reference: OrderRef,
        /// Shares requested.
        requested: u32,
        /// Shares actually remaining.
        remaining: u32,
    },

    /// An Add or Replace carried a zero price.
    #[error("order {0}: zero price rejected")]
    InvalidPrice(OrderRef),

    /// An Add or Replace carried a zero quantity.
    #[error("order {0}: zero quantity rejected")]
    InvalidQuantity(OrderRef),
}
