//! Decoded market event records.
//!
//! The decoder that produces these is an external collaborator; the engine
//! consumes a stream of already-decoded [`EventRecord`]s. The serde shape
//! mirrors the upstream JSON: an externally tagged body under the message
//! name, prices as decimal strings.

use crate::types::price::Price;
use crate::types::side::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order reference supplied by the event source, unique over the stream.
pub type OrderRef = u64;

/// Share quantity.
pub type Qty = u32;

/// One decoded event: a nanosecond timestamp plus the message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Nanoseconds since midnight (ITCH convention); strictly increasing
    /// input order is what the engine preserves, not the timestamp itself.
    #[serde(rename = "timestamp")]
    pub ts: u64,
    /// The message payload.
    pub body: EventBody,
}

/// The five ITCH 5.0 message kinds the book engine understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventBody {
    /// A new resting order enters the book.
    #[serde(rename = "AddOrder")]
    Add {
        /// Order reference, unique over the stream lifetime.
        reference: OrderRef,
        /// Which side of the book the order rests on.
        side: Side,
        /// Shares offered at `price`.
        shares: Qty,
        /// Raw symbol, possibly space-padded.
        stock: String,
        /// Limit price, decoded losslessly from the decimal string.
        price: Price,
    },

    /// An order leaves the book in full.
    #[serde(rename = "DeleteOrder")]
    Delete {
        /// Reference of the order being deleted.
        reference: OrderRef,
    },

    /// Part or all of an order traded.
    #[serde(rename = "OrderExecuted")]
    Execute {
        /// Reference of the executed order.
        reference: OrderRef,
        /// Shares executed.
        shares: Qty,
    },

    /// Part of an order was cancelled. Book effect is identical to
    /// `Execute`; the engine only counts them separately.
    #[serde(rename = "OrderCancelled")]
    Cancel {
        /// Reference of the cancelled order.
        reference: OrderRef,
        /// Shares cancelled.
        shares: Qty,
    },

    /// An order is atomically replaced under a new reference, inheriting
    /// side and symbol from the old one.
    #[serde(rename = "ReplaceOrder")]
    Replace {
        /// Reference being replaced.
        reference: OrderRef,
        /// Reference of the replacement order.
        new_reference: OrderRef,
        /// Shares of the replacement order.
        shares: Qty,
        /// Price of the replacement order.
        price: Price,
    },
}

impl EventBody {
    /// Short tag used in logs and statistics.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            EventBody::Add { .. } => EventKind::Add,
            EventBody::Delete { .. } => EventKind::Delete,
            EventBody::Execute { .. } => EventKind::Execute,
            EventBody::Cancel { .. } => EventKind::Cancel,
            EventBody::Replace { .. } => EventKind::Replace,
        }
    }
}

/// Discriminant of an [`EventBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Add order.
    Add,
    /// Delete order.
    Delete,
    /// Order executed.
    Execute,
    /// Order cancelled.
    Cancel,
    /// Order replaced.
    Replace,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Add => "add",
            EventKind::Delete => "delete",
            EventKind::Execute => "execute",
            EventKind::Cancel => "cancel",
            EventKind::Replace => "replace",
        };
        f.write_str(name)
    }
}
