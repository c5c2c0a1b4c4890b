//! Book and order sides.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of the book or of an order.
///
/// `Buy` orders rest on the bid side, `Sell` orders on the ask side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buying interest; rests on the bid side.
    Buy,
    /// Selling interest; rests on the ask side.
    Sell,
}

impl Side {
    /// The opposite side.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Lowercase name, as written into the trade ledger.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
