//! Book updates emitted to the market-data bus.

use crate::types::{Price, SymbolId};
use bitflags::bitflags;
use serde::{Serialize, Serializer};

bitflags! {
    /// Why an update was emitted. Multiple triggers can coincide on one
    /// update (a trade through the best level both moves the best price
    /// and changes top-of-book volume).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UpdateTrigger: u8 {
        /// Best bid or best ask moved.
        const BEST_CHANGED = 1 << 0;
        /// Volume at the top of either side changed.
        const TOP_VOLUME_CHANGED = 1 << 1;
        /// The configured periodic emission interval elapsed.
        const PERIODIC = 1 << 2;
    }
}

impl Serialize for UpdateTrigger {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.bits())
    }
}

/// Snapshot of one symbol's top of book, emitted after an applied event.
///
/// Depths are summed over the configured number of best levels. All money
/// fields are exact fixed-point; `imbalance` and `spread_bps` are derived
/// statistics and the only floating point in the structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BookUpdate {
    /// Timestamp of the event that produced this update (nanoseconds).
    pub ts: u64,
    /// Interned symbol.
    pub symbol: SymbolId,
    /// Best bid, if the bid side is non-empty.
    pub best_bid: Option<Price>,
    /// Best ask, if the ask side is non-empty.
    pub best_ask: Option<Price>,
    /// Floor midpoint of best bid and ask; `None` unless both exist.
    pub mid: Option<Price>,
    /// Cumulative volume over the top N bid levels.
    pub bid_depth: u64,
    /// Cumulative volume over the top N ask levels.
    pub ask_depth: u64,
    /// `(bid_depth - ask_depth) / (bid_depth + ask_depth)`, zero when both
    /// depths are zero.
    pub imbalance: f64,
    /// `best_ask - best_bid`; `None` unless both exist. Crossed books
    /// saturate to zero rather than going negative.
    pub spread: Option<Price>,
    /// Spread over mid, in basis points.
    pub spread_bps: Option<f64>,
    /// Why this update was emitted.
    pub trigger: UpdateTrigger,
}

impl BookUpdate {
    /// Basis points per unit of price ratio.
    const BPS: f64 = 10_000.0;

    /// Assemble an update from raw top-of-book state.
    #[must_use]
    pub fn assemble(
        ts: u64,
        symbol: SymbolId,
        best_bid: Option<Price>,
        best_ask: Option<Price>,
        bid_depth: u64,
        ask_depth: u64,
        trigger: UpdateTrigger,
    ) -> Self {
        let mid = match (best_bid, best_ask) {
            (Some(b), Some(a)) => Some(b.midpoint(a)),
            _ => None,
        };
        let spread = match (best_bid, best_ask) {
            (Some(b), Some(a)) => Some(Price::from_minor(a.minor().saturating_sub(b.minor()))),
            _ => None,
        };
        let spread_bps = match (spread, mid) {
            (Some(s), Some(m)) if !m.is_zero() => {
                Some(s.minor() as f64 / m.minor() as f64 * Self::BPS)
            }
            _ => None,
        };
        let total = bid_depth + ask_depth;
        let imbalance = if total == 0 {
            0.0
        } else {
            (bid_depth as f64 - ask_depth as f64) / total as f64
        };
        Self {
            ts,
            symbol,
            best_bid,
            best_ask,
            mid,
            bid_depth,
            ask_depth,
            imbalance,
            spread,
            spread_bps,
            trigger,
        }
    }

    /// Bid-to-ask liquidity ratio used by the reversion strategy.
    ///
    /// Positive infinity when the ask side is empty but bids exist; a
    /// neutral `1.0` when both depths are zero.
    #[must_use]
    pub fn liquidity_ratio(&self) -> f64 {
        if self.ask_depth == 0 {
            if self.bid_depth == 0 { 1.0 } else { f64::INFINITY }
        } else {
            self.bid_depth as f64 / self.ask_depth as f64
        }
    }
}
