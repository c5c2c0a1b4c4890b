//! Point-in-time views of a book, for reporting and inspection.

use crate::types::{Price, Side};
use serde::Serialize;

use super::level_book::PriceLevelBook;

/// One price level in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelSnapshot {
    /// Level price.
    pub price: Price,
    /// Aggregate resting volume at the level.
    pub volume: u64,
}

/// Full-depth view of one symbol's book: bids best-first (descending),
/// asks best-first (ascending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookSnapshot {
    /// Resolved symbol string.
    pub symbol: String,
    /// Bid levels, highest price first.
    pub bids: Vec<LevelSnapshot>,
    /// Ask levels, lowest price first.
    pub asks: Vec<LevelSnapshot>,
}

impl BookSnapshot {
    pub(super) fn capture(symbol: String, book: &PriceLevelBook) -> Self {
        let to_levels = |pairs: Vec<(Price, u64)>| {
            pairs
                .into_iter()
                .map(|(price, volume)| LevelSnapshot { price, volume })
                .collect()
        };
        Self {
            symbol,
            bids: to_levels(book.level_view(Side::Buy)),
            asks: to_levels(book.level_view(Side::Sell)),
        }
    }
}

/// Per-symbol summary statistics across the whole book depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolSummary {
    /// Resolved symbol string.
    pub symbol: String,
    /// Best bid, if any.
    pub best_bid: Option<Price>,
    /// Best ask, if any.
    pub best_ask: Option<Price>,
    /// `best_ask - best_bid` (saturating), if both exist.
    pub spread: Option<Price>,
    /// Spread over mid in basis points, if both exist.
    pub spread_bps: Option<f64>,
    /// Floor midpoint, if both exist.
    pub mid: Option<Price>,
    /// Total resting bid volume.
    pub bid_volume: u64,
    /// Total resting ask volume.
    pub ask_volume: u64,
    /// Whole-book volume imbalance in `[-1, 1]`; zero when empty.
    pub imbalance: f64,
    /// Number of bid levels.
    pub bid_levels: usize,
    /// Number of ask levels.
    pub ask_levels: usize,
}

impl SymbolSummary {
    pub(super) fn capture(symbol: String, book: &PriceLevelBook) -> Self {
        let best_bid = book.best(Side::Buy);
        let best_ask = book.best(Side::Sell);
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
                Some(s.minor() as f64 / m.minor() as f64 * 10_000.0)
            }
            _ => None,
        };
        let bid_volume = book.side_volume(Side::Buy);
        let ask_volume = book.side_volume(Side::Sell);
        let total = bid_volume + ask_volume;
        let imbalance = if total == 0 {
            0.0
        } else {
            (bid_volume as f64 - ask_volume as f64) / total as f64
        };
        Self {
            symbol,
            best_bid,
            best_ask,
            spread,
            spread_bps,
            mid,
            bid_volume,
            ask_volume,
            imbalance,
            bid_levels: book.level_count(Side::Buy),
            ask_levels: book.level_count(Side::Sell),
        }
    }
}
