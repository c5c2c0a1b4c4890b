//! One symbol's two-sided, price-level-aggregated book.

use crate::types::{Price, Side, SymbolId};
use crossbeam::atomic::AtomicCell;
use crossbeam_skiplist::SkipMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache for best bid/ask so repeated top-of-book reads between mutations
/// skip the skip-list probe. Invalidated by every mutation of the side.
struct BestPriceCache {
    bid: AtomicCell<Option<Price>>,
    ask: AtomicCell<Option<Price>>,
    bid_valid: AtomicCell<bool>,
    ask_valid: AtomicCell<bool>,
}

impl BestPriceCache {
    fn new() -> Self {
        Self {
            bid: AtomicCell::new(None),
            ask: AtomicCell::new(None),
            bid_valid: AtomicCell::new(false),
            ask_valid: AtomicCell::new(false),
        }
    }

    fn get(&self, side: Side) -> Option<Option<Price>> {
        match side {
            Side::Buy if self.bid_valid.load() => Some(self.bid.load()),
            Side::Sell if self.ask_valid.load() => Some(self.ask.load()),
            _ => None,
        }
    }

    fn set(&self, side: Side, best: Option<Price>) {
        match side {
            Side::Buy => {
                self.bid.store(best);
                self.bid_valid.store(true);
            }
            Side::Sell => {
                self.ask.store(best);
                self.ask_valid.store(true);
            }
        }
    }

    fn invalidate(&self, side: Side) {
        match side {
            Side::Buy => self.bid_valid.store(false),
            Side::Sell => self.ask_valid.store(false),
        }
    }
}

/// Price-level-aggregated book for a single symbol.
///
/// Each side is an ordered skip list keyed by the integer price, mapping to
/// the aggregate resting volume at that level. Best bid is the last bid
/// entry, best ask the first ask entry, so retrieving the next extreme
/// after a best-level erasure is O(log L) rather than a full scan.
///
/// The book holds only aggregates; per-order state lives in the
/// [`OrderRegistry`](super::OrderRegistry). A level is erased the moment
/// its volume reaches zero — no zero-volume levels are ever observable.
pub struct PriceLevelBook {
    symbol: SymbolId,
    bids: SkipMap<u64, AtomicU64>,
    asks: SkipMap<u64, AtomicU64>,
    cache: BestPriceCache,
}

impl PriceLevelBook {
    /// Create an empty book for `symbol`.
    #[must_use]
    pub fn new(symbol: SymbolId) -> Self {
        Self {
            symbol,
            bids: SkipMap::new(),
            asks: SkipMap::new(),
            cache: BestPriceCache::new(),
        }
    }

    /// The symbol this book belongs to.
    #[must_use]
    pub fn symbol(&self) -> SymbolId {
        self.symbol
    }

    fn levels(&self, side: Side) -> &SkipMap<u64, AtomicU64> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Add `qty` shares at `price` on `side`, creating the level if needed.
    pub fn add(&self, side: Side, price: Price, qty: u64) {
        if qty == 0 {
            return;
        }
        self.levels(side)
            .get_or_insert(price.minor(), AtomicU64::new(0))
            .value()
            .fetch_add(qty, Ordering::Relaxed);
        self.cache.invalidate(side);
    }

    /// Remove up to `qty` shares at `price` on `side`, erasing the level
    /// when its volume reaches zero. Removing from a level that does not
    /// exist is a no-op (the registry has already validated the event).
    pub fn remove(&self, side: Side, price: Price, qty: u64) {
        let levels = self.levels(side);
        if let Some(entry) = levels.get(&price.minor()) {
            // Single-writer discipline: the BookEngine owns this book, so a
            // load/store pair cannot race with another mutation.
            let prev = entry.value().load(Ordering::Relaxed);
            let left = prev.saturating_sub(qty);
            entry.value().store(left, Ordering::Relaxed);
            if left == 0 {
                entry.remove();
            }
            self.cache.invalidate(side);
        }
    }

    /// Best price on `side`: highest bid, lowest ask.
    #[must_use]
    pub fn best(&self, side: Side) -> Option<Price> {
        if let Some(cached) = self.cache.get(side) {
            return cached;
        }
        let best = match side {
            Side::Buy => self.bids.back().map(|e| Price::from_minor(*e.key())),
            Side::Sell => self.asks.front().map(|e| Price::from_minor(*e.key())),
        };
        self.cache.set(side, best);
        best
    }

    /// Cumulative volume over the `n_levels` best levels on `side`.
    ///
    /// Returns zero for an empty side or `n_levels == 0`.
    #[must_use]
    pub fn top_depth(&self, side: Side, n_levels: usize) -> u64 {
        if n_levels == 0 {
            return 0;
        }
        match side {
            Side::Buy => self
                .bids
                .iter()
                .rev()
                .take(n_levels)
                .map(|e| e.value().load(Ordering::Relaxed))
                .sum(),
            Side::Sell => self
                .asks
                .iter()
                .take(n_levels)
                .map(|e| e.value().load(Ordering::Relaxed))
                .sum(),
        }
    }

    /// Total resting volume on `side`, across all levels.
    #[must_use]
    pub fn side_volume(&self, side: Side) -> u64 {
        self.levels(side)
            .iter()
            .map(|e| e.value().load(Ordering::Relaxed))
            .sum()
    }

    /// Number of distinct price levels on `side`.
    #[must_use]
    pub fn level_count(&self, side: Side) -> usize {
        self.levels(side).len()
    }

    /// All `(price, volume)` pairs on `side`, best price first.
    #[must_use]
    pub fn level_view(&self, side: Side) -> Vec<(Price, u64)> {
        let map = |e: crossbeam_skiplist::map::Entry<'_, u64, AtomicU64>| {
            (Price::from_minor(*e.key()), e.value().load(Ordering::Relaxed))
        };
        match side {
            Side::Buy => self.bids.iter().rev().map(map).collect(),
            Side::Sell => self.asks.iter().map(map).collect(),
        }
    }

    /// Whether both sides are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
