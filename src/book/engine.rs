//! The book engine: sole writer of the order registry and every per-symbol
//! price-level book.
//!
//! Events are applied strictly in input order. Each event either fully
//! applies (registry and book mutate together) or has no visible effect;
//! every precondition is validated before the first mutation, and nothing
//! after the first mutation can fail.

use crate::config::EngineConfig;
use crate::types::{
    EventBody, EventKind, EventRecord, OrderRef, Price, Qty, Side, SymbolId, SymbolTable,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::error::BookError;
use super::history::{PriceHistory, PricePoint};
use super::level_book::PriceLevelBook;
use super::registry::{OrderRecord, OrderRegistry};
use super::snapshot::{BookSnapshot, SymbolSummary};
use super::stats::MessageStats;
use super::update::{BookUpdate, UpdateTrigger};

/// Last-emitted top-of-book state for one symbol, used by the emission
/// policy to decide whether an applied event is worth an update.
#[derive(Debug, Default, Clone, Copy)]
struct EmitState {
    best_bid: Option<Price>,
    best_ask: Option<Price>,
    bid_top: u64,
    ask_top: u64,
    last_emit_ts: u64,
}

/// Applies decoded events to per-symbol books and decides which of them
/// turn into [`BookUpdate`]s.
pub struct BookEngine {
    symbols: Arc<SymbolTable>,
    registry: OrderRegistry,
    books: HashMap<SymbolId, PriceLevelBook>,
    emit_state: HashMap<SymbolId, EmitState>,
    history: HashMap<SymbolId, PriceHistory>,
    stats: MessageStats,
    depth_levels: usize,
    emission_interval_ns: u64,
    price_history_depth: usize,
}

impl BookEngine {
    /// Create an engine with the book-side options of `config`.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            symbols: Arc::new(SymbolTable::new()),
            registry: OrderRegistry::new(),
            books: HashMap::new(),
            emit_state: HashMap::new(),
            history: HashMap::new(),
            stats: MessageStats::default(),
            depth_levels: config.depth_levels,
            emission_interval_ns: config.emission_tick_interval_ns,
            price_history_depth: config.price_history_depth,
        }
    }

    /// Apply one event and, per the emission policy, produce an update.
    ///
    /// Faulty events (unknown/duplicate references, zero prices) are
    /// counted, logged and dropped; they never abort the stream and never
    /// leave partial state behind.
    pub fn apply(&mut self, event: &EventRecord) -> Option<BookUpdate> {
        self.stats.total += 1;
        let kind = event.body.kind();
        let applied = match event.body {
            EventBody::Add {
                reference,
                side,
                shares,
                ref stock,
                price,
            } => self.apply_add(reference, side, shares, stock, price, event.ts),
            EventBody::Delete { reference } => self.apply_delete(reference),
            EventBody::Execute { reference, shares } => {
                self.apply_reduction(reference, shares, EventKind::Execute)
            }
            EventBody::Cancel { reference, shares } => {
                self.apply_reduction(reference, shares, EventKind::Cancel)
            }
            EventBody::Replace {
                reference,
                new_reference,
                shares,
                price,
            } => self.apply_replace(reference, new_reference, price, shares, event.ts),
        };
        match applied {
            Ok(symbol) => {
                trace!(%kind, ts = event.ts, %symbol, "event applied");
                self.evaluate_emission(symbol, event.ts)
            }
            Err(err) => {
                self.count_drop(kind, err);
                None
            }
        }
    }

    fn apply_add(
        &mut self,
        reference: OrderRef,
        side: Side,
        shares: Qty,
        stock: &str,
        price: Price,
        ts: u64,
    ) -> Result<SymbolId, BookError> {
        if price.is_zero() {
            return Err(BookError::InvalidPrice(reference));
        }
        if shares == 0 {
            return Err(BookError::InvalidQuantity(reference));
        }
        let symbol = self.symbols.intern(stock);
        self.registry.insert(OrderRecord {
            ref_id: reference,
            symbol,
            side,
            price,
            remaining: shares,
            arrival_ts: ts,
        })?;
        self.books
            .entry(symbol)
            .or_insert_with(|| PriceLevelBook::new(symbol))
            .add(side, price, u64::from(shares));
        self.stats.adds += 1;
        Ok(symbol)
    }

    fn apply_delete(&mut self, reference: OrderRef) -> Result<SymbolId, BookError> {
        let record = self.registry.remove(reference)?;
        self.book(record.symbol)
            .remove(record.side, record.price, u64::from(record.remaining));
        self.stats.deletes += 1;
        Ok(record.symbol)
    }

    /// Execute and Cancel have the same registry/book effect and differ
    /// only in which counter they bump.
    fn apply_reduction(
        &mut self,
        reference: OrderRef,
        shares: Qty,
        kind: EventKind,
    ) -> Result<SymbolId, BookError> {
        let record = self
            .registry
            .get(reference)
            .ok_or(BookError::UnknownRef(reference))?;
        let capped = shares.min(record.remaining);
        if capped < shares {
            self.stats.underflow_capped += 1;
            warn!(
                reference,
                requested = shares,
                remaining = record.remaining,
                "reduction exceeds remaining, capping"
            );
        }
        if capped > 0 {
            // Cannot fail: the record exists and capped <= remaining.
            self.registry
                .decrement(reference, capped)
                .expect("capped decrement cannot underflow");
            self.book(record.symbol)
                .remove(record.side, record.price, u64::from(capped));
        }
        match kind {
            EventKind::Cancel => self.stats.cancels += 1,
            _ => self.stats.executes += 1,
        }
        Ok(record.symbol)
    }

    fn apply_replace(
        &mut self,
        old_ref: OrderRef,
        new_ref: OrderRef,
        new_price: Price,
        new_qty: Qty,
        ts: u64,
    ) -> Result<SymbolId, BookError> {
        if new_price.is_zero() {
            return Err(BookError::InvalidPrice(new_ref));
        }
        if new_qty == 0 {
            return Err(BookError::InvalidQuantity(new_ref));
        }
        let old = self
            .registry
            .replace(old_ref, new_ref, new_price, new_qty, ts)?;
        let book = self.book(old.symbol);
        book.remove(old.side, old.price, u64::from(old.remaining));
        book.add(old.side, new_price, u64::from(new_qty));
        self.stats.replaces += 1;
        Ok(old.symbol)
    }

    fn book(&mut self, symbol: SymbolId) -> &PriceLevelBook {
        self.books
            .entry(symbol)
            .or_insert_with(|| PriceLevelBook::new(symbol))
    }

    fn count_drop(&mut self, kind: EventKind, err: BookError) {
        match err {
            BookError::UnknownRef(reference) => {
                self.stats.unknown_ref += 1;
                debug!(%kind, reference, "event for unknown reference dropped");
            }
            BookError::DuplicateRef(reference) => {
                self.stats.duplicate_ref += 1;
                warn!(%kind, reference, "duplicate reference dropped");
            }
            BookError::InvalidPrice(reference) | BookError::InvalidQuantity(reference) => {
                self.stats.rejected += 1;
                warn!(%kind, reference, %err, "event rejected");
            }
            // apply_reduction caps before decrementing, so the registry
            // never reports underflow from the event path.
            BookError::Underflow { reference, .. } => {
                self.stats.underflow_capped += 1;
                warn!(%kind, reference, %err, "underflow dropped");
            }
        }
    }

    /// Re-evaluate top-of-book after an applied event and emit an update
    /// when the emission policy says so.
    fn evaluate_emission(&mut self, symbol: SymbolId, ts: u64) -> Option<BookUpdate> {
        let book = self.books.get(&symbol)?;
        let best_bid = book.best(Side::Buy);
        let best_ask = book.best(Side::Sell);
        let bid_top = book.top_depth(Side::Buy, 1);
        let ask_top = book.top_depth(Side::Sell, 1);

        let state = self.emit_state.entry(symbol).or_default();
        let mut trigger = UpdateTrigger::empty();
        if state.best_bid != best_bid || state.best_ask != best_ask {
            trigger |= UpdateTrigger::BEST_CHANGED;
        }
        if state.bid_top != bid_top || state.ask_top != ask_top {
            trigger |= UpdateTrigger::TOP_VOLUME_CHANGED;
        }
        if self.emission_interval_ns > 0
            && ts.saturating_sub(state.last_emit_ts) >= self.emission_interval_ns
        {
            trigger |= UpdateTrigger::PERIODIC;
        }
        if trigger.is_empty() {
            return None;
        }

        state.best_bid = best_bid;
        state.best_ask = best_ask;
        state.bid_top = bid_top;
        state.ask_top = ask_top;
        state.last_emit_ts = ts;

        let update = BookUpdate::assemble(
            ts,
            symbol,
            best_bid,
            best_ask,
            book.top_depth(Side::Buy, self.depth_levels),
            book.top_depth(Side::Sell, self.depth_levels),
            trigger,
        );
        if let (Some(bid), Some(ask)) = (best_bid, best_ask) {
            let capacity = self.price_history_depth;
            self.history
                .entry(symbol)
                .or_insert_with(|| PriceHistory::new(capacity))
                .push(PricePoint { ts, bid, ask });
        }
        self.stats.updates_emitted += 1;
        Some(update)
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> &MessageStats {
        &self.stats
    }

    /// The symbol interner.
    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// A shareable handle to the interner, for the consumer side of the
    /// bus to resolve symbol ids back to strings. The table is append-only
    /// and only the book engine interns.
    #[must_use]
    pub fn symbols_handle(&self) -> Arc<SymbolTable> {
        Arc::clone(&self.symbols)
    }

    /// The order registry (read-only access for checks and tests).
    #[must_use]
    pub fn registry(&self) -> &OrderRegistry {
        &self.registry
    }

    /// The price-level book for `symbol`, if any event touched it.
    #[must_use]
    pub fn book_for(&self, symbol: SymbolId) -> Option<&PriceLevelBook> {
        self.books.get(&symbol)
    }

    /// Full-depth snapshot of one symbol's book.
    #[must_use]
    pub fn snapshot(&self, symbol: &str) -> Option<BookSnapshot> {
        let id = self.symbols.get(symbol)?;
        let book = self.books.get(&id)?;
        Some(BookSnapshot::capture(
            self.symbols.resolve(id)?,
            book,
        ))
    }

    /// Summary statistics for one symbol.
    #[must_use]
    pub fn summary(&self, symbol: &str) -> Option<SymbolSummary> {
        let id = self.symbols.get(symbol)?;
        let book = self.books.get(&id)?;
        Some(SymbolSummary::capture(self.symbols.resolve(id)?, book))
    }

    /// Summaries for every symbol seen so far, in id order.
    #[must_use]
    pub fn summaries(&self) -> Vec<SymbolSummary> {
        self.symbols
            .symbols()
            .into_iter()
            .filter_map(|name| self.summary(&name))
            .collect()
    }

    /// The recorded best-price trail for `symbol`, oldest first.
    #[must_use]
    pub fn price_history(&self, symbol: &str) -> Vec<PricePoint> {
        self.symbols
            .get(symbol)
            .and_then(|id| self.history.get(&id))
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }
}
