//! The liquidity-reversion strategy engine.
//!
//! Consumes book updates from the bus, watches the bid/ask liquidity ratio
//! per symbol, and trades the reversion: persistent excess bid liquidity is
//! faded with a short at the bid, excess ask liquidity bought at the ask.
//! Positions exit on profit target, stop loss, hold-time expiry, or when
//! the ratio returns to the neutral band.
//!
//! Simulated fills are immediate-or-nothing at the order's limit against
//! the current top of book. An order whose target side is not quoting
//! through its limit, or lacks the depth for a full fill, stays `Active`
//! and is timed out by the aging ring. `Rejected` is reserved for ledger
//! refusals (insufficient cash or shares).

use crate::book::BookUpdate;
use crate::config::EngineConfig;
use crate::ledger::{Ledger, PerformanceSummary};
use crate::types::{Price, Side, SymbolId, SymbolTable};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::aging::AgeBuckets;
use super::order::{ExitReason, OrderIntent, OrderStatus, StrategyOrder, StrategyOrderId};

/// Rolling per-symbol strategy state.
struct SymbolState {
    /// Last K updates for the symbol, oldest first.
    history: VecDeque<BookUpdate>,
    /// Consecutive ticks with the ratio at or above the threshold.
    short_streak: u32,
    /// Consecutive ticks with the ratio at or below the reciprocal.
    long_streak: u32,
    /// Ticks the current position has been held.
    hold_ticks: u32,
    /// Live entry order, if one is working.
    pending_entry: Option<StrategyOrderId>,
    /// Live exit order, if one is working.
    pending_exit: Option<StrategyOrderId>,
}

impl SymbolState {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            short_streak: 0,
            long_streak: 0,
            hold_ticks: 0,
            pending_entry: None,
            pending_exit: None,
        }
    }
}

/// Event-driven trading engine over the book-update stream.
pub struct StrategyEngine {
    config: EngineConfig,
    symbols: Arc<SymbolTable>,
    ledger: Ledger,
    orders: HashMap<StrategyOrderId, StrategyOrder>,
    /// Active order ids per symbol; the per-symbol set is small.
    active_orders: HashMap<SymbolId, Vec<StrategyOrderId>>,
    aging: AgeBuckets,
    state: HashMap<SymbolId, SymbolState>,
    next_order_id: StrategyOrderId,
    /// Consumed updates, across all symbols.
    tick: u64,
}

impl StrategyEngine {
    /// Create an engine with the given configuration, interner handle and
    /// funded ledger.
    #[must_use]
    pub fn new(config: EngineConfig, symbols: Arc<SymbolTable>, ledger: Ledger) -> Self {
        let aging = AgeBuckets::new(config.order_timeout_ticks);
        Self {
            config,
            symbols,
            ledger,
            orders: HashMap::new(),
            active_orders: HashMap::new(),
            aging,
            state: HashMap::new(),
            next_order_id: 1,
            tick: 0,
        }
    }

    /// Process one book update (one strategy tick).
    pub fn on_update(&mut self, update: &BookUpdate) {
        self.tick += 1;

        // 1. Age: orders in the expiring bucket are canceled; the ring
        //    shifts so orders placed this tick start at age zero.
        for id in self.aging.rotate() {
            self.cancel_order(id, "order timeout");
        }

        // 2. Rolling buffer and mark-to-mid.
        let symbol = update.symbol;
        let state = self.state.entry(symbol).or_insert_with(SymbolState::new);
        if state.history.len() == self.config.history_ticks {
            state.history.pop_front();
        }
        state.history.push_back(*update);
        if let Some(mid) = update.mid {
            self.ledger.mark(symbol, mid);
        }

        // 3. Work resting orders against the fresh top of book.
        self.try_fills(update);

        // 4. Signals.
        if self.ledger.position(symbol).is_flat() {
            self.consider_entry(update);
        } else {
            self.consider_exit(update);
        }
    }

    /// End of stream or cooperative cancel: cancel every active order,
    /// leave positions marked at the last mid, flush the ledger and return
    /// the final summary.
    pub fn finish(&mut self, duration_seconds: f64) -> PerformanceSummary {
        let live: Vec<StrategyOrderId> = self
            .orders
            .values()
            .filter(|o| o.is_active())
            .map(|o| o.id)
            .collect();
        for id in live {
            self.cancel_order(id, "shutdown");
        }
        let summary = self.ledger.finalize(duration_seconds);
        self.ledger.close_writer();
        info!(
            total_pnl = summary.total_pnl,
            num_trades = summary.num_trades,
            "strategy finished"
        );
        summary
    }

    fn consider_entry(&mut self, update: &BookUpdate) {
        let symbol = update.symbol;
        let ratio = update.liquidity_ratio();
        let threshold = self.config.liquidity_threshold;

        let state = self.state.get_mut(&symbol).expect("state exists");
        if ratio >= threshold {
            state.short_streak += 1;
            state.long_streak = 0;
        } else if ratio <= 1.0 / threshold {
            state.long_streak += 1;
            state.short_streak = 0;
        } else {
            state.short_streak = 0;
            state.long_streak = 0;
        }

        if state.pending_entry.is_some() || state.pending_exit.is_some() {
            return;
        }
        let go_short = state.short_streak >= self.config.min_consecutive_ticks;
        let go_long = state.long_streak >= self.config.min_consecutive_ticks;
        if !go_short && !go_long {
            return;
        }
        if self.config.min_depth_shares > 0
            && update.bid_depth + update.ask_depth < self.config.min_depth_shares
        {
            return;
        }
        if self.ledger.open_position_count() >= self.config.max_positions as usize {
            debug!(%symbol, "entry suppressed: position cap reached");
            return;
        }

        let qty = self.config.position_size;
        if go_short {
            // Crowded bid: fade it by selling at the bid.
            let Some(bid) = update.best_bid else { return };
            info!(%symbol, ratio, price = %bid, "short entry signal");
            let id = self.place_order(symbol, Side::Sell, qty, bid, OrderIntent::Entry, update);
            self.state.get_mut(&symbol).expect("state exists").pending_entry = id;
        } else {
            let Some(ask) = update.best_ask else { return };
            info!(%symbol, ratio, price = %ask, "long entry signal");
            let id = self.place_order(symbol, Side::Buy, qty, ask, OrderIntent::Entry, update);
            self.state.get_mut(&symbol).expect("state exists").pending_entry = id;
        }
    }

    fn consider_exit(&mut self, update: &BookUpdate) {
        let symbol = update.symbol;
        let position = self.ledger.position(symbol);
        let is_long = position.net_qty > 0;
        let qty = position.net_qty.unsigned_abs() as u32;
        let entry = position.avg_price();
        let ratio = update.liquidity_ratio();
        let threshold = self.config.liquidity_threshold;

        let state = self.state.get_mut(&symbol).expect("state exists");
        state.hold_ticks += 1;
        if state.pending_exit.is_some() {
            return;
        }

        // Exit prices sit at the opposite top of book; without it there is
        // nothing to price the exit against this tick.
        let exit_price = if is_long {
            update.best_bid
        } else {
            update.best_ask
        };
        let Some(exit_price) = exit_price else {
            return;
        };

        let change = if entry.is_zero() {
            0.0
        } else {
            let signed =
                exit_price.minor_i64() - entry.minor_i64();
            let signed = if is_long { signed } else { -signed };
            signed as f64 / entry.minor() as f64
        };

        let reason = if change >= self.config.profit_target_pct {
            Some(ExitReason::ProfitTarget)
        } else if change <= -self.config.stop_loss_pct {
            Some(ExitReason::StopLoss)
        } else if state.hold_ticks >= self.config.hold_time_ticks {
            Some(ExitReason::MaxHold)
        } else if ratio > 1.0 / threshold && ratio < threshold {
            Some(ExitReason::Normalized)
        } else {
            None
        };
        let Some(reason) = reason else { return };

        info!(%symbol, %reason, pct = change, price = %exit_price, "exit signal");
        let side = if is_long { Side::Sell } else { Side::Buy };
        let id = self.place_order(symbol, side, qty, exit_price, OrderIntent::Exit(reason), update);
        self.state.get_mut(&symbol).expect("state exists").pending_exit = id;
    }

    /// Create an order, register it with the aging ring and evaluate it
    /// against the current update. Returns the id while the order is still
    /// active, `None` if it settled immediately.
    fn place_order(
        &mut self,
        symbol: SymbolId,
        side: Side,
        qty: u32,
        limit_price: Price,
        intent: OrderIntent,
        update: &BookUpdate,
    ) -> Option<StrategyOrderId> {
        let id = self.next_order_id;
        self.next_order_id += 1;
        let order = StrategyOrder {
            id,
            symbol,
            side,
            qty,
            limit_price,
            status: OrderStatus::Active,
            age_ticks: 0,
            placed_tick: self.tick,
            placed_ts: update.ts,
            intent,
        };
        debug!(order_id = id, %symbol, %side, qty, price = %limit_price, "order placed");
        self.orders.insert(id, order);
        self.active_orders.entry(symbol).or_default().push(id);
        self.aging.push(id);

        self.evaluate_order(id, update);
        self.orders
            .get(&id)
            .filter(|o| o.is_active())
            .map(|o| o.id)
    }

    /// Re-evaluate every active order for the updated symbol.
    fn try_fills(&mut self, update: &BookUpdate) {
        let ids = match self.active_orders.get(&update.symbol) {
            Some(ids) if !ids.is_empty() => ids.clone(),
            _ => return,
        };
        for id in ids {
            self.evaluate_order(id, update);
        }
    }

    /// Immediate-or-nothing evaluation of one order against the current
    /// top of book.
    fn evaluate_order(&mut self, id: StrategyOrderId, update: &BookUpdate) {
        let Some(order) = self.orders.get(&id).copied() else {
            return;
        };
        if !order.is_active() {
            return;
        }

        // A buy takes from the ask side, a sell hits the bid side.
        let (quote, depth) = match order.side {
            Side::Buy => (update.best_ask, update.ask_depth),
            Side::Sell => (update.best_bid, update.bid_depth),
        };
        let marketable = match (order.side, quote) {
            (Side::Buy, Some(ask)) => ask <= order.limit_price,
            (Side::Sell, Some(bid)) => bid >= order.limit_price,
            (_, None) => false,
        };
        if !marketable || depth < u64::from(order.qty) {
            return;
        }

        let symbol_name = self
            .symbols
            .resolve(order.symbol)
            .unwrap_or_else(|| order.symbol.to_string());
        let fill = self.ledger.fill(
            order.id,
            order.symbol,
            &symbol_name,
            order.side,
            order.qty,
            order.limit_price,
            update.ts,
        );
        match fill {
            Ok(_) => self.settle(order, OrderStatus::Filled),
            Err(err) => {
                warn!(order_id = order.id, %err, "fill refused, order rejected");
                self.settle(order, OrderStatus::Rejected);
            }
        }
    }

    /// Move an order out of `Active` and update the symbol state that was
    /// waiting on it.
    fn settle(&mut self, order: StrategyOrder, status: OrderStatus) {
        let age = (self.tick - order.placed_tick) as u32;
        if let Some(stored) = self.orders.get_mut(&order.id) {
            stored.status = status;
            stored.age_ticks = age;
        }
        if let Some(ids) = self.active_orders.get_mut(&order.symbol) {
            ids.retain(|other| *other != order.id);
        }
        let state = self
            .state
            .entry(order.symbol)
            .or_insert_with(SymbolState::new);
        if state.pending_entry == Some(order.id) {
            state.pending_entry = None;
        }
        if state.pending_exit == Some(order.id) {
            state.pending_exit = None;
        }
        if status == OrderStatus::Filled {
            match order.intent {
                OrderIntent::Entry => {
                    state.hold_ticks = 0;
                    state.short_streak = 0;
                    state.long_streak = 0;
                }
                OrderIntent::Exit(_) => {
                    state.hold_ticks = 0;
                }
            }
        }
    }

    fn cancel_order(&mut self, id: StrategyOrderId, why: &str) {
        let Some(order) = self.orders.get(&id).copied() else {
            return;
        };
        if !order.is_active() {
            return;
        }
        info!(order_id = id, symbol = %order.symbol, why, "order canceled");
        self.settle(order, OrderStatus::Canceled);
    }

    /// Look up an order by id.
    #[must_use]
    pub fn order(&self, id: StrategyOrderId) -> Option<&StrategyOrder> {
        self.orders.get(&id)
    }

    /// All orders ever placed, in placement order.
    #[must_use]
    pub fn orders(&self) -> Vec<&StrategyOrder> {
        let mut all: Vec<&StrategyOrder> = self.orders.values().collect();
        all.sort_by_key(|o| o.id);
        all
    }

    /// Net position for `symbol`.
    #[must_use]
    pub fn position(&self, symbol: SymbolId) -> i64 {
        self.ledger.position(symbol).net_qty
    }

    /// The rolling buffer of the last K updates seen for `symbol`, oldest
    /// first.
    #[must_use]
    pub fn recent_updates(&self, symbol: SymbolId) -> Vec<BookUpdate> {
        self.state
            .get(&symbol)
            .map(|s| s.history.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The ledger (positions, trades, metrics).
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Consumed update count.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::UpdateTrigger;

    const SYM: SymbolId = SymbolId(0);

    fn p(minor: u64) -> Price {
        Price::from_minor(minor)
    }

    fn table() -> Arc<SymbolTable> {
        let t = SymbolTable::new();
        t.intern("AAA");
        Arc::new(t)
    }

    fn engine_with(config: EngineConfig) -> StrategyEngine {
        let ledger = Ledger::new(config.initial_capital, None);
        StrategyEngine::new(config, table(), ledger)
    }

    fn engine() -> StrategyEngine {
        engine_with(EngineConfig::default())
    }

    fn update(ts: u64, bid: u64, ask: u64, bid_depth: u64, ask_depth: u64) -> BookUpdate {
        BookUpdate::assemble(
            ts,
            SYM,
            (bid > 0).then(|| p(bid)),
            (ask > 0).then(|| p(ask)),
            bid_depth,
            ask_depth,
            UpdateTrigger::BEST_CHANGED,
        )
    }

    #[test]
    fn persistent_bid_excess_enters_short() {
        // Ratio 3.0 >= 1.5 for five consecutive ticks: short at the bid.
        let mut eng = engine();
        for ts in 1..=4 {
            eng.on_update(&update(ts, 1_000_000, 1_000_100, 300, 100));
            assert_eq!(eng.position(SYM), 0);
        }
        eng.on_update(&update(5, 1_000_000, 1_000_100, 300, 100));
        assert_eq!(eng.position(SYM), -100);

        let fill = &eng.ledger().trades()[0];
        assert_eq!(fill.side, Side::Sell);
        assert_eq!(fill.price, p(1_000_000));
    }

    #[test]
    fn persistent_ask_excess_enters_long() {
        let mut eng = engine();
        for ts in 1..=5 {
            eng.on_update(&update(ts, 1_000_000, 1_000_100, 100, 300));
        }
        assert_eq!(eng.position(SYM), 100);
        assert_eq!(eng.ledger().trades()[0].price, p(1_000_100));
    }

    #[test]
    fn broken_streak_resets_the_count() {
        let mut eng = engine();
        for ts in 1..=4 {
            eng.on_update(&update(ts, 1_000_000, 1_000_100, 300, 100));
        }
        // Neutral tick breaks the streak.
        eng.on_update(&update(5, 1_000_000, 1_000_100, 100, 100));
        for ts in 6..=9 {
            eng.on_update(&update(ts, 1_000_000, 1_000_100, 300, 100));
            assert_eq!(eng.position(SYM), 0);
        }
        eng.on_update(&update(10, 1_000_000, 1_000_100, 300, 100));
        assert_eq!(eng.position(SYM), -100);
    }

    #[test]
    fn thin_target_side_leaves_order_active_until_timeout() {
        // Signal fires but the bid side never has the 100 shares the
        // entry needs, so the order rests and ages out.
        let mut eng = engine();
        for ts in 1..=5 {
            eng.on_update(&update(ts, 1_000_000, 1_000_100, 60, 20));
        }
        assert_eq!(eng.position(SYM), 0);
        let id = eng.orders().last().unwrap().id;
        assert_eq!(eng.order(id).unwrap().status, OrderStatus::Active);

        let timeout = eng.config.order_timeout_ticks as u64;
        for ts in 6..=(5 + timeout) {
            eng.on_update(&update(ts, 1_000_000, 1_000_100, 60, 20));
            assert_eq!(eng.order(id).unwrap().status, OrderStatus::Active);
        }
        eng.on_update(&update(6 + timeout, 1_000_000, 1_000_100, 60, 20));
        assert_eq!(eng.order(id).unwrap().status, OrderStatus::Canceled);
    }

    #[test]
    fn profit_target_exit_realizes_gain() {
        // Long at the ask, then the bid runs through the profit target.
        let config = EngineConfig {
            min_consecutive_ticks: 1,
            ..EngineConfig::default()
        };
        let mut eng = engine_with(config);
        eng.on_update(&update(1, 999_900, 1_000_000, 100, 300));
        assert_eq!(eng.position(SYM), 100);

        // 100.05 bid vs 100.00 entry: +0.05% >= 0.05% target.
        eng.on_update(&update(2, 1_000_500, 1_000_600, 300, 300));
        assert_eq!(eng.position(SYM), 0);

        let trades = eng.ledger().trades();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[1].price, p(1_000_500));
        // 0.0500 per share on 100 shares.
        assert_eq!(trades[1].pnl, 50_000);
    }

    #[test]
    fn stop_loss_exit_cuts_the_position() {
        let config = EngineConfig {
            min_consecutive_ticks: 1,
            ..EngineConfig::default()
        };
        let mut eng = engine_with(config);
        eng.on_update(&update(1, 999_900, 1_000_000, 100, 300));
        assert_eq!(eng.position(SYM), 100);

        // Bid collapses 0.04% below entry, past the 0.03% stop.
        eng.on_update(&update(2, 999_600, 999_700, 300, 300));
        assert_eq!(eng.position(SYM), 0);
        assert!(eng.ledger().trades()[1].pnl < 0);
    }

    #[test]
    fn hold_time_forces_an_exit() {
        let config = EngineConfig {
            min_consecutive_ticks: 1,
            hold_time_ticks: 3,
            ..EngineConfig::default()
        };
        let mut eng = engine_with(config);
        // Enter long on ask excess; keep the ratio in the entry zone and
        // the price pinned so no other exit fires.
        eng.on_update(&update(1, 999_900, 1_000_000, 100, 300));
        assert_eq!(eng.position(SYM), 100);

        eng.on_update(&update(2, 999_900, 1_000_000, 100, 300));
        eng.on_update(&update(3, 999_900, 1_000_000, 100, 300));
        assert_eq!(eng.position(SYM), 100);
        eng.on_update(&update(4, 999_900, 1_000_000, 100, 300));
        assert_eq!(eng.position(SYM), 0);
    }

    #[test]
    fn normalized_ratio_exits_early() {
        let config = EngineConfig {
            min_consecutive_ticks: 1,
            ..EngineConfig::default()
        };
        let mut eng = engine_with(config);
        eng.on_update(&update(1, 999_900, 1_000_000, 100, 300));
        assert_eq!(eng.position(SYM), 100);

        // Ratio back inside (1/1.5, 1.5): exit at the bid.
        eng.on_update(&update(2, 999_900, 1_000_000, 120, 100));
        assert_eq!(eng.position(SYM), 0);
    }

    #[test]
    fn position_cap_suppresses_new_entries() {
        let config = EngineConfig {
            min_consecutive_ticks: 1,
            max_positions: 1,
            ..EngineConfig::default()
        };
        let ledger = Ledger::new(config.initial_capital, None);
        let table = SymbolTable::new();
        table.intern("AAA");
        table.intern("BBB");
        let mut eng = StrategyEngine::new(config, Arc::new(table), ledger);

        let mut u0 = update(1, 999_900, 1_000_000, 100, 300);
        u0.symbol = SymbolId(0);
        eng.on_update(&u0);
        assert_eq!(eng.position(SymbolId(0)), 100);

        // Second symbol sees the same signal but the cap is reached.
        let mut u1 = update(2, 999_900, 1_000_000, 100, 300);
        u1.symbol = SymbolId(1);
        eng.on_update(&u1);
        assert_eq!(eng.position(SymbolId(1)), 0);
    }

    #[test]
    fn short_entry_with_empty_ask_side_uses_infinite_ratio() {
        let mut eng = engine();
        for ts in 1..=5 {
            eng.on_update(&update(ts, 1_000_000, 0, 300, 0));
        }
        assert_eq!(eng.position(SYM), -100);
    }

    #[test]
    fn finish_cancels_active_orders_and_reports() {
        let mut eng = engine();
        // Leave a resting entry behind (thin bid side).
        for ts in 1..=5 {
            eng.on_update(&update(ts, 1_000_000, 1_000_100, 60, 20));
        }
        let id = eng.orders().last().unwrap().id;
        assert_eq!(eng.order(id).unwrap().status, OrderStatus::Active);

        let summary = eng.finish(1.0);
        assert_eq!(eng.order(id).unwrap().status, OrderStatus::Canceled);
        assert_eq!(summary.num_trades, 0);
        assert_eq!(summary.initial_capital, 1_000_000.0);
    }

    #[test]
    fn rolling_buffer_is_bounded_to_k_updates() {
        let config = EngineConfig {
            history_ticks: 3,
            liquidity_threshold: 10.0,
            ..EngineConfig::default()
        };
        let mut eng = engine_with(config);
        for ts in 1..=5 {
            eng.on_update(&update(ts, 1_000_000, 1_000_100, 100, 100));
        }
        let recent = eng.recent_updates(SYM);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.first().unwrap().ts, 3);
        assert_eq!(recent.last().unwrap().ts, 5);
    }

    #[test]
    fn exit_settles_before_reentry_signals() {
        // After a round trip the streaks restart from zero.
        let config = EngineConfig {
            min_consecutive_ticks: 2,
            ..EngineConfig::default()
        };
        let mut eng = engine_with(config);
        eng.on_update(&update(1, 999_900, 1_000_000, 100, 300));
        eng.on_update(&update(2, 999_900, 1_000_000, 100, 300));
        assert_eq!(eng.position(SYM), 100);

        // Profit exit.
        eng.on_update(&update(3, 1_000_500, 1_000_600, 300, 300));
        assert_eq!(eng.position(SYM), 0);

        // One long tick is not enough to re-enter with K=2.
        eng.on_update(&update(4, 999_900, 1_000_000, 100, 300));
        assert_eq!(eng.position(SYM), 0);
        eng.on_update(&update(5, 999_900, 1_000_000, 100, 300));
        assert_eq!(eng.position(SYM), 100);
    }
}
