//! Trade ledger: positions, cash, realized/unrealized P&L and the
//! append-only trade record stream.
//!
//! All money is integer minor units. Positions track a signed net quantity
//! and a signed cost basis (negative for shorts, where the basis is the
//! entry proceeds), which keeps the accounting identity
//! `cash + basis - realized == initial_capital` exact at every fill, and
//! therefore `cash + Σ net·mid - initial == realized + unrealized` exact
//! at every mark.

mod metrics;
mod writer;

pub use metrics::{PerformanceMetrics, PerformanceSummary, PositionSummary};
pub use writer::LedgerWriter;

use crate::types::{Price, Qty, Side, SymbolId};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

/// Errors raised when a simulated fill cannot be honored. The order is
/// rejected; no position, cash or ledger state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A buy's notional exceeds available cash.
    #[error("insufficient cash: need {required} minor units, have {available}")]
    InsufficientCash {
        /// Notional of the rejected buy, in minor units.
        required: i64,
        /// Cash on hand, in minor units.
        available: i64,
    },

    /// A sell against a long position exceeds the shares held.
    #[error("insufficient shares: selling {requested}, holding {held}")]
    InsufficientShares {
        /// Shares the sell asked for.
        requested: Qty,
        /// Net long shares actually held.
        held: i64,
    },
}

/// Net position for one `(strategy, symbol)` pair.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Signed share count: positive long, negative short.
    pub net_qty: i64,
    /// Signed cost basis in minor units: entry cost for longs, negative
    /// entry proceeds for shorts. Zero when flat.
    pub basis: i64,
    /// Cumulative realized P&L for this symbol, in minor units.
    pub realized_pnl: i64,
}

impl Position {
    /// Whether the position is flat.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.net_qty == 0
    }

    /// Weighted-average entry price of the open side.
    #[must_use]
    pub fn avg_price(&self) -> Price {
        if self.net_qty == 0 {
            Price::ZERO
        } else {
            Price::from_minor((self.basis / self.net_qty).unsigned_abs())
        }
    }

    /// Mark-to-mid unrealized P&L in minor units.
    #[must_use]
    pub fn unrealized_at(&self, mid: Price) -> i64 {
        self.net_qty * mid.minor_i64() - self.basis
    }
}

/// One appended trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    /// Monotonic trade identifier, starting at 1.
    pub trade_id: u64,
    /// The strategy order that produced the fill.
    pub order_id: u64,
    /// Resolved symbol string.
    pub symbol: String,
    /// Fill side.
    pub side: Side,
    /// Filled shares.
    pub qty: Qty,
    /// Fill price (the order's limit).
    pub price: Price,
    /// Fill timestamp, nanoseconds.
    pub ts: u64,
    /// Realized P&L delta of this fill, minor units. Zero for fills that
    /// only open or extend a position.
    pub pnl: i64,
}

impl TradeRecord {
    /// CSV header, written once per file.
    pub const CSV_HEADER: &'static str = "trade_id,order_id,symbol,side,qty,price,ts,pnl";

    /// Render the record as one CSV row (no trailing newline).
    #[must_use]
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{}",
            self.trade_id,
            self.order_id,
            self.symbol,
            self.side,
            self.qty,
            self.price,
            self.ts,
            format_signed_minor(self.pnl)
        )
    }
}

/// Render signed minor units as a decimal with four fractional digits.
#[must_use]
pub(crate) fn format_signed_minor(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{}.{:04}", abs / 10_000, abs % 10_000)
}

/// The strategy's ledger: cash, per-symbol positions, trade history and
/// aggregate performance counters.
pub struct Ledger {
    cash: i64,
    initial_capital: i64,
    positions: HashMap<SymbolId, Position>,
    names: HashMap<SymbolId, String>,
    last_mid: HashMap<SymbolId, Price>,
    trades: Vec<TradeRecord>,
    next_trade_id: u64,
    realized_total: i64,
    closing_trades: u64,
    winning_trades: u64,
    losing_trades: u64,
    gross_profit: i64,
    gross_loss: i64,
    writer: Option<LedgerWriter>,
}

impl Ledger {
    /// Create a ledger funded with `initial_capital` minor units. When a
    /// writer is supplied, every trade and the final summary are handed to
    /// it by value; the data path never touches a file.
    #[must_use]
    pub fn new(initial_capital: i64, writer: Option<LedgerWriter>) -> Self {
        Self {
            cash: initial_capital,
            initial_capital,
            positions: HashMap::new(),
            names: HashMap::new(),
            last_mid: HashMap::new(),
            trades: Vec::new(),
            next_trade_id: 1,
            realized_total: 0,
            closing_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            gross_profit: 0,
            gross_loss: 0,
            writer,
        }
    }

    /// Record the latest mid for `symbol`; subsequent unrealized marks use
    /// it.
    pub fn mark(&mut self, symbol: SymbolId, mid: Price) {
        self.last_mid.insert(symbol, mid);
    }

    /// Apply one atomic fill.
    ///
    /// Buys are bounded by cash. Sells against a long position must not
    /// exceed the held quantity; sells from a flat or short position open
    /// or extend the short (that is how entries go short).
    ///
    /// # Errors
    /// [`LedgerError`] when the fill is rejected; nothing changes.
    pub fn fill(
        &mut self,
        order_id: u64,
        symbol: SymbolId,
        symbol_name: &str,
        side: Side,
        qty: Qty,
        price: Price,
        ts: u64,
    ) -> Result<TradeRecord, LedgerError> {
        let qty_i = i64::from(qty);
        let px = price.minor_i64();
        let pos = self.positions.entry(symbol).or_default();

        match side {
            Side::Buy => {
                let required = qty_i * px;
                if required > self.cash {
                    return Err(LedgerError::InsufficientCash {
                        required,
                        available: self.cash,
                    });
                }
            }
            Side::Sell => {
                if pos.net_qty > 0 && qty_i > pos.net_qty {
                    return Err(LedgerError::InsufficientShares {
                        requested: qty,
                        held: pos.net_qty,
                    });
                }
            }
        }

        // Closing portion: the part of the fill that offsets the existing
        // position. The basis share it consumes keeps whatever rounding is
        // left inside the remaining basis, so full closes consume the basis
        // exactly.
        let signed = if side == Side::Buy { qty_i } else { -qty_i };
        let closing = if pos.net_qty * signed < 0 {
            signed.abs().min(pos.net_qty.abs())
        } else {
            0
        };
        let mut realized_delta = 0i64;
        if closing > 0 {
            let basis_share = pos.basis * closing / pos.net_qty.abs();
            realized_delta = match side {
                Side::Sell => closing * px - basis_share,
                Side::Buy => -basis_share - closing * px,
            };
            pos.basis -= basis_share;
            pos.net_qty += if side == Side::Buy { closing } else { -closing };
            pos.realized_pnl += realized_delta;
        }

        let opening = qty_i - closing;
        if opening > 0 {
            match side {
                Side::Buy => {
                    pos.basis += opening * px;
                    pos.net_qty += opening;
                }
                Side::Sell => {
                    pos.basis -= opening * px;
                    pos.net_qty -= opening;
                }
            }
        }

        match side {
            Side::Buy => self.cash -= qty_i * px,
            Side::Sell => self.cash += qty_i * px,
        }

        self.realized_total += realized_delta;
        if closing > 0 {
            self.closing_trades += 1;
            if realized_delta > 0 {
                self.winning_trades += 1;
                self.gross_profit += realized_delta;
            } else if realized_delta < 0 {
                self.losing_trades += 1;
                self.gross_loss += -realized_delta;
            }
        }

        self.names
            .entry(symbol)
            .or_insert_with(|| symbol_name.to_string());

        let record = TradeRecord {
            trade_id: self.next_trade_id,
            order_id,
            symbol: symbol_name.to_string(),
            side,
            qty,
            price,
            ts,
            pnl: realized_delta,
        };
        self.next_trade_id += 1;
        info!(
            trade_id = record.trade_id,
            order_id,
            symbol = symbol_name,
            side = %side,
            qty,
            price = %price,
            pnl = %format_signed_minor(realized_delta),
            "fill"
        );
        if let Some(writer) = &self.writer {
            writer.record(record.clone());
        }
        self.trades.push(record.clone());
        Ok(record)
    }

    /// Current position for `symbol` (flat default).
    #[must_use]
    pub fn position(&self, symbol: SymbolId) -> Position {
        self.positions.get(&symbol).copied().unwrap_or_default()
    }

    /// Number of symbols with a non-zero position.
    #[must_use]
    pub fn open_position_count(&self) -> usize {
        self.positions.values().filter(|p| !p.is_flat()).count()
    }

    /// Cash on hand, minor units.
    #[must_use]
    pub fn cash(&self) -> i64 {
        self.cash
    }

    /// The funding the ledger started with, minor units.
    #[must_use]
    pub fn initial_capital(&self) -> i64 {
        self.initial_capital
    }

    /// All trades appended so far, in order.
    #[must_use]
    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// Total unrealized P&L, marked at each symbol's latest mid. A symbol
    /// that never had a two-sided book contributes zero.
    #[must_use]
    pub fn unrealized_total(&self) -> i64 {
        self.positions
            .iter()
            .map(|(symbol, pos)| match self.last_mid.get(symbol) {
                Some(mid) => pos.unrealized_at(*mid),
                None => 0,
            })
            .sum()
    }

    /// Aggregate performance metrics at this instant.
    #[must_use]
    pub fn metrics(&self) -> PerformanceMetrics {
        let unrealized = self.unrealized_total();
        PerformanceMetrics {
            total_pnl: self.realized_total + unrealized,
            realized_pnl: self.realized_total,
            unrealized_pnl: unrealized,
            num_trades: self.closing_trades,
            winning_trades: self.winning_trades,
            losing_trades: self.losing_trades,
            win_rate: if self.closing_trades > 0 {
                self.winning_trades as f64 / self.closing_trades as f64 * 100.0
            } else {
                0.0
            },
            avg_profit: if self.winning_trades > 0 {
                self.gross_profit as f64 / self.winning_trades as f64 / 10_000.0
            } else {
                0.0
            },
            avg_loss: if self.losing_trades > 0 {
                -(self.gross_loss as f64) / self.losing_trades as f64 / 10_000.0
            } else {
                0.0
            },
            profit_factor: if self.gross_loss > 0 {
                self.gross_profit as f64 / self.gross_loss as f64
            } else if self.gross_profit > 0 {
                f64::INFINITY
            } else {
                0.0
            },
        }
    }

    /// Build the end-of-run summary, hand it to the writer (if any) and
    /// flush. Consumes nothing; the ledger stays queryable.
    pub fn finalize(&mut self, duration_seconds: f64) -> PerformanceSummary {
        let summary = PerformanceSummary::build(self, duration_seconds);
        if let Some(writer) = &self.writer {
            writer.summary(summary.clone());
            writer.flush();
        }
        summary
    }

    /// Detach and join the background writer, flushing everything queued.
    pub fn close_writer(&mut self) {
        if let Some(writer) = self.writer.take() {
            writer.close();
        }
    }

    pub(crate) fn position_summaries(&self) -> Vec<PositionSummary> {
        let mut ids: Vec<SymbolId> = self
            .positions
            .iter()
            .filter(|(_, p)| !p.is_flat() || p.realized_pnl != 0)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids.into_iter()
            .map(|id| {
                let pos = self.positions[&id];
                let current = self.last_mid.get(&id).copied();
                PositionSummary {
                    symbol: self.names.get(&id).cloned().unwrap_or_default(),
                    quantity: pos.net_qty,
                    avg_price: pos.avg_price(),
                    current_price: current,
                    unrealized_pnl: current.map_or(0, |mid| pos.unrealized_at(mid)) as f64
                        / 10_000.0,
                    realized_pnl: pos.realized_pnl as f64 / 10_000.0,
                }
            })
            .collect()
    }
}
