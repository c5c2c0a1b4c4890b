//! Aggregate performance metrics and the end-of-run summary.

use crate::types::Price;
use chrono::Utc;
use serde::Serialize;

use super::Ledger;

/// Process-wide performance counters, computable at any instant.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Realized plus unrealized P&L, minor units.
    pub total_pnl: i64,
    /// Realized P&L over closed share-lots, minor units.
    pub realized_pnl: i64,
    /// Mark-to-mid P&L of open positions, minor units.
    pub unrealized_pnl: i64,
    /// Number of closing fills.
    pub num_trades: u64,
    /// Closing fills with positive realized P&L.
    pub winning_trades: u64,
    /// Closing fills with negative realized P&L.
    pub losing_trades: u64,
    /// `winning / num_trades`, as a percentage.
    pub win_rate: f64,
    /// Mean profit of winning fills, in currency units.
    pub avg_profit: f64,
    /// Mean loss of losing fills, in currency units (negative).
    pub avg_loss: f64,
    /// `gross_profit / gross_loss`; infinite when there are profits but no
    /// losses, zero otherwise.
    pub profit_factor: f64,
}

/// One open or historical position in the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSummary {
    /// Resolved symbol string.
    pub symbol: String,
    /// Signed net share count at end of run.
    pub quantity: i64,
    /// Weighted-average entry price of the open side.
    pub avg_price: Price,
    /// Latest mid, if the book was ever two-sided.
    pub current_price: Option<Price>,
    /// Mark-to-mid unrealized P&L, currency units.
    pub unrealized_pnl: f64,
    /// Realized P&L for the symbol, currency units.
    pub realized_pnl: f64,
}

/// The JSON document written at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    /// Wall-clock time the summary was produced.
    pub timestamp: String,
    /// Run duration in seconds.
    pub duration_seconds: f64,
    /// Starting cash, currency units.
    pub initial_capital: f64,
    /// Cash plus holdings marked at the latest mid, currency units.
    pub final_capital: f64,
    /// Realized plus unrealized P&L, currency units.
    pub total_pnl: f64,
    /// Realized P&L, currency units.
    pub realized_pnl: f64,
    /// Unrealized P&L, currency units.
    pub unrealized_pnl: f64,
    /// Number of closing fills.
    pub num_trades: u64,
    /// Closing fills with positive realized P&L.
    pub winning_trades: u64,
    /// Closing fills with negative realized P&L.
    pub losing_trades: u64,
    /// Winning percentage.
    pub win_rate: f64,
    /// Mean winning P&L, currency units.
    pub avg_profit: f64,
    /// Mean losing P&L, currency units (negative).
    pub avg_loss: f64,
    /// Gross profit over gross loss.
    pub profit_factor: f64,
    /// Per-symbol position detail.
    pub positions: Vec<PositionSummary>,
}

impl PerformanceSummary {
    const MINOR: f64 = 10_000.0;

    pub(super) fn build(ledger: &Ledger, duration_seconds: f64) -> Self {
        let metrics = ledger.metrics();
        let holdings: i64 = ledger
            .positions
            .iter()
            .filter_map(|(symbol, pos)| {
                ledger
                    .last_mid
                    .get(symbol)
                    .map(|mid| pos.net_qty * mid.minor_i64())
            })
            .sum();
        Self {
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            duration_seconds,
            initial_capital: ledger.initial_capital() as f64 / Self::MINOR,
            final_capital: (ledger.cash() + holdings) as f64 / Self::MINOR,
            total_pnl: metrics.total_pnl as f64 / Self::MINOR,
            realized_pnl: metrics.realized_pnl as f64 / Self::MINOR,
            unrealized_pnl: metrics.unrealized_pnl as f64 / Self::MINOR,
            num_trades: metrics.num_trades,
            winning_trades: metrics.winning_trades,
            losing_trades: metrics.losing_trades,
            win_rate: metrics.win_rate,
            avg_profit: metrics.avg_profit,
            avg_loss: metrics.avg_loss,
            profit_factor: metrics.profit_factor,
            positions: ledger.position_summaries(),
        }
    }
}
