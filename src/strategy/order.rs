//! Strategy-side orders and their state machine.

use crate::types::{Price, Qty, Side, SymbolId};
use serde::Serialize;
use std::fmt;

/// Identifier for a strategy order, monotonic from 1.
pub type StrategyOrderId = u64;

/// State machine: `Active -> {Filled, Canceled, Rejected}`. Terminal
/// states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderStatus {
    /// Resting, waiting to become fillable or to age out.
    Active,
    /// Settled atomically at its limit price.
    Filled,
    /// Timed out by the aging ring or canceled at shutdown.
    Canceled,
    /// Refused: the ledger refused the fill (insufficient cash or
    /// shares).
    Rejected,
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    /// Unrealized gain reached the profit target.
    ProfitTarget,
    /// Unrealized loss breached the stop.
    StopLoss,
    /// Hold time expired.
    MaxHold,
    /// The liquidity ratio returned to the neutral band.
    Normalized,
    /// End of stream or cooperative cancel.
    Shutdown,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitReason::ProfitTarget => "profit target",
            ExitReason::StopLoss => "stop loss",
            ExitReason::MaxHold => "max hold time",
            ExitReason::Normalized => "imbalance normalized",
            ExitReason::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// What an order is for: opening a position or closing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderIntent {
    /// Opens a new position.
    Entry,
    /// Closes the current position, for the given reason.
    Exit(ExitReason),
}

/// A simulated limit order placed by the strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyOrder {
    /// Order identifier.
    pub id: StrategyOrderId,
    /// Target symbol.
    pub symbol: SymbolId,
    /// Buy or sell.
    pub side: Side,
    /// Shares; fills are all-or-nothing.
    pub qty: Qty,
    /// Limit price; a fill settles exactly here.
    pub limit_price: Price,
    /// Current lifecycle state.
    pub status: OrderStatus,
    /// Ticks lived. Finalized when the order leaves `Active`.
    pub age_ticks: u32,
    /// Strategy tick at placement.
    pub placed_tick: u64,
    /// Timestamp of the update that triggered placement, nanoseconds.
    pub placed_ts: u64,
    /// Entry or exit.
    pub intent: OrderIntent,
}

impl StrategyOrder {
    /// Whether the order is still live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }
}
