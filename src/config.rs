//! Engine and strategy configuration.

use crate::types::PRICE_SCALE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// A configuration option failed validation at startup.
///
/// Configuration errors fail fast: there is no sensible way to run with a
/// broken parameter set, so hosts map this to exit code 2.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration: {option} {reason}")]
pub struct ConfigError {
    /// The offending option name.
    pub option: &'static str,
    /// Why the value was rejected.
    pub reason: String,
}

impl ConfigError {
    fn new(option: &'static str, reason: impl Into<String>) -> Self {
        Self {
            option,
            reason: reason.into(),
        }
    }
}

/// All tunable options for one engine + strategy run.
///
/// Every field has the documented default, so `EngineConfig::default()` is
/// a valid, runnable configuration. Deserialization fills missing fields
/// from the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Entry ratio: enter when bid/ask depth ratio reaches this (short) or
    /// its reciprocal (long). Must be >= 1.0.
    pub liquidity_threshold: f64,
    /// Ticks the entry condition must hold consecutively before entering.
    pub min_consecutive_ticks: u32,
    /// Shares per strategy position.
    pub position_size: u32,
    /// Maximum ticks a position is held before a forced exit.
    pub hold_time_ticks: u32,
    /// Fractional gain that triggers a profit-target exit.
    pub profit_target_pct: f64,
    /// Fractional loss that triggers a stop-loss exit.
    pub stop_loss_pct: f64,
    /// Ticks an unfilled strategy order lives before cancellation by age.
    pub order_timeout_ticks: u32,
    /// Maximum number of symbols with a non-zero position at once.
    pub max_positions: u32,
    /// Starting cash, in minor units (1/10000 of a currency unit).
    pub initial_capital: i64,
    /// Market-data bus capacity, in updates.
    pub bus_capacity: usize,
    /// Periodic emission interval in nanoseconds; 0 emits on change only.
    pub emission_tick_interval_ns: u64,
    /// Number of best levels summed into the depth fields of an update.
    pub depth_levels: usize,
    /// Entries are suppressed while `bid_depth + ask_depth` is below this;
    /// 0 disables the gate.
    pub min_depth_shares: u64,
    /// Book updates kept in the strategy's per-symbol rolling buffer.
    pub history_ticks: usize,
    /// Best-price points retained per symbol by the book engine.
    pub price_history_depth: usize,
    /// Wall-clock seconds between periodic performance reports; 0 disables
    /// the reporting loop.
    pub report_interval_secs: u64,
    /// Where the ledger writer puts trade CSVs and the summary JSON.
    /// `None` keeps the ledger purely in memory.
    pub output_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            liquidity_threshold: 1.5,
            min_consecutive_ticks: 5,
            position_size: 100,
            hold_time_ticks: 30,
            profit_target_pct: 0.0005,
            stop_loss_pct: 0.0003,
            order_timeout_ticks: 5,
            max_positions: 10,
            initial_capital: 1_000_000 * PRICE_SCALE as i64,
            bus_capacity: 1024,
            emission_tick_interval_ns: 0,
            depth_levels: 1,
            min_depth_shares: 0,
            history_ticks: 100,
            price_history_depth: 1000,
            report_interval_secs: 1,
            output_dir: None,
        }
    }
}

impl EngineConfig {
    /// Validate every option, failing on the first violation.
    ///
    /// # Errors
    /// [`ConfigError`] naming the offending option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.liquidity_threshold.is_finite() || self.liquidity_threshold < 1.0 {
            return Err(ConfigError::new(
                "liquidity_threshold",
                format!("must be a finite value >= 1.0, got {}", self.liquidity_threshold),
            ));
        }
        if self.min_consecutive_ticks == 0 {
            return Err(ConfigError::new("min_consecutive_ticks", "must be >= 1"));
        }
        if self.position_size == 0 {
            return Err(ConfigError::new("position_size", "must be >= 1"));
        }
        if self.hold_time_ticks == 0 {
            return Err(ConfigError::new("hold_time_ticks", "must be >= 1"));
        }
        if !(0.0..1.0).contains(&self.profit_target_pct) {
            return Err(ConfigError::new(
                "profit_target_pct",
                format!("must be in [0, 1), got {}", self.profit_target_pct),
            ));
        }
        if !(0.0..1.0).contains(&self.stop_loss_pct) {
            return Err(ConfigError::new(
                "stop_loss_pct",
                format!("must be in [0, 1), got {}", self.stop_loss_pct),
            ));
        }
        if self.order_timeout_ticks == 0 {
            return Err(ConfigError::new("order_timeout_ticks", "must be >= 1"));
        }
        if self.max_positions == 0 {
            return Err(ConfigError::new("max_positions", "must be >= 1"));
        }
        if self.initial_capital <= 0 {
            return Err(ConfigError::new("initial_capital", "must be positive"));
        }
        if self.bus_capacity == 0 {
            return Err(ConfigError::new("bus_capacity", "must be >= 1"));
        }
        if self.depth_levels == 0 {
            return Err(ConfigError::new("depth_levels", "must be >= 1"));
        }
        if self.history_ticks == 0 {
            return Err(ConfigError::new("history_ticks", "must be >= 1"));
        }
        Ok(())
    }
}
