//! # Real-Time Limit Order Book Engine with a Liquidity-Reversion Strategy
//!
//! This crate reconstructs per-symbol limit order books from an ITCH 5.0
//! style event stream and drives a simple market-making strategy off the
//! evolving books. It is organized as two tightly coupled subsystems joined
//! by a bounded channel:
//!
//! - **The book engine** consumes decoded Add/Delete/Execute/Cancel/Replace
//!   events, maintains price-level-aggregated books with best-price
//!   tracking, records a bounded best-price trail per symbol, answers
//!   snapshot and summary queries, and emits [`book::BookUpdate`]s when the
//!   top of book actually changes (or on an optional periodic tick).
//! - **The strategy engine** consumes those updates, watches the bid/ask
//!   liquidity ratio per symbol, and trades its reversion: persistent
//!   excess bid liquidity is faded with a short at the bid, excess ask
//!   liquidity bought at the ask. Orders are simulated immediate-or-nothing
//!   at their limit, timed out by a fixed-width aging ring, and settled
//!   into a deterministic trade ledger.
//!
//! ## Key properties
//!
//! - **Exact money.** Prices are 64-bit fixed-point with four decimal
//!   places; quantities are integers. Floating point appears only in
//!   derived statistics (imbalance, spread in basis points), so the P&L
//!   identity `cash + holdings - initial == realized + unrealized` holds
//!   exactly at every mark.
//! - **Strict ordering.** Events apply in input order; updates reach the
//!   strategy in emission order over a FIFO bus with backpressure and an
//!   end-of-stream sentinel. Each event either fully applies to registry
//!   and book or has no visible effect.
//! - **Volume conservation.** At every event boundary the sum of level
//!   volumes per `(symbol, side)` equals the sum of remaining shares over
//!   the registry's records on that side; levels and records are erased
//!   the instant they reach zero.
//! - **One writer per book.** The registry and every price-level book are
//!   owned by the book engine task. The strategy never reads them; it sees
//!   the market only through the bus. The ledger is owned by the strategy,
//!   and its file output is handed to a background writer thread.
//! - **Deterministic replay.** Two runs over the same event stream with the
//!   same configuration produce identical update sequences and identical
//!   trade-ledger bytes.
//!
//! ## Event semantics
//!
//! | Event | Effect |
//! |---|---|
//! | `Add` | Register the order, add its shares to the level. Duplicate references are dropped. |
//! | `Delete` | Remove the order and its remaining shares. Unknown references are logged and dropped. |
//! | `Execute` / `Cancel` | Reduce order and level by the executed shares, capped at the order's remaining. |
//! | `Replace` | Atomically delete-then-add under the new reference, inheriting side and symbol. |
//!
//! Crossed books are data artifacts, not errors: the engine reports them
//! as observed and lets the stream resolve them.
//!
//! ## Quick start
//!
//! ```no_run
//! use lob_engine_rs::prelude::*;
//!
//! # async fn demo(events: Vec<EventRecord>) -> Result<(), RuntimeError> {
//! let config = EngineConfig::default();
//! let simulation = Simulation::new(config)?;
//! let report = simulation.run(events).await?;
//! println!(
//!     "{} events, {} trades, total P&L {}",
//!     report.stats.total,
//!     report.trades.len(),
//!     report.summary.total_pnl
//! );
//! # Ok(())
//! # }
//! ```
//!
//! The pieces also work standalone: feed a [`book::BookEngine`] directly
//! and inspect snapshots, or drive a [`strategy::StrategyEngine`] with
//! hand-built updates in tests.
//!
//! ## What this crate does not do
//!
//! No matching against external counterparties, no iceberg or hidden
//! order semantics, no auction phases, no persistence of book state, and
//! no multi-venue aggregation. JSON decoding, argument parsing and report
//! rendering are left to hosts; the engine speaks [`types::EventRecord`]
//! in and `BookUpdate` + trade records out.

pub mod book;
pub mod bus;
pub mod config;
pub mod ledger;
pub mod prelude;
pub mod runtime;
pub mod strategy;
pub mod types;

pub use book::{BookEngine, BookError, BookSnapshot, BookUpdate, MessageStats, UpdateTrigger};
pub use bus::{BusClosed, BusMessage};
pub use config::{ConfigError, EngineConfig};
pub use ledger::{Ledger, LedgerError, LedgerWriter, PerformanceSummary, TradeRecord};
pub use runtime::{RuntimeError, ShutdownHandle, Simulation, SimulationReport};
pub use strategy::{OrderStatus, StrategyEngine, StrategyOrder};
pub use types::{EventBody, EventRecord, Price, Side, SymbolId};
