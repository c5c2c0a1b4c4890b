//! Convenience re-exports for the common path: build a configuration,
//! run a simulation, inspect the report.
//!
//! ```no_run
//! use lob_engine_rs::prelude::*;
//! ```

pub use crate::book::{
    BookEngine, BookError, BookSnapshot, BookUpdate, LevelSnapshot, MessageStats, PriceLevelBook,
    SymbolSummary, UpdateTrigger,
};
pub use crate::bus::{BusClosed, BusMessage};
pub use crate::config::{ConfigError, EngineConfig};
pub use crate::ledger::{
    Ledger, LedgerError, LedgerWriter, PerformanceMetrics, PerformanceSummary, Position,
    PositionSummary, TradeRecord,
};
pub use crate::runtime::{RuntimeError, ShutdownHandle, Simulation, SimulationReport};
pub use crate::strategy::{
    AgeBuckets, ExitReason, OrderIntent, OrderStatus, StrategyEngine, StrategyOrder,
    StrategyOrderId,
};
pub use crate::types::{
    EventBody, EventKind, EventRecord, OrderRef, PRICE_SCALE, Price, PriceParseError, Qty, Side,
    SymbolId, SymbolTable,
};
