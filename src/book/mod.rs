//! Order book reconstruction: registry, per-symbol price-level books, and
//! the engine that applies the event stream to them.

mod engine;
mod error;
mod history;
mod level_book;
mod registry;
mod snapshot;
mod stats;
mod update;

pub use engine::BookEngine;
pub use error::BookError;
pub use history::{PriceHistory, PricePoint};
pub use level_book::PriceLevelBook;
pub use registry::{Decrement, OrderRecord, OrderRegistry};
pub use snapshot::{BookSnapshot, LevelSnapshot, SymbolSummary};
pub use stats::MessageStats;
pub use update::{BookUpdate, UpdateTrigger};
