//! Core value types shared by the book engine, the strategy and the ledger.

mod events;
mod price;
mod side;
mod symbol;

pub use events::{EventBody, EventKind, EventRecord, OrderRef, Qty};
pub use price::{PRICE_SCALE, Price, PriceParseError};
pub use side::Side;
pub use symbol::{SymbolId, SymbolTable};
