//! Order registry: reference → live order state.
//!
//! Modification events (delete, execute, cancel, replace) carry only an
//! order reference; the registry resolves that reference to the
//! `(symbol, side, price, remaining)` tuple the book needs to locate the
//! affected level. The registry owns the records; books hold nothing but
//! aggregate volumes, so there is no ownership cycle between them.

use crate::types::{OrderRef, Price, Qty, Side, SymbolId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::error::BookError;

/// Live state of one resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRecord {
    /// Reference supplied by the event source.
    pub ref_id: OrderRef,
    /// Interned symbol.
    pub symbol: SymbolId,
    /// Side of the book the order rests on.
    pub side: Side,
    /// Resting price.
    pub price: Price,
    /// Shares still resting. Always greater than zero; a record is removed
    /// the instant its remaining quantity reaches zero.
    pub remaining: Qty,
    /// Arrival timestamp (nanoseconds), from the originating event.
    pub arrival_ts: u64,
}

/// Result of decrementing an order's remaining quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement {
    /// The order was fully consumed and has been removed.
    Removed(OrderRecord),
    /// The order was reduced; this many shares remain.
    Reduced(Qty),
}

/// Lookup table from order reference to [`OrderRecord`].
///
/// All operations are O(1) expected. The map is concurrent so that
/// readers (snapshots, invariant checks) can probe it while the engine
/// task writes.
pub struct OrderRegistry {
    orders: DashMap<OrderRef, OrderRecord>,
}

impl OrderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
        }
    }

    /// Register a new order.
    ///
    /// # Errors
    /// [`BookError::DuplicateRef`] if the reference is already registered;
    /// the existing record is left untouched.
    pub fn insert(&self, record: OrderRecord) -> Result<(), BookError> {
        match self.orders.entry(record.ref_id) {
            Entry::Occupied(_) => Err(BookError::DuplicateRef(record.ref_id)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    /// Look up an order by reference.
    #[must_use]
    pub fn get(&self, reference: OrderRef) -> Option<OrderRecord> {
        self.orders.get(&reference).map(|r| *r)
    }

    /// Reduce an order's remaining quantity by `qty`, removing the record
    /// when it reaches zero.
    ///
    /// # Errors
    /// - [`BookError::UnknownRef`] if the reference is not registered.
    /// - [`BookError::Underflow`] if `qty` exceeds the remaining quantity;
    ///   the record is left unchanged so the caller can cap and retry.
    pub fn decrement(&self, reference: OrderRef, qty: Qty) -> Result<Decrement, BookError> {
        let mut entry = self
            .orders
            .get_mut(&reference)
            .ok_or(BookError::UnknownRef(reference))?;
        let record = *entry;
        if qty > record.remaining {
            return Err(BookError::Underflow {
                reference,
                requested: qty,
                remaining: record.remaining,
            });
        }
        if qty == record.remaining {
            drop(entry);
            self.orders.remove(&reference);
            Ok(Decrement::Removed(record))
        } else {
            entry.remaining -= qty;
            Ok(Decrement::Reduced(entry.remaining))
        }
    }

    /// Remove an order outright, returning its final state.
    ///
    /// # Errors
    /// [`BookError::UnknownRef`] if the reference is not registered.
    pub fn remove(&self, reference: OrderRef) -> Result<OrderRecord, BookError> {
        self.orders
            .remove(&reference)
            .map(|(_, record)| record)
            .ok_or(BookError::UnknownRef(reference))
    }

    /// Atomically replace `old_ref` with a new order under `new_ref`,
    /// inheriting side and symbol. Returns the old record (the caller
    /// needs its price and remaining quantity to unwind the book).
    ///
    /// # Errors
    /// - [`BookError::UnknownRef`] if `old_ref` is not registered.
    /// - [`BookError::DuplicateRef`] if `new_ref` is already registered.
    ///
    /// On error no state is mutated.
    pub fn replace(
        &self,
        old_ref: OrderRef,
        new_ref: OrderRef,
        new_price: Price,
        new_qty: Qty,
        arrival_ts: u64,
    ) -> Result<OrderRecord, BookError> {
        if old_ref != new_ref && self.orders.contains_key(&new_ref) {
            return Err(BookError::DuplicateRef(new_ref));
        }
        let (_, old) = self
            .orders
            .remove(&old_ref)
            .ok_or(BookError::UnknownRef(old_ref))?;
        self.orders.insert(
            new_ref,
            OrderRecord {
                ref_id: new_ref,
                symbol: old.symbol,
                side: old.side,
                price: new_price,
                remaining: new_qty,
                arrival_ts,
            },
        );
        Ok(old)
    }

    /// Number of live orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the registry holds no orders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Sum of remaining shares over all records for `(symbol, side)`.
    ///
    /// Linear scan; used by invariant checks and tests, never on the event
    /// path.
    #[must_use]
    pub fn total_remaining(&self, symbol: SymbolId, side: Side) -> u64 {
        self.orders
            .iter()
            .filter(|r| r.symbol == symbol && r.side == side)
            .map(|r| u64::from(r.remaining))
            .sum()
    }
}

impl Default for OrderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
