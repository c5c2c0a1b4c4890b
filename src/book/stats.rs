//! Processed-message statistics.

use serde::Serialize;

/// Counters accumulated while applying the event stream.
///
/// The error counters mirror the error policy: skipped events are counted,
/// never retried.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageStats {
    /// Total events seen, including skipped ones.
    pub total: u64,
    /// Add events applied.
    pub adds: u64,
    /// Delete events applied.
    pub deletes: u64,
    /// Execute events applied.
    pub executes: u64,
    /// Cancel events applied.
    pub cancels: u64,
    /// Replace events applied.
    pub replaces: u64,
    /// Events dropped because their reference was unknown.
    pub unknown_ref: u64,
    /// Adds/replaces dropped because the reference already existed.
    pub duplicate_ref: u64,
    /// Executes/cancels whose quantity was capped at the order's remaining.
    pub underflow_capped: u64,
    /// Adds/replaces rejected for zero price or quantity.
    pub rejected: u64,
    /// Book updates actually emitted to the bus.
    pub updates_emitted: u64,
}

impl MessageStats {
    /// Events that mutated book state.
    #[must_use]
    pub fn applied(&self) -> u64 {
        self.adds + self.deletes + self.executes + self.cancels + self.replaces
    }

    /// Events that were dropped without effect.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.unknown_ref + self.duplicate_ref + self.rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applied_and_dropped_sum_counters() {
        let stats = MessageStats {
            total: 10,
            adds: 4,
            deletes: 1,
            executes: 2,
            cancels: 0,
            replaces: 1,
            unknown_ref: 1,
            duplicate_ref: 1,
            underflow_capped: 1,
            rejected: 0,
            updates_emitted: 6,
        };
        assert_eq!(stats.applied(), 8);
        assert_eq!(stats.dropped(), 2);
    }
}
