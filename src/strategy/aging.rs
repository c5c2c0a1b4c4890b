//! Fixed-width aging ring for order timeouts.
//!
//! Orders are timed out in logical ticks, not wall clock. Instead of
//! sweeping every live order each tick, orders sit in age buckets and the
//! ring rotates: one index bump per tick, and only the expiring bucket is
//! drained. Rotation is O(1) amortized, cancellation O(expired).

use super::order::StrategyOrderId;

/// Ring of `timeout_ticks + 1` buckets. Orders placed this tick go into
/// the age-0 bucket; the bucket reaching age `timeout_ticks` is drained on
/// rotation.
#[derive(Debug)]
pub struct AgeBuckets {
    buckets: Vec<Vec<StrategyOrderId>>,
    /// Index of the age-0 bucket.
    head: usize,
}

impl AgeBuckets {
    /// Create a ring that expires orders after `timeout_ticks` rotations.
    #[must_use]
    pub fn new(timeout_ticks: u32) -> Self {
        let len = timeout_ticks as usize + 1;
        Self {
            buckets: (0..len).map(|_| Vec::new()).collect(),
            head: 0,
        }
    }

    /// Register a freshly placed order at age zero.
    pub fn push(&mut self, id: StrategyOrderId) {
        self.buckets[self.head].push(id);
    }

    /// Advance every bucket by one tick and drain the expiring bucket.
    ///
    /// The drained bucket becomes the new age-0 bucket, so the shift costs
    /// one index update regardless of how many orders are live. Returned
    /// ids may include orders that already settled; the caller skips
    /// non-active ones.
    pub fn rotate(&mut self) -> Vec<StrategyOrderId> {
        let len = self.buckets.len();
        let expiring = (self.head + len - 1) % len;
        let expired = std::mem::take(&mut self.buckets[expiring]);
        self.head = expiring;
        expired
    }

    /// Total ids currently tracked (including settled ones not yet
    /// rotated out).
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// Whether no ids are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }
}
