//! Bounded per-symbol trail of best-price points.

use crate::types::Price;
use serde::Serialize;
use std::collections::VecDeque;

/// One recorded top-of-book point. Only recorded when both sides exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricePoint {
    /// Timestamp of the event that produced the point (nanoseconds).
    pub ts: u64,
    /// Best bid at that moment.
    pub bid: Price,
    /// Best ask at that moment.
    pub ask: Price,
}

impl PricePoint {
    /// Floor midpoint of the point.
    #[must_use]
    pub fn mid(&self) -> Price {
        self.bid.midpoint(self.ask)
    }
}

/// Fixed-capacity price history; the oldest point falls off the front.
#[derive(Debug)]
pub struct PriceHistory {
    points: VecDeque<PricePoint>,
    capacity: usize,
}

impl PriceHistory {
    /// Create a history bounded to `capacity` points.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a point, evicting the oldest when at capacity.
    pub fn push(&mut self, point: PricePoint) {
        if self.capacity == 0 {
            return;
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// The most recent point.
    #[must_use]
    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.back()
    }

    /// Number of retained points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no point has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate points oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter()
    }
}
