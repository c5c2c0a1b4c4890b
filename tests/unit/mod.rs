//! Integration test entry point, registered as the `tests` target.

mod conservation_tests;
mod determinism_tests;
mod scenario_tests;

use lob_engine_rs::prelude::*;

/// Build an Add event.
pub fn add(ts: u64, reference: u64, side: Side, price: &str, shares: u32, stock: &str) -> EventRecord {
    EventRecord {
        ts,
        body: EventBody::Add {
            reference,
            side,
            shares,
            stock: stock.to_string(),
            price: price.parse().expect("test price"),
        },
    }
}

/// Build an Execute event.
pub fn execute(ts: u64, reference: u64, shares: u32) -> EventRecord {
    EventRecord {
        ts,
        body: EventBody::Execute { reference, shares },
    }
}

/// Build a Delete event.
pub fn delete(ts: u64, reference: u64) -> EventRecord {
    EventRecord {
        ts,
        body: EventBody::Delete { reference },
    }
}

/// Build a Replace event.
pub fn replace(ts: u64, reference: u64, new_reference: u64, price: &str, shares: u32) -> EventRecord {
    EventRecord {
        ts,
        body: EventBody::Replace {
            reference,
            new_reference,
            shares,
            price: price.parse().expect("test price"),
        },
    }
}
