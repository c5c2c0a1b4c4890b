//! Property tests: volume conservation and best-price consistency under
//! arbitrary event interleavings.

use lob_engine_rs::prelude::*;
use proptest::prelude::*;

/// A compact event script: references are drawn from a small pool so
/// deletes/executes/replaces frequently hit live orders, and prices from a
/// narrow band so levels collide.
#[derive(Debug, Clone)]
enum Op {
    Add { reference: u64, buy: bool, level: u8, shares: u32 },
    Delete { reference: u64 },
    Execute { reference: u64, shares: u32 },
    Cancel { reference: u64, shares: u32 },
    Replace { reference: u64, new_reference: u64, level: u8, shares: u32 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let reference = 0u64..24;
    prop_oneof![
        4 => (reference.clone(), any::<bool>(), 0u8..10, 1u32..500).prop_map(
            |(reference, buy, level, shares)| Op::Add { reference, buy, level, shares }
        ),
        2 => reference.clone().prop_map(|reference| Op::Delete { reference }),
        2 => (reference.clone(), 1u32..600).prop_map(|(reference, shares)| Op::Execute {
            reference,
            shares
        }),
        1 => (reference.clone(), 1u32..600).prop_map(|(reference, shares)| Op::Cancel {
            reference,
            shares
        }),
        1 => (reference.clone(), reference, 0u8..10, 1u32..500).prop_map(
            |(reference, new_reference, level, shares)| Op::Replace {
                reference,
                new_reference,
                level,
                shares
            }
        ),
    ]
}

fn to_event(op: &Op, ts: u64) -> EventRecord {
    let price_at = |level: u8| Price::from_minor(100_000 + u64::from(level) * 100);
    let body = match *op {
        Op::Add { reference, buy, level, shares } => EventBody::Add {
            reference,
            side: if buy { Side::Buy } else { Side::Sell },
            shares,
            stock: "PROP".to_string(),
            price: price_at(level),
        },
        Op::Delete { reference } => EventBody::Delete { reference },
        Op::Execute { reference, shares } => EventBody::Execute { reference, shares },
        Op::Cancel { reference, shares } => EventBody::Cancel { reference, shares },
        Op::Replace { reference, new_reference, level, shares } => EventBody::Replace {
            reference,
            new_reference,
            shares,
            price: price_at(level),
        },
    };
    EventRecord { ts, body }
}

fn check_invariants(engine: &BookEngine) {
    let Some(id) = engine.symbols().get("PROP") else {
        return;
    };
    let Some(book) = engine.book_for(id) else {
        return;
    };
    for side in [Side::Buy, Side::Sell] {
        // Level volumes must equal the registry's remaining shares.
        assert_eq!(
            book.side_volume(side),
            engine.registry().total_remaining(id, side),
            "conservation violated on {side:?}"
        );
        // Best must be the extreme of the level map, and no level empty.
        let levels = book.level_view(side);
        assert_eq!(book.best(side), levels.first().map(|(price, _)| *price));
        assert!(levels.iter().all(|(_, volume)| *volume > 0));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn conservation_holds_under_arbitrary_streams(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let mut engine = BookEngine::new(&EngineConfig::default());
        for (i, op) in ops.iter().enumerate() {
            engine.apply(&to_event(op, i as u64 + 1));
            check_invariants(&engine);
        }
    }

    #[test]
    fn updates_only_emitted_on_observable_change(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let mut engine = BookEngine::new(&EngineConfig::default());
        let mut last_top = None;
        for (i, op) in ops.iter().enumerate() {
            let emitted = engine.apply(&to_event(op, i as u64 + 1));
            let id = match engine.symbols().get("PROP") {
                Some(id) => id,
                None => continue,
            };
            let book = match engine.book_for(id) {
                Some(book) => book,
                None => continue,
            };
            let top = (
                book.best(Side::Buy),
                book.best(Side::Sell),
                book.top_depth(Side::Buy, 1),
                book.top_depth(Side::Sell, 1),
            );
            if let Some(update) = emitted {
                prop_assert_eq!(update.best_bid, top.0);
                prop_assert_eq!(update.best_ask, top.1);
                last_top = Some(top);
            } else if let Some(previous) = last_top {
                // Absorbed events must not have moved the top of book.
                prop_assert_eq!(previous, top);
                last_top = Some(top);
            }
        }
    }
}
