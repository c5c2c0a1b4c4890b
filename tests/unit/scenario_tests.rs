//! End-to-end scenarios across the book engine, bus and strategy.

use super::{add, delete, execute, replace};
use lob_engine_rs::prelude::*;
use std::sync::Arc;

fn p(s: &str) -> Price {
    s.parse().unwrap()
}

fn strategy_with(config: EngineConfig, symbols: &[&str]) -> StrategyEngine {
    let table = SymbolTable::new();
    for s in symbols {
        table.intern(s);
    }
    let ledger = Ledger::new(config.initial_capital, None);
    StrategyEngine::new(config, Arc::new(table), ledger)
}

fn update(ts: u64, bid: &str, ask: &str, bid_depth: u64, ask_depth: u64) -> BookUpdate {
    BookUpdate::assemble(
        ts,
        SymbolId(0),
        (!bid.is_empty()).then(|| p(bid)),
        (!ask.is_empty()).then(|| p(ask)),
        bid_depth,
        ask_depth,
        UpdateTrigger::BEST_CHANGED,
    )
}

#[test]
fn single_add_sets_best_bid() {
    let mut engine = BookEngine::new(&EngineConfig::default());
    let update = engine
        .apply(&add(1, 1, Side::Buy, "10.0000", 100, "AAA"))
        .expect("first add must emit");

    assert_eq!(update.best_bid, Some(p("10.0000")));
    assert_eq!(update.best_ask, None);
    assert_eq!(update.bid_depth, 100);
    assert_eq!(update.ask_depth, 0);
}

#[test]
fn crossed_book_then_uncross() {
    let mut engine = BookEngine::new(&EngineConfig::default());
    engine.apply(&add(1, 1, Side::Buy, "10.0000", 100, "AAA")).unwrap();

    let crossed = engine
        .apply(&add(2, 2, Side::Sell, "9.9900", 50, "AAA"))
        .expect("new ask must emit");
    assert_eq!(crossed.best_bid, Some(p("10.0000")));
    assert_eq!(crossed.best_ask, Some(p("9.9900")));

    let uncrossed = engine.apply(&execute(3, 2, 50)).expect("ask removal must emit");
    assert_eq!(uncrossed.best_ask, None);
    assert_eq!(uncrossed.best_bid, Some(p("10.0000")));
}

#[test]
fn replace_preserves_conservation() {
    let mut engine = BookEngine::new(&EngineConfig::default());
    engine.apply(&add(1, 1, Side::Buy, "10.0000", 100, "AAA")).unwrap();
    engine.apply(&replace(2, 1, 2, "10.0100", 80)).unwrap();

    assert_eq!(engine.registry().len(), 1);
    let record = engine.registry().get(2).expect("new ref registered");
    assert_eq!(record.price, p("10.0100"));
    assert_eq!(record.remaining, 80);

    let snapshot = engine.snapshot("AAA").unwrap();
    assert_eq!(snapshot.bids.len(), 1);
    assert_eq!(snapshot.bids[0].price, p("10.0100"));
    assert_eq!(snapshot.bids[0].volume, 80);
}

#[test]
fn replace_equals_delete_then_add_on_the_book() {
    let config = EngineConfig::default();

    let mut replaced = BookEngine::new(&config);
    replaced.apply(&add(1, 1, Side::Buy, "10.0000", 100, "AAA")).unwrap();
    replaced.apply(&replace(2, 1, 2, "10.0100", 80)).unwrap();

    let mut rebuilt = BookEngine::new(&config);
    rebuilt.apply(&add(1, 1, Side::Buy, "10.0000", 100, "AAA")).unwrap();
    rebuilt.apply(&delete(2, 1)).unwrap();
    rebuilt.apply(&add(2, 2, Side::Buy, "10.0100", 80, "AAA")).unwrap();

    assert_eq!(replaced.snapshot("AAA"), rebuilt.snapshot("AAA"));
}

#[test]
fn imbalance_entry_after_five_ticks() {
    let mut strategy = strategy_with(EngineConfig::default(), &["AAA"]);
    for ts in 1..=5 {
        strategy.on_update(&update(ts, "10.0000", "10.0100", 300, 100));
    }
    assert_eq!(strategy.position(SymbolId(0)), -100);

    let trades = strategy.ledger().trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].side, Side::Sell);
    assert_eq!(trades[0].qty, 100);
    assert_eq!(trades[0].price, p("10.0000"));
}

#[test]
fn timed_out_order_is_canceled_on_the_extra_tick() {
    let config = EngineConfig::default();
    let timeout = config.order_timeout_ticks as u64;
    let mut strategy = strategy_with(config, &["AAA"]);

    // Entry signal with a bid side too thin for the 100-share entry: the
    // order rests.
    for ts in 1..=5 {
        strategy.on_update(&update(ts, "10.0000", "10.0100", 60, 20));
    }
    let id = strategy.orders().last().unwrap().id;
    assert_eq!(strategy.order(id).unwrap().status, OrderStatus::Active);

    for ts in 6..=(5 + timeout) {
        strategy.on_update(&update(ts, "10.0000", "10.0100", 60, 20));
        assert_eq!(strategy.order(id).unwrap().status, OrderStatus::Active);
    }
    strategy.on_update(&update(6 + timeout, "10.0000", "10.0100", 60, 20));
    assert_eq!(strategy.order(id).unwrap().status, OrderStatus::Canceled);
}

#[test]
fn profit_target_exit_realizes_five_hundredths_per_share() {
    let config = EngineConfig {
        min_consecutive_ticks: 1,
        ..EngineConfig::default()
    };
    let mut strategy = strategy_with(config, &["AAA"]);

    // Long at ask 100.0000.
    strategy.on_update(&update(1, "99.9900", "100.0000", 100, 300));
    assert_eq!(strategy.position(SymbolId(0)), 100);

    // Bid runs to 100.0500: the next tick exits at the bid.
    strategy.on_update(&update(2, "100.0500", "100.0600", 300, 300));
    assert_eq!(strategy.position(SymbolId(0)), 0);

    let trades = strategy.ledger().trades();
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[1].price, p("100.0500"));
    // 0.0500 per share on 100 shares = 5.0000 realized.
    assert_eq!(trades[1].pnl, 50_000);
    assert_eq!(strategy.ledger().metrics().winning_trades, 1);
}

#[test]
fn empty_side_yields_zero_depth_and_no_best() {
    let mut engine = BookEngine::new(&EngineConfig::default());
    let update = engine
        .apply(&add(1, 1, Side::Sell, "10.0100", 40, "AAA"))
        .unwrap();
    assert_eq!(update.best_bid, None);
    assert_eq!(update.bid_depth, 0);
    assert_eq!(update.imbalance, -1.0);
}

#[test]
fn execute_capped_at_remaining_removes_level_exactly_at_zero() {
    let mut engine = BookEngine::new(&EngineConfig::default());
    engine.apply(&add(1, 1, Side::Sell, "10.0100", 40, "AAA")).unwrap();
    let update = engine.apply(&execute(2, 1, 1_000)).unwrap();

    assert_eq!(update.best_ask, None);
    assert_eq!(engine.stats().underflow_capped, 1);
    assert!(engine.snapshot("AAA").unwrap().asks.is_empty());
}

#[test]
fn bus_preserves_emission_order_across_symbols() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let mut engine = BookEngine::new(&EngineConfig::default());
        let (tx, mut rx) = lob_engine_rs::bus::channel(16);

        let stream = vec![
            add(1, 1, Side::Buy, "10.0000", 100, "AAA"),
            add(2, 2, Side::Buy, "20.0000", 100, "BBB"),
            add(3, 3, Side::Sell, "10.0100", 50, "AAA"),
        ];
        let mut emitted = Vec::new();
        for event in &stream {
            if let Some(update) = engine.apply(event) {
                emitted.push(update);
                tx.send(update).await.unwrap();
            }
        }
        tx.finish().await.unwrap();

        let mut received = Vec::new();
        loop {
            match rx.recv().await.unwrap() {
                BusMessage::Update(u) => received.push(u),
                BusMessage::EndOfStream => break,
            }
        }
        assert_eq!(received, emitted);
        assert_eq!(received.len(), 3);
    });
}
