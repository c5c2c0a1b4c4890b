//! Task wiring: the book-engine producer and strategy consumer joined by
//! the market-data bus, plus cooperative shutdown and wall-clock
//! performance reporting.
//!
//! Two cooperative tasks own all mutable state: the producer owns the
//! registry and books, the consumer owns the strategy and its ledger.
//! Nothing mutable crosses between them except bus messages; the only
//! process-wide state is the metrics snapshot the consumer publishes for
//! the reporting loop.

use crate::book::{BookEngine, MessageStats};
use crate::bus::{self, BusMessage};
use crate::config::{ConfigError, EngineConfig};
use crate::ledger::{Ledger, LedgerWriter, PerformanceMetrics, PerformanceSummary, TradeRecord};
use crate::strategy::StrategyEngine;
use crate::types::EventRecord;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

/// Fatal runtime failures. Per the error policy nothing on the data path
/// is retried; these surface only when further processing is meaningless.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration failed validation (host exit code 2).
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The ledger writer could not be started (host exit code 1).
    #[error("ledger writer: {0}")]
    Writer(#[from] std::io::Error),

    /// A task panicked or was aborted.
    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct SimulationReport {
    /// Final performance summary (also written by the ledger writer when
    /// an output directory is configured).
    pub summary: PerformanceSummary,
    /// Book-engine message statistics.
    pub stats: MessageStats,
    /// The full trade ledger, in append order.
    pub trades: Vec<TradeRecord>,
}

/// Handle for requesting cooperative shutdown from outside the run.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Signal both tasks to wind down at their next suspension point.
    /// Effective even before the run has subscribed its tasks.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// A configured engine + strategy pipeline, ready to consume one event
/// stream.
pub struct Simulation {
    config: EngineConfig,
    shutdown: watch::Sender<bool>,
}

impl Simulation {
    /// Validate the configuration and prepare a run.
    ///
    /// # Errors
    /// [`ConfigError`] when any option is invalid; nothing is started.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (shutdown, _) = watch::channel(false);
        Ok(Self { config, shutdown })
    }

    /// A handle that can cancel the run from another task or a signal
    /// handler.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown.clone(),
        }
    }

    /// Drive the full pipeline over `events` and return the report.
    ///
    /// The producer applies events in input order and sends emitted
    /// updates over the bounded bus (suspending when it is full). The
    /// consumer processes updates in FIFO order and, on end of stream or
    /// cancel, cancels its working orders, marks open positions at the
    /// last mid and flushes the ledger.
    ///
    /// # Errors
    /// [`RuntimeError`] on writer startup failure or task panic.
    pub async fn run<I>(self, events: I) -> Result<SimulationReport, RuntimeError>
    where
        I: IntoIterator<Item = EventRecord> + Send + 'static,
        I::IntoIter: Send,
    {
        let config = self.config;
        let writer = match &config.output_dir {
            Some(dir) => Some(LedgerWriter::spawn(dir.clone())?),
            None => None,
        };

        let book_engine = BookEngine::new(&config);
        let symbols = book_engine.symbols_handle();
        let ledger = Ledger::new(config.initial_capital, writer);
        let strategy = StrategyEngine::new(config.clone(), symbols, ledger);

        let (bus_tx, mut bus_rx) = bus::channel(config.bus_capacity);
        let (metrics_tx, metrics_rx) = watch::channel(PerformanceMetrics::default());
        let start = Instant::now();

        let mut producer_shutdown = self.shutdown.subscribe();
        let producer = tokio::spawn(async move {
            let mut engine = book_engine;
            'feed: for event in events {
                if *producer_shutdown.borrow() {
                    break;
                }
                if let Some(update) = engine.apply(&event) {
                    tokio::select! {
                        sent = bus_tx.send(update) => {
                            if sent.is_err() {
                                // Consumer is gone; stop producing.
                                break 'feed;
                            }
                        }
                        _ = producer_shutdown.changed() => break 'feed,
                    }
                }
            }
            let _ = bus_tx.finish().await;
            engine
        });

        let mut consumer_shutdown = self.shutdown.subscribe();
        let consumer = tokio::spawn(async move {
            let mut strategy = strategy;
            loop {
                tokio::select! {
                    message = bus_rx.recv() => match message {
                        Ok(BusMessage::Update(update)) => {
                            strategy.on_update(&update);
                            let _ = metrics_tx.send(strategy.ledger().metrics());
                        }
                        Ok(BusMessage::EndOfStream) | Err(_) => break,
                    },
                    _ = consumer_shutdown.changed() => break,
                }
            }
            let summary = strategy.finish(start.elapsed().as_secs_f64());
            (strategy, summary)
        });

        let reporter = spawn_reporter(
            config.report_interval_secs,
            metrics_rx,
            self.shutdown.subscribe(),
        );

        let engine = producer.await?;
        let (strategy, summary) = consumer.await?;
        // Everything real is done; release the reporter.
        self.shutdown.send_replace(true);
        reporter.await?;

        info!(
            events = engine.stats().total,
            updates = engine.stats().updates_emitted,
            trades = strategy.ledger().trades().len(),
            "simulation complete"
        );
        Ok(SimulationReport {
            summary,
            stats: *engine.stats(),
            trades: strategy.ledger().trades().to_vec(),
        })
    }
}

/// Coarse wall-clock reporting loop, independent of the data path.
fn spawn_reporter(
    interval_secs: u64,
    metrics: watch::Receiver<PerformanceMetrics>,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if interval_secs == 0 {
            return;
        }
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; skip it.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let m = *metrics.borrow();
                    info!(
                        total_pnl = m.total_pnl,
                        realized_pnl = m.realized_pnl,
                        num_trades = m.num_trades,
                        "performance"
                    );
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}
