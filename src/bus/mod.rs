//! Market-data bus: a bounded single-producer/single-consumer channel of
//! book updates with backpressure and an end-of-stream sentinel.
//!
//! The book engine is the only sender and the strategy engine the only
//! receiver. When the channel is full the producer suspends (backpressure);
//! ordering is FIFO and exactly matches the emission order. `EndOfStream`
//! is sent once, after the last real update, by consuming the sender.

use crate::book::BookUpdate;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

/// A message on the bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BusMessage {
    /// A book update, in emission order.
    Update(BookUpdate),
    /// No further updates will arrive. Sent exactly once.
    EndOfStream,
}

/// The peer task is gone; further sends or receives are meaningless and
/// the surviving task should shut down gracefully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("market data bus closed")]
pub struct BusClosed;

/// Producer half of the bus.
pub struct UpdateSender {
    tx: mpsc::Sender<BusMessage>,
}

/// Consumer half of the bus.
pub struct UpdateReceiver {
    rx: mpsc::Receiver<BusMessage>,
    finished: bool,
}

/// Create a bus bounded to `capacity` in-flight updates.
///
/// # Panics
/// Panics if `capacity` is zero; configuration validation rejects that
/// before a bus is ever built.
#[must_use]
pub fn channel(capacity: usize) -> (UpdateSender, UpdateReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        UpdateSender { tx },
        UpdateReceiver {
            rx,
            finished: false,
        },
    )
}

impl UpdateSender {
    /// Send one update, waiting while the bus is full.
    ///
    /// # Errors
    /// [`BusClosed`] if the consumer has dropped its receiver.
    pub async fn send(&self, update: BookUpdate) -> Result<(), BusClosed> {
        self.tx
            .send(BusMessage::Update(update))
            .await
            .map_err(|_| BusClosed)
    }

    /// Consume the sender, delivering the end-of-stream sentinel.
    ///
    /// Taking `self` by value makes a second sentinel unrepresentable.
    ///
    /// # Errors
    /// [`BusClosed`] if the consumer is already gone; the stream is
    /// considered terminated either way.
    pub async fn finish(self) -> Result<(), BusClosed> {
        info!("market data stream finished");
        self.tx
            .send(BusMessage::EndOfStream)
            .await
            .map_err(|_| BusClosed)
    }
}

impl UpdateReceiver {
    /// Receive the next message in FIFO order.
    ///
    /// After `EndOfStream` has been observed, or if the producer dropped
    /// without finishing, every further call reports [`BusClosed`].
    pub async fn recv(&mut self) -> Result<BusMessage, BusClosed> {
        if self.finished {
            return Err(BusClosed);
        }
        match self.rx.recv().await {
            Some(BusMessage::EndOfStream) => {
                self.finished = true;
                Ok(BusMessage::EndOfStream)
            }
            Some(message) => Ok(message),
            None => {
                self.finished = true;
                Err(BusClosed)
            }
        }
    }
}
