//! Background ledger writer.
//!
//! The strategy task hands completed records to this writer by value over
//! its own queue; all file I/O happens on a dedicated thread so the data
//! path never blocks on disk. Trades land in one CSV per UTC calendar day
//! (derived from the trade timestamp), the summary in a single JSON file.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread::JoinHandle;
use tracing::{error, info, warn};

use super::metrics::PerformanceSummary;
use super::TradeRecord;

enum WriterCommand {
    Trade(TradeRecord),
    Summary(Box<PerformanceSummary>),
    Flush,
}

/// Handle to the writer thread. Dropping it (or calling [`close`]) ends
/// the thread after the queue drains.
///
/// [`close`]: LedgerWriter::close
pub struct LedgerWriter {
    tx: mpsc::Sender<WriterCommand>,
    handle: Option<JoinHandle<()>>,
}

impl LedgerWriter {
    /// Spawn the writer thread, creating `<output_dir>/trades/` up front.
    ///
    /// # Errors
    /// Any I/O error creating the output directories.
    pub fn spawn(output_dir: PathBuf) -> std::io::Result<Self> {
        fs::create_dir_all(output_dir.join("trades"))?;
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("ledger-writer".to_string())
            .spawn(move || writer_loop(rx, output_dir))?;
        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    /// Queue a trade for appending.
    pub fn record(&self, trade: TradeRecord) {
        if self.tx.send(WriterCommand::Trade(trade)).is_err() {
            warn!("ledger writer gone, trade dropped");
        }
    }

    /// Queue the end-of-run summary.
    pub fn summary(&self, summary: PerformanceSummary) {
        if self
            .tx
            .send(WriterCommand::Summary(Box::new(summary)))
            .is_err()
        {
            warn!("ledger writer gone, summary dropped");
        }
    }

    /// Ask the writer to flush its buffers.
    pub fn flush(&self) {
        let _ = self.tx.send(WriterCommand::Flush);
    }

    /// Close the queue and wait for the writer to drain and exit.
    pub fn close(mut self) {
        // Swap in a sender from a throwaway channel; dropping the real one
        // ends the writer loop once its queue is empty.
        let (dangling, _) = mpsc::channel();
        drop(std::mem::replace(&mut self.tx, dangling));
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("ledger writer thread panicked");
        }
    }
}

impl Drop for LedgerWriter {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            // The queue must close before the join, or the writer never
            // exits.
            let (dangling, _) = mpsc::channel();
            drop(std::mem::replace(&mut self.tx, dangling));
            let _ = handle.join();
        }
    }
}

fn writer_loop(rx: mpsc::Receiver<WriterCommand>, output_dir: PathBuf) {
    info!(dir = %output_dir.display(), "ledger writer started");
    let mut day_files: HashMap<String, BufWriter<File>> = HashMap::new();

    while let Ok(command) = rx.recv() {
        match command {
            WriterCommand::Trade(trade) => {
                let day = utc_day(trade.ts);
                let path = output_dir.join("trades").join(format!("trades_{day}.csv"));
                let file = match day_files.entry(day) {
                    std::collections::hash_map::Entry::Occupied(slot) => slot.into_mut(),
                    std::collections::hash_map::Entry::Vacant(slot) => {
                        match open_day_file(&path) {
                            Ok(file) => slot.insert(file),
                            Err(err) => {
                                error!(path = %path.display(), %err, "cannot open trade file");
                                continue;
                            }
                        }
                    }
                };
                if let Err(err) = writeln!(file, "{}", trade.to_csv_row()) {
                    error!(%err, "trade append failed");
                }
            }
            WriterCommand::Summary(summary) => {
                let path = output_dir.join("performance_summary.json");
                match serde_json::to_string_pretty(&*summary) {
                    Ok(json) => {
                        if let Err(err) = fs::write(&path, json) {
                            error!(path = %path.display(), %err, "summary write failed");
                        }
                    }
                    Err(err) => error!(%err, "summary serialization failed"),
                }
            }
            WriterCommand::Flush => {
                for file in day_files.values_mut() {
                    if let Err(err) = file.flush() {
                        error!(%err, "flush failed");
                    }
                }
            }
        }
    }

    for file in day_files.values_mut() {
        let _ = file.flush();
    }
    info!("ledger writer stopped");
}

/// Open a day file in append mode, writing the header when the file is new
/// or empty.
fn open_day_file(path: &PathBuf) -> std::io::Result<BufWriter<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let needs_header = file.metadata()?.len() == 0;
    let mut writer = BufWriter::new(file);
    if needs_header {
        writeln!(writer, "{}", TradeRecord::CSV_HEADER)?;
    }
    Ok(writer)
}

/// UTC calendar day (YYYYMMDD) for a nanosecond timestamp.
fn utc_day(ts: u64) -> String {
    DateTime::<Utc>::from_timestamp((ts / 1_000_000_000) as i64, (ts % 1_000_000_000) as u32)
        .map(|dt| dt.format("%Y%m%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
