// Debug logging module for asynchronous tick logging
//
// Entries are queued to a single writer task so the receive/decide/send cycle
// never waits on disk. Each tick's snapshot is written to a JSONL file in the
// order the ticks were logged.

use log::error;
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

use crate::types::{Direction, Snapshot};

/// Represents a single debug log entry
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DebugLogEntry {
    pub tick: u64,
    /// Identifier our cells carry on the map
    pub agent: String,
    pub mode: String,
    /// Session seed; the tick's random source is seeded with `seed + tick`
    #[serde(default)]
    pub seed: u64,
    pub chosen_move: String,
    pub snapshot: Snapshot,
    pub timestamp: String,
}

enum LogCommand {
    Entry(Box<DebugLogEntry>),
    /// Acknowledged once every entry queued before it is on disk
    Flush(oneshot::Sender<()>),
}

/// Handle to the debug log writer
/// Cloning shares the same writer task
#[derive(Clone)]
pub struct DebugLogger {
    sender: Option<mpsc::UnboundedSender<LogCommand>>,
}

impl DebugLogger {
    /// Creates a new debug logger
    /// If enabled is true, initializes the log file (truncating if it exists)
    /// and starts the writer task
    pub async fn new(enabled: bool, log_file_path: &str) -> Self {
        if !enabled {
            return Self::disabled();
        }

        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
            .await
        {
            Ok(file) => {
                log::info!("Debug logging enabled: {}", log_file_path);
                let (sender, receiver) = mpsc::unbounded_channel();
                tokio::spawn(Self::run_writer(file, receiver));
                DebugLogger {
                    sender: Some(sender),
                }
            }
            Err(e) => {
                error!("Failed to create debug log file '{}': {}", log_file_path, e);
                Self::disabled()
            }
        }
    }

    /// Creates a disabled debug logger (no-op)
    pub fn disabled() -> Self {
        DebugLogger { sender: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queues a move decision for the writer task (fire-and-forget)
    pub fn log_move(
        &self,
        tick: u64,
        agent: &str,
        mode: &str,
        seed: u64,
        snapshot: Snapshot,
        chosen_move: Direction,
    ) {
        let Some(sender) = &self.sender else {
            return;
        };

        let entry = DebugLogEntry {
            tick,
            agent: agent.to_string(),
            mode: mode.to_string(),
            seed,
            chosen_move: chosen_move.as_str().to_string(),
            snapshot,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        if sender.send(LogCommand::Entry(Box::new(entry))).is_err() {
            error!("Debug log writer has stopped, dropping tick {}", tick);
        }
    }

    /// Waits until every entry logged so far has been written and flushed
    pub async fn flush(&self) {
        let Some(sender) = &self.sender else {
            return;
        };

        let (done_tx, done_rx) = oneshot::channel();
        if sender.send(LogCommand::Flush(done_tx)).is_err() {
            error!("Debug log writer has stopped");
            return;
        }
        if done_rx.await.is_err() {
            error!("Debug log writer stopped before flushing");
        }
    }

    /// Writer task: owns the file and drains the queue in order
    async fn run_writer(mut file: File, mut receiver: mpsc::UnboundedReceiver<LogCommand>) {
        while let Some(command) = receiver.recv().await {
            match command {
                LogCommand::Entry(entry) => Self::write_entry(&mut file, &entry).await,
                LogCommand::Flush(done) => {
                    if let Err(e) = file.flush().await {
                        error!("Failed to flush debug log: {}", e);
                    }
                    let _ = done.send(());
                }
            }
        }
    }

    async fn write_entry(file: &mut File, entry: &DebugLogEntry) {
        match serde_json::to_string(entry) {
            Ok(json_line) => {
                let line_with_newline = format!("{}\n", json_line);
                if let Err(e) = file.write_all(line_with_newline.as_bytes()).await {
                    error!("Failed to write debug log entry: {}", e);
                } else if let Err(e) = file.flush().await {
                    error!("Failed to flush debug log: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to serialize debug log entry: {}", e);
            }
        }
    }
}
