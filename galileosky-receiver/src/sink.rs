//! Persistence boundary: decoded record batches leave the engine here.
//!
//! Sessions hand batches over an mpsc channel; a single writer task appends
//! them to a JSON Lines file. Deduplication by record number/timestamp and
//! indexing are the downstream store's concern, not this process's.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use galileosky_protocol::Record;

/// Everything one successfully decoded frame hands to the persistence
/// collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedBatch {
    pub session_id: u64,
    pub peer: SocketAddr,
    /// IMEI of the terminal, once its head packet has been seen.
    pub imei: Option<String>,
    /// The terminal was replaying archived records rather than live data.
    pub archived: bool,
    pub received_at: DateTime<Utc>,
    pub records: Vec<Record>,
}

/// Spawn the writer task and return the sender half for sessions to feed.
pub fn spawn_writer(path: PathBuf) -> mpsc::Sender<DecodedBatch> {
    let (tx, mut rx) = mpsc::channel::<DecodedBatch>(256);

    tokio::spawn(async move {
        let mut file = match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
        {
            Ok(f) => f,
            Err(e) => {
                error!("Cannot open record output {:?}: {}", path, e);
                return;
            }
        };
        info!("Writing decoded records to {:?}", path);

        while let Some(batch) = rx.recv().await {
            let mut line = match serde_json::to_string(&batch) {
                Ok(l) => l,
                Err(e) => {
                    error!("Failed to serialize record batch: {}", e);
                    continue;
                }
            };
            line.push('\n');
            if let Err(e) = file.write_all(line.as_bytes()).await {
                error!("Failed to write record batch: {}", e);
            }
        }
    });

    tx
}
