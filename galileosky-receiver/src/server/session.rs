//! Per-connection session: frame assembly, decoding and confirmation.

use std::net::SocketAddr;

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use galileosky_protocol::{
    confirmation, decode, ChecksumMismatch, FrameError, FrameOutcome, FrameReader, PacketType,
    RawFrame,
};

use crate::sink::DecodedBatch;

/// A session with a single tracking terminal.
pub struct Session {
    id: u64,
    addr: SocketAddr,
    socket: TcpStream,
    reader: FrameReader,
    sink: mpsc::Sender<DecodedBatch>,
    /// IMEI reported in the head packet, once seen.
    imei: Option<String>,
    frames_accepted: u64,
    frames_rejected: u64,
}

impl Session {
    pub fn new(
        id: u64,
        addr: SocketAddr,
        socket: TcpStream,
        max_payload: usize,
        sink: mpsc::Sender<DecodedBatch>,
    ) -> Self {
        Self {
            id,
            addr,
            socket,
            reader: FrameReader::with_max_payload(max_payload),
            sink,
            imei: None,
            frames_accepted: 0,
            frames_rejected: 0,
        }
    }

    /// Drive the session until the terminal disconnects or a fatal
    /// framing error occurs.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let mut buf = [0u8; 4096];

        loop {
            let n = self.socket.read(&mut buf).await?;
            if n == 0 {
                let leftover = self.reader.buffered();
                if leftover > 0 {
                    warn!(
                        "[Session {}] Terminal disconnected with {} unframed byte(s) pending",
                        self.id, leftover
                    );
                }
                info!(
                    "[Session {}] Terminal disconnected ({} accepted, {} rejected)",
                    self.id, self.frames_accepted, self.frames_rejected
                );
                return Ok(());
            }
            self.reader.push(&buf[..n]);

            loop {
                match self.reader.next_frame() {
                    Ok(Some(frame)) => self.process_frame(frame).await?,
                    Ok(None) => break,
                    Err(FrameError::FrameTooLarge { declared, max }) => {
                        error!(
                            "[Session {}] Declared payload length {} exceeds limit {}, closing",
                            self.id, declared, max
                        );
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Decode one frame and send the three-byte confirmation.
    async fn process_frame(&mut self, frame: RawFrame) -> std::io::Result<()> {
        let outcome = self.handle_frame(&frame).await;
        match outcome {
            FrameOutcome::Accepted => self.frames_accepted += 1,
            FrameOutcome::Rejected => self.frames_rejected += 1,
        }
        let reply = confirmation(frame.as_bytes(), outcome);
        self.socket.write_all(&reply).await?;
        Ok(())
    }

    async fn handle_frame(&mut self, frame: &RawFrame) -> FrameOutcome {
        if let Err(ChecksumMismatch { computed, received }) = frame.verify_checksum() {
            warn!(
                "[Session {}] Checksum mismatch: computed {:#06x}, received {:#06x}",
                self.id, computed, received
            );
            return FrameOutcome::Rejected;
        }

        match frame.packet_type {
            PacketType::Main => self.handle_main(frame).await,
            PacketType::Ignorable => {
                debug!(
                    "[Session {}] Ignorable packet, {} payload byte(s)",
                    self.id,
                    frame.payload.len()
                );
                FrameOutcome::Accepted
            }
            PacketType::Extension(header) => {
                debug!(
                    "[Session {}] Extension packet {:#04x}, {} payload byte(s)",
                    self.id,
                    header,
                    frame.payload.len()
                );
                FrameOutcome::Accepted
            }
        }
    }

    async fn handle_main(&mut self, frame: &RawFrame) -> FrameOutcome {
        let records = match decode(&frame.payload) {
            Ok(records) => records,
            Err(e) => {
                warn!("[Session {}] Frame rejected: {}", self.id, e);
                return FrameOutcome::Rejected;
            }
        };

        if let Some(imei) = records.iter().find_map(|r| r.imei()) {
            if self.imei.as_deref() != Some(imei) {
                info!("[Session {}] Terminal identified as IMEI {}", self.id, imei);
                self.imei = Some(imei.to_string());
            }
        }

        info!(
            "[Session {}] Decoded {} record(s){}",
            self.id,
            records.len(),
            if frame.archived { " (archive)" } else { "" }
        );

        let batch = DecodedBatch {
            session_id: self.id,
            peer: self.addr,
            imei: self.imei.clone(),
            archived: frame.archived,
            received_at: Utc::now(),
            records,
        };
        if let Err(e) = self.sink.send(batch).await {
            error!("[Session {}] Record sink is gone: {}", self.id, e);
        }

        FrameOutcome::Accepted
    }
}
