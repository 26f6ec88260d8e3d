//! TCP listener for accepting terminal connections.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::server::session::Session;
use crate::sink::DecodedBatch;

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub listen_addr: SocketAddr,
    /// Maximum concurrent terminal connections.
    pub max_connections: usize,
    /// Maximum accepted declared payload length per frame.
    pub max_payload: usize,
    /// Sender half of the persistence channel.
    pub sink: mpsc::Sender<DecodedBatch>,
}

/// The main server that listens for connections and spawns sessions.
pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Run the server, accepting connections until shutdown.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        info!("Listening for terminals on {}", self.config.listen_addr);

        let active = Arc::new(AtomicUsize::new(0));
        let mut connection_count = 0u64;

        loop {
            match listener.accept().await {
                Ok((socket, addr)) => {
                    if active.load(Ordering::Relaxed) >= self.config.max_connections {
                        warn!("Connection limit reached, rejecting {}", addr);
                        continue;
                    }
                    connection_count += 1;
                    let session_id = connection_count;

                    info!("[Session {}] Terminal connected from {}", session_id, addr);

                    active.fetch_add(1, Ordering::Relaxed);
                    let active = Arc::clone(&active);
                    let sink = self.config.sink.clone();
                    let max_payload = self.config.max_payload;

                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(socket, addr, session_id, max_payload, sink).await
                        {
                            error!("[Session {}] Connection error: {}", session_id, e);
                        }
                        info!("[Session {}] Connection closed", session_id);
                        active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Handle a single terminal connection.
async fn handle_connection(
    socket: TcpStream,
    addr: SocketAddr,
    session_id: u64,
    max_payload: usize,
    sink: mpsc::Sender<DecodedBatch>,
) -> std::io::Result<()> {
    // Confirmations must not sit in Nagle's buffer.
    socket.set_nodelay(true)?;

    let mut session = Session::new(session_id, addr, socket, max_payload, sink);
    session.run().await
}
