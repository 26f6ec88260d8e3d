//! galileosky-receiver: TCP ingestion server for Galileosky tracking
//! terminals.
//!
//! Terminals connect over TCP, stream framed tag data, and receive a
//! three-byte confirmation per frame. Decoded records are appended to a
//! JSON Lines file.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use log::info;

mod logging;
mod server;
mod sink;

use galileosky_protocol::DEFAULT_MAX_PAYLOAD;
use server::{Server, ServerConfig};

/// galileosky-receiver - TCP ingestion server for Galileosky terminals
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:5025")]
    listen: SocketAddr,

    /// Maximum concurrent connections
    #[arg(short = 'c', long, default_value = "100")]
    max_connections: usize,

    /// Path to the decoded record output (JSON Lines)
    #[arg(short, long, default_value = "records.jsonl")]
    output: PathBuf,

    /// Configuration file path
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory where log files are stored
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Number of days to keep log files
    #[arg(long, default_value = "7")]
    log_retention_days: u64,
}

/// Configuration file format.
#[derive(Debug, serde::Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    logging: LoggingSection,
}

#[derive(Debug, serde::Deserialize, Default)]
struct ServerSection {
    listen: Option<String>,
    max_connections: Option<usize>,
    max_payload: Option<usize>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct StorageSection {
    output: Option<String>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct LoggingSection {
    log_dir: Option<String>,
    retention_days: Option<u64>,
    level: Option<String>,
}

fn load_config(path: &PathBuf) -> Result<ConfigFile, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load config file: explicit path > auto-detect > default
    let config_path = args.config.clone().or_else(|| {
        let default_path = PathBuf::from("galileosky-receiver.toml");
        if default_path.exists() {
            Some(default_path)
        } else {
            None
        }
    });
    let file_config = if let Some(config_path) = &config_path {
        match load_config(config_path) {
            Ok(c) => {
                eprintln!("Loaded config from: {}", config_path.display());
                c
            }
            Err(e) => {
                eprintln!("Failed to load config file: {}", e);
                return Err(e);
            }
        }
    } else {
        ConfigFile::default()
    };

    // Merge logging configs (command line takes precedence)
    let log_dir = if args.log_dir.to_string_lossy() != "logs" {
        args.log_dir.clone()
    } else {
        PathBuf::from(file_config.logging.log_dir.as_deref().unwrap_or("logs"))
    };

    let log_retention_days = if args.log_retention_days != 7 {
        args.log_retention_days
    } else {
        file_config.logging.retention_days.unwrap_or(7)
    };

    let log_level = file_config.logging.level.as_deref();
    logging::init_logging(&log_dir, log_retention_days, args.verbose, log_level)
        .expect("Failed to initialize logging");

    let listen_addr = match file_config.server.listen.as_deref() {
        Some(listen) => listen.parse::<SocketAddr>()?,
        None => args.listen,
    };
    let max_connections = file_config
        .server
        .max_connections
        .unwrap_or(args.max_connections);
    let max_payload = file_config
        .server
        .max_payload
        .unwrap_or(DEFAULT_MAX_PAYLOAD);
    let output = file_config
        .storage
        .output
        .map(PathBuf::from)
        .unwrap_or(args.output);

    info!("galileosky-receiver starting...");
    info!("  Listen address: {}", listen_addr);
    info!("  Max connections: {}", max_connections);
    info!("  Max frame payload: {} bytes", max_payload);
    info!("  Record output: {:?}", output);

    let sink = sink::spawn_writer(output);

    let config = ServerConfig {
        listen_addr,
        max_connections,
        max_payload,
        sink,
    };

    let server = Server::new(config);
    server.run().await?;

    Ok(())
}
