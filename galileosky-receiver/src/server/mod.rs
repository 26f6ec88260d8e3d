//! TCP server: listener and per-terminal sessions.

pub mod listener;
pub mod session;

pub use listener::{Server, ServerConfig};
