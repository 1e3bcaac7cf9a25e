#![warn(missing_docs)]

//! A minimal client for a line-based chat server.
//!
//! The client connects over TCP, logs in with a single `username password` line,
//! and then relays lines between the user and the server in both directions until either side goes away.

use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub use arguments::{parse_options, Arguments, ConnectionOptions};
pub use connection::{Session, TcpSession, MAX_LINE_LENGTH};
pub use error::{Error, Result};
pub use stream::{RelayEnd, StreamReport, CONNECTION_DISCONNECTED, SERVER_DISCONNECTED};

/// Initialize the console subscriber at the address indicated.
pub fn init_console_subscriber(addr: SocketAddr) {
    console_subscriber::ConsoleLayer::builder()
        .retention(Duration::from_secs(60))
        .server_addr(addr)
        .init();
}

/// Log to stderr, filtered by `RUST_LOG` if set, else at `warn` (or `debug` if `verbose`).
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Command line arguments and the validated connection options derived from them.
pub mod arguments;

/// Login handshake.
pub mod auth;

/// Establishing the transport to the server.
pub mod connection;

/// Error types of the setup phase.
pub mod error;

/// Full-duplex chat streaming.
pub mod stream;
