use std::io;
use thiserror::Error;

/// Everything that can stop the client before the chat streaming starts.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed command line.
    #[error("Error parsing arguments")]
    Argument(#[from] clap::Error),

    /// The transport to the server could not be established.
    #[error("Failed to connect to {address}")]
    Connection {
        /// `host:port` that was dialed.
        address: String,
        /// Underlying cause (DNS failure, refused connection, ...).
        #[source]
        source: io::Error,
    },

    /// The server answered the credentials with something other than a welcome.
    /// Carries the server's response verbatim.
    #[error("Failed authentication: {0}")]
    Rejected(String),

    /// The server closed the connection before sending a response line.
    #[error("Server closed the connection before answering the credentials")]
    ServerClosed,

    /// Network failure while exchanging credentials.
    #[error("Error while attempting to authenticate")]
    Handshake(#[source] io::Error),
}

/// Result alias for the setup phase.
pub type Result<T> = std::result::Result<T, Error>;
