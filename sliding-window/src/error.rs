//! Errors surfaced by the sending and receiving endpoints.
//!
//! Packet loss, duplicate acknowledgements, and out-of-window arrivals are
//! absorbed by the protocol and never appear here.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ArqError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("network I/O error: {0}")]
    Network(#[from] std::io::Error),

    /// The sender was cancelled while waiting on the window.  Nothing about
    /// the transfer should be treated as delivered.
    #[error("transmission incomplete: {admitted} of {total} bytes admitted before cancellation")]
    Incomplete { admitted: usize, total: usize },

    /// The receiver was cancelled before the termination packet arrived.
    #[error("receive cancelled before end of stream ({delivered} bytes reassembled)")]
    ReceiveCancelled { delivered: usize },
}
