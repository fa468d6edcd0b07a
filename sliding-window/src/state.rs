//! Sender driver phases.
//!
//! ```text
//!  FILLING ──source exhausted──▶ DRAINING ──window empty──▶ TERMINATED
//!     │                             │
//!     └──────── cancelled ──────────┴──▶ aborted (transfer incomplete)
//! ```

/// Phase of a [`crate::sender::Sender`] transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderState {
    /// Slicing the source into packets and admitting them into the window.
    #[default]
    Filling,
    /// Source exhausted; waiting for every in-flight packet to be acked.
    Draining,
    /// Termination packet sent; the transfer is over.
    Terminated,
}

impl std::fmt::Display for SenderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Filling => "FILLING",
            Self::Draining => "DRAINING",
            Self::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}
