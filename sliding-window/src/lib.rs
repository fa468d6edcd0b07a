//! `sliding-window` — a reliable, in-order byte stream over a lossy,
//! reordering packet network, using selective acknowledgements and
//! per-packet retransmission timers.
//!
//! # Architecture
//!
//! ```text
//!   sending endpoint                          receiving endpoint
//!  ┌──────────────────────────┐              ┌──────────────────────┐
//!  │ Sender (driver)          │   data       │ Receiver (loop)      │
//!  │   └─▶ SendWindow ────────┼─────────────▶│   └─▶ Reassembler    │
//!  │         ▲   ▲            │              │          │           │
//!  │  timers─┘   │ acknowledge│     acks     │          ▼           │
//!  │        AckListener ◀─────┼──────────────┤      output bytes    │
//!  └──────────────────────────┘              └──────────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`seq`]            — circular sequence-number arithmetic
//! - [`packet`]         — wire framing (data, ack, termination)
//! - [`send_window`]    — send-side window state machine
//! - [`sender`]         — shared send window and the sender driver
//! - [`ack_listener`]   — background ack polling task
//! - [`receive_window`] — receive-side reassembly
//! - [`receiver`]       — receiver loop
//! - [`timer`]          — one-shot retransmission timers
//! - [`network`]        — network primitive trait and UDP implementation
//! - [`simulator`]      — in-memory lossy/reordering network for testing
//! - [`config`]         — protocol parameters
//! - [`state`]          — sender driver phases
//! - [`error`]          — endpoint errors

pub mod ack_listener;
pub mod config;
pub mod error;
pub mod network;
pub mod packet;
pub mod receive_window;
pub mod receiver;
pub mod send_window;
pub mod sender;
pub mod seq;
pub mod simulator;
pub mod state;
pub mod timer;

pub use config::ArqConfig;
pub use error::ArqError;
pub use network::{Network, UdpNetwork};
pub use receiver::Receiver;
pub use sender::{SendReport, Sender};
