//! Sending endpoint: the shared send window and the sender driver.
//!
//! # Architecture
//!
//! ```text
//!  Sender::send(source)                 AckListener task
//!      │ try_admit / drain_wait             │ acknowledge
//!      ▼                                    ▼
//!  ┌──────────────────────────────────────────────┐
//!  │ SendWindow                                   │
//!  │   Mutex<SendWindowState>                     │◀── timer tasks
//!  │   Notify space_available / Notify drained    │    (on_timeout)
//!  └───────────────────┬──────────────────────────┘
//!                      │ Arc<dyn Network>
//!                      ▼
//! ```
//!
//! Every mutator (admission, acknowledgement, timeout) takes the same mutex.
//! The lock is never held across an `.await`: the two blocking operations
//! register interest in their [`Notify`] first, check the state under the
//! lock, then release it and suspend.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::ack_listener::AckListener;
use crate::config::ArqConfig;
use crate::error::ArqError;
use crate::network::Network;
use crate::packet::{encode_data, encode_termination};
use crate::send_window::SendWindowState;
use crate::seq::SequenceSpace;
use crate::state::SenderState;
use crate::timer::{TimeoutHandler, TimerService};

/// A blocking window operation was interrupted by cancellation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("wait on send window cancelled")]
pub struct Cancelled;

// ---------------------------------------------------------------------------
// SendWindow
// ---------------------------------------------------------------------------

/// Send window shared by the sender driver, the ack listener, and the
/// retransmission timers.
pub struct SendWindow {
    state: Mutex<SendWindowState>,
    /// Signalled on every successful acknowledgement.
    space_available: Notify,
    /// Signalled when the in-flight set becomes empty.
    drained: Notify,
    network: Arc<dyn Network>,
    timers: TimerService,
    timeout: Duration,
}

impl SendWindow {
    pub fn new(
        space: SequenceSpace,
        network: Arc<dyn Network>,
        timeout: Duration,
        timers: TimerService,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SendWindowState::new(space)),
            space_available: Notify::new(),
            drained: Notify::new(),
            network,
            timers,
            timeout,
        })
    }

    fn lock(&self) -> MutexGuard<'_, SendWindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight()
    }

    pub fn low_edge(&self) -> u8 {
        self.lock().low_edge()
    }

    pub fn retransmissions(&self) -> u64 {
        self.lock().retransmissions()
    }

    /// Wait until `seq` is admissible, then transmit `payload` under header
    /// `seq`, record it as in flight, and arm its retransmission timer.
    pub async fn try_admit(
        self: &Arc<Self>,
        seq: u8,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        loop {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }

            let notified = self.space_available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.can_admit(seq) {
                    let packet = encode_data(seq, payload);
                    self.transmit(&packet);
                    state.record_sent(seq, packet);
                    log::debug!(
                        "[arq:send] → DATA seq={} len={} in_flight={} low={}",
                        seq,
                        payload.len(),
                        state.in_flight(),
                        state.low_edge()
                    );
                    drop(state);
                    self.arm(seq);
                    return Ok(());
                }
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = cancel.cancelled() => return Err(Cancelled),
            }
        }
    }

    /// Clear `seq` from the window.  Returns `false` for a duplicate or
    /// stale ack, which changes nothing.
    pub fn acknowledge(&self, seq: u8) -> bool {
        let mut state = self.lock();
        if !state.acknowledge(seq) {
            log::trace!("[arq:send] ← ACK seq={seq} (stale)");
            return false;
        }
        let empty = state.is_empty();
        log::debug!(
            "[arq:send] ← ACK seq={} in_flight={} low={}",
            seq,
            state.in_flight(),
            state.low_edge()
        );
        drop(state);

        if empty {
            self.drained.notify_waiters();
        }
        self.space_available.notify_waiters();
        true
    }

    /// Retransmit `seq` if it is still unacknowledged and re-arm its timer.
    pub fn on_timeout(self: &Arc<Self>, seq: u8) {
        let mut state = self.lock();
        let Some(packet) = state.retransmit(seq) else {
            return;
        };
        log::debug!(
            "[arq:timer] seq={} expired, retransmitting (tx={})",
            seq,
            state.entry(seq).map_or(0, |e| e.tx_count)
        );
        self.transmit(&packet);
        drop(state);
        self.arm(seq);
    }

    /// Wait until every in-flight packet has been acknowledged.
    pub async fn drain_wait(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        loop {
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }

            let notified = self.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.lock().is_empty() {
                return Ok(());
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = cancel.cancelled() => return Err(Cancelled),
            }
        }
    }

    /// Hand a packet to the network.  A failed send is indistinguishable
    /// from loss, so it is left to the retransmission timer.
    fn transmit(&self, packet: &[u8]) {
        if let Err(e) = self.network.send(packet) {
            log::warn!("[arq:send] send failed for seq={:?}: {e}", packet.first());
        }
    }

    fn arm(self: &Arc<Self>, seq: u8) {
        self.timers.schedule(self.timeout, seq, Arc::clone(self));
    }
}

impl TimeoutHandler for SendWindow {
    fn timeout_elapsed(self: Arc<Self>, tag: u8) {
        self.on_timeout(tag);
    }
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Summary of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    /// Source bytes delivered.
    pub bytes: usize,
    /// Distinct data packets sent (retransmissions excluded).
    pub packets: usize,
    pub retransmissions: u64,
}

/// Drives one complete transfer of a finite byte source.
pub struct Sender {
    config: ArqConfig,
    network: Arc<dyn Network>,
    cancel: CancellationToken,
}

impl Sender {
    pub fn new(config: ArqConfig, network: Arc<dyn Network>) -> Result<Self, ArqError> {
        config.validate()?;
        Ok(Self {
            config,
            network,
            cancel: CancellationToken::new(),
        })
    }

    /// Use `cancel` to abort the transfer from outside.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that aborts an in-progress [`send`](Self::send) when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Deliver `source` to the peer and send the termination packet.
    ///
    /// Returns only once every packet has been acknowledged and the
    /// termination packet is on the wire.  If cancelled first, returns
    /// [`ArqError::Incomplete`] — the peer may hold any prefix of `source`.
    pub async fn send(&self, source: &[u8]) -> Result<SendReport, ArqError> {
        let space = self.config.sequence_space();
        // Child token: finishing this transfer stops its listener and timers
        // without cancelling the caller's token.
        let transfer = self.cancel.child_token();

        let window = SendWindow::new(
            space,
            Arc::clone(&self.network),
            self.config.timeout,
            TimerService::new(transfer.clone()),
        );
        let listener = AckListener::new(
            Arc::clone(&window),
            Arc::clone(&self.network),
            self.config.poll_interval,
            transfer.clone(),
        )
        .spawn();

        log::info!(
            "[arq:send] sending {} bytes (P={} W={} M={})",
            source.len(),
            self.config.payload_size,
            space.window(),
            space.modulus()
        );
        let result = self.drive(&window, space, source, &transfer).await;

        transfer.cancel();
        if let Err(e) = listener.await {
            log::warn!("[arq:ack] listener task failed: {e}");
        }

        let packets = result?;
        let report = SendReport {
            bytes: source.len(),
            packets,
            retransmissions: window.retransmissions(),
        };
        log::info!(
            "[arq:send] done: {} bytes in {} packets, {} retransmissions",
            report.bytes,
            report.packets,
            report.retransmissions
        );
        Ok(report)
    }

    /// Run the FILLING → DRAINING → TERMINATED sequence.  Returns the number
    /// of data packets admitted.
    async fn drive(
        &self,
        window: &Arc<SendWindow>,
        space: SequenceSpace,
        source: &[u8],
        cancel: &CancellationToken,
    ) -> Result<usize, ArqError> {
        let total = source.len();
        let mut cursor = 0usize;
        let mut seq = 0u8;
        let mut packets = 0usize;
        let mut phase = SenderState::Filling;

        loop {
            match phase {
                SenderState::Filling => {
                    for chunk in source.chunks(self.config.payload_size) {
                        window
                            .try_admit(seq, chunk, cancel)
                            .await
                            .map_err(|Cancelled| ArqError::Incomplete {
                                admitted: cursor,
                                total,
                            })?;
                        seq = space.advance(seq);
                        cursor += chunk.len();
                        packets += 1;
                        log::debug!("[arq:send] admitted {cursor} of {total} bytes");
                    }
                    phase = SenderState::Draining;
                }
                SenderState::Draining => {
                    window
                        .drain_wait(cancel)
                        .await
                        .map_err(|Cancelled| ArqError::Incomplete {
                            admitted: cursor,
                            total,
                        })?;
                    phase = SenderState::Terminated;
                }
                SenderState::Terminated => {
                    self.network.send(&encode_termination())?;
                    log::debug!("[arq:send] → TERMINATION");
                    return Ok(packets);
                }
            }
            log::debug!("[arq:send] phase {phase}");
        }
    }
}
