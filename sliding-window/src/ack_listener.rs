//! Background acknowledgement listener for the sending endpoint.
//!
//! The network primitive never suspends, so the listener polls: every packet
//! that arrives is treated as an ack for the sequence number in its first
//! unit, and an empty poll backs off for `poll_interval` before trying again.
//! The only state it touches is the shared [`SendWindow`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::network::Network;
use crate::sender::SendWindow;

pub struct AckListener {
    window: Arc<SendWindow>,
    network: Arc<dyn Network>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl AckListener {
    pub fn new(
        window: Arc<SendWindow>,
        network: Arc<dyn Network>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            window,
            network,
            poll_interval,
            cancel,
        }
    }

    /// Run the listener as its own task.  The handle resolves to the number
    /// of acks that cleared a slot once `cancel` fires.
    pub fn spawn(self) -> JoinHandle<u64> {
        tokio::spawn(self.run())
    }

    /// Poll until cancelled.
    pub async fn run(self) -> u64 {
        let mut accepted = 0u64;
        log::debug!("[arq:ack] listener started");

        while !self.cancel.is_cancelled() {
            match self.network.try_recv() {
                Ok(Some(packet)) => {
                    if let Some(&seq) = packet.first() {
                        if self.window.acknowledge(seq) {
                            accepted += 1;
                        }
                    }
                    continue;
                }
                Ok(None) => {}
                // Receive errors are not fatal; keep polling.
                Err(e) => log::warn!("[arq:ack] receive failed: {e}"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = self.cancel.cancelled() => break,
            }
        }

        log::debug!("[arq:ack] listener stopped after {accepted} acks");
        accepted
    }
}
