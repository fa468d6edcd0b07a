//! Receiving endpoint loop.
//!
//! [`Receiver::run`] polls the network, feeds every non-empty arrival to the
//! [`Reassembler`], acks each data packet, and returns the reassembled bytes
//! once the termination packet arrives.
//!
//! There is deliberately no timeout for a missing termination packet: if the
//! sender disappears first, `run` keeps polling until its cancellation token
//! fires.  The receiver is single-threaded and owns its state outright.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::ArqConfig;
use crate::error::ArqError;
use crate::network::Network;
use crate::packet::{encode_ack, Frame};
use crate::receive_window::{Arrival, Reassembler};

pub struct Receiver {
    config: ArqConfig,
    network: Arc<dyn Network>,
    cancel: CancellationToken,
}

impl Receiver {
    pub fn new(config: ArqConfig, network: Arc<dyn Network>) -> Result<Self, ArqError> {
        config.validate()?;
        Ok(Self {
            config,
            network,
            cancel: CancellationToken::new(),
        })
    }

    /// Use `cancel` to abort [`run`](Self::run) from outside.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Receive one complete stream.
    pub async fn run(&self) -> Result<Vec<u8>, ArqError> {
        let space = self.config.sequence_space();
        let mut reassembler = Reassembler::new(space);
        log::info!("[arq:recv] receiving (W={} M={})", space.window(), space.modulus());

        loop {
            if self.cancel.is_cancelled() {
                return Err(ArqError::ReceiveCancelled {
                    delivered: reassembler.output().len(),
                });
            }

            let packet = match self.network.try_recv() {
                Ok(Some(packet)) => packet,
                Ok(None) => {
                    self.back_off().await;
                    continue;
                }
                // Receive errors are not fatal; keep polling.
                Err(e) => {
                    log::warn!("[arq:recv] receive failed: {e}");
                    self.back_off().await;
                    continue;
                }
            };
            if packet.is_empty() {
                continue;
            }

            let frame = match Frame::decode(&packet, &space) {
                Ok(frame) => frame,
                Err(e) => {
                    log::debug!("[arq:recv] dropping packet: {e}");
                    continue;
                }
            };

            match reassembler.on_frame(frame) {
                Arrival::EndOfStream => {
                    log::info!(
                        "[arq:recv] ← TERMINATION; {} bytes received",
                        reassembler.output().len()
                    );
                    return Ok(reassembler.into_output());
                }
                Arrival::Data { ack, .. } => {
                    if let Err(e) = self.network.send(&encode_ack(ack)) {
                        log::warn!("[arq:recv] ack {ack} not sent: {e}");
                    }
                }
            }
        }
    }

    async fn back_off(&self) {
        tokio::select! {
            _ = tokio::time::sleep(self.config.poll_interval) => {}
            _ = self.cancel.cancelled() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::packet::{encode_data, encode_termination};
    use crate::simulator::{SimEndpoint, Simulator};

    /// Fails the first `failures` receives, then behaves like `inner`.
    struct FlakyRecv {
        inner: SimEndpoint,
        failures: AtomicUsize,
    }

    impl Network for FlakyRecv {
        fn send(&self, packet: &[u8]) -> io::Result<()> {
            self.inner.send(packet)
        }

        fn try_recv(&self) -> io::Result<Option<Vec<u8>>> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "port unreachable"));
            }
            self.inner.try_recv()
        }
    }

    fn config(w: u8) -> ArqConfig {
        ArqConfig::default()
            .with_window_size(w)
            .with_poll_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn acks_every_arrival_and_stops_on_termination() {
        let (peer, local) = Simulator::pair();
        let receiver = Receiver::new(config(2), Arc::new(local)).unwrap();

        for seq in [1u8, 0, 1, 3, 2] {
            peer.send(&encode_data(seq, &[seq])).unwrap();
        }
        // Out of range header: dropped, not acked.
        peer.send(&[77, 1]).unwrap();
        peer.send(&encode_termination()).unwrap();

        let out = tokio::time::timeout(Duration::from_secs(1), receiver.run())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out, vec![0, 1, 2, 3]);

        let acks: Vec<Vec<u8>> = std::iter::from_fn(|| peer.try_recv().unwrap()).collect();
        assert_eq!(acks, vec![vec![1], vec![0], vec![1], vec![3], vec![2]]);
    }

    #[tokio::test]
    async fn receive_errors_do_not_end_the_stream() {
        let (peer, local) = Simulator::pair();
        let flaky = FlakyRecv {
            inner: local,
            failures: AtomicUsize::new(3),
        };
        let receiver = Receiver::new(config(2), Arc::new(flaky)).unwrap();

        peer.send(&encode_data(0, b"ok")).unwrap();
        peer.send(&encode_termination()).unwrap();

        let out = tokio::time::timeout(Duration::from_secs(1), receiver.run())
            .await
            .expect("receiver should survive receive errors")
            .unwrap();
        assert_eq!(out, b"ok".to_vec());
        assert_eq!(peer.try_recv().unwrap(), Some(vec![0]));
    }

    #[tokio::test]
    async fn cancellation_stops_a_receiver_with_no_sender() {
        let (_peer, local) = Simulator::pair();
        let receiver = Receiver::new(config(4), Arc::new(local)).unwrap();
        let token = receiver.cancellation_token();

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = receiver.run().await.unwrap_err();
        assert!(matches!(err, ArqError::ReceiveCancelled { delivered: 0 }));
        canceller.await.unwrap();
    }
}
