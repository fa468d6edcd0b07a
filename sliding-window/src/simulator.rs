//! In-memory network simulator for deterministic testing.
//!
//! Real networks drop and reorder packets.  To exercise the reliability
//! mechanisms without depending on actual network conditions, this module
//! provides a duplex [`Simulator`] link whose two [`SimEndpoint`]s implement
//! [`Network`], applying a configurable fault model per direction:
//!
//! | Fault        | Description                                             |
//! |--------------|---------------------------------------------------------|
//! | Packet loss  | Drop a packet with probability `loss_rate`.             |
//! | Reordering   | With probability `reorder_rate`, deliver one of the     |
//! |              | first `reorder_depth` queued packets instead of the     |
//! |              | oldest.                                                 |
//!
//! Duplication and corruption are deliberately absent: the protocol assumes a
//! network that does neither.  Every direction draws from its own seeded RNG,
//! so a failing run can be replayed exactly.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::network::Network;

/// Fault model for one direction of the link.
///
/// Probabilities are clamped to `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Probability that any given packet is silently dropped.
    pub loss_rate: f64,
    /// Probability that a receive picks a packet other than the oldest.
    pub reorder_rate: f64,
    /// How far back in the queue a reordered receive may reach.
    pub reorder_depth: usize,
    /// RNG seed for this direction.
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults by default — simulator is a transparent pass-through.
        Self {
            loss_rate: 0.0,
            reorder_rate: 0.0,
            reorder_depth: 1,
            seed: 0,
        }
    }
}

impl SimulatorConfig {
    pub fn with_loss(mut self, loss_rate: f64) -> Self {
        self.loss_rate = loss_rate;
        self
    }

    pub fn with_reorder(mut self, reorder_rate: f64, reorder_depth: usize) -> Self {
        self.reorder_rate = reorder_rate;
        self.reorder_depth = reorder_depth;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// One direction of the link.
#[derive(Debug)]
struct Channel {
    config: SimulatorConfig,
    rng: StdRng,
    queue: VecDeque<Vec<u8>>,
    /// Every packet handed to this direction, dropped or not.
    sent: Vec<Vec<u8>>,
    dropped: usize,
}

impl Channel {
    fn new(mut config: SimulatorConfig) -> Self {
        config.loss_rate = config.loss_rate.clamp(0.0, 1.0);
        config.reorder_rate = config.reorder_rate.clamp(0.0, 1.0);
        config.reorder_depth = config.reorder_depth.max(1);
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            queue: VecDeque::new(),
            sent: Vec::new(),
            dropped: 0,
        }
    }

    fn push(&mut self, packet: &[u8]) {
        self.sent.push(packet.to_vec());
        if self.rng.random_bool(self.config.loss_rate) {
            self.dropped += 1;
            log::trace!("[sim] dropped packet header={:?}", packet.first());
            return;
        }
        self.queue.push_back(packet.to_vec());
    }

    fn pop(&mut self) -> Option<Vec<u8>> {
        if self.queue.is_empty() {
            return None;
        }
        let reach = self.queue.len().min(self.config.reorder_depth);
        let idx = if reach > 1 && self.rng.random_bool(self.config.reorder_rate) {
            self.rng.random_range(0..reach)
        } else {
            0
        };
        self.queue.remove(idx)
    }
}

/// Factory for a connected pair of simulated endpoints.
pub struct Simulator;

impl Simulator {
    /// Create a pass-through link (no faults in either direction).
    pub fn pair() -> (SimEndpoint, SimEndpoint) {
        Self::with_faults(SimulatorConfig::default(), SimulatorConfig::default())
    }

    /// Create a link with `a_to_b` applied to packets sent by the first
    /// endpoint and `b_to_a` to packets sent by the second.
    pub fn with_faults(a_to_b: SimulatorConfig, b_to_a: SimulatorConfig) -> (SimEndpoint, SimEndpoint) {
        let forward = Arc::new(Mutex::new(Channel::new(a_to_b)));
        let backward = Arc::new(Mutex::new(Channel::new(b_to_a)));
        (
            SimEndpoint {
                outbound: Arc::clone(&forward),
                inbound: Arc::clone(&backward),
            },
            SimEndpoint {
                outbound: backward,
                inbound: forward,
            },
        )
    }
}

/// One side of a simulated link.
#[derive(Debug, Clone)]
pub struct SimEndpoint {
    outbound: Arc<Mutex<Channel>>,
    inbound: Arc<Mutex<Channel>>,
}

fn lock(channel: &Mutex<Channel>) -> MutexGuard<'_, Channel> {
    channel.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimEndpoint {
    /// Every packet this endpoint has sent, in order, including dropped ones.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        lock(&self.outbound).sent.clone()
    }

    /// Number of packets from this endpoint the link has dropped.
    pub fn dropped(&self) -> usize {
        lock(&self.outbound).dropped
    }
}

impl Network for SimEndpoint {
    fn send(&self, packet: &[u8]) -> io::Result<()> {
        lock(&self.outbound).push(packet);
        Ok(())
    }

    fn try_recv(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(lock(&self.inbound).pop())
    }
}
