//! Receive-side reassembly.
//!
//! [`Reassembler`] accepts any packet whose header falls inside the receive
//! window, buffers it by **absolute** index, and moves contiguous runs into
//! the output as soon as the next expected packet is present.
//!
//! Headers wrap every `M` packets, so buffered entries are keyed by an
//! unwrapped counter instead:
//!
//! ```text
//!  absolute:   lowest_expected          lowest_expected + W - 1
//!                    │                            │
//!  header:    lowest_expected % M   …   (lowest_expected + W - 1) % M
//! ```
//!
//! Every data arrival (accepted, duplicate, or out of window) is acked with
//! its own header.  This module only manages state; the caller sends the
//! ack.

use std::collections::BTreeMap;

use crate::packet::Frame;
use crate::seq::SequenceSpace;

/// Outcome of feeding one frame to the [`Reassembler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arrival {
    /// A sequenced packet.  The caller must ack `ack` whatever else happened.
    Data {
        ack: u8,
        /// `false` for duplicates and arrivals outside the window.
        stored: bool,
        /// Packets moved into the output by this arrival.
        drained: usize,
    },
    /// The termination packet: the stream is complete.
    EndOfStream,
}

#[derive(Debug)]
pub struct Reassembler {
    space: SequenceSpace,
    /// Absolute index of the next packet the output is waiting for.
    lowest_expected: u64,
    buffered: BTreeMap<u64, Vec<u8>>,
    output: Vec<u8>,
}

impl Reassembler {
    pub fn new(space: SequenceSpace) -> Self {
        Self {
            space,
            lowest_expected: 0,
            buffered: BTreeMap::new(),
            output: Vec::new(),
        }
    }

    pub fn lowest_expected(&self) -> u64 {
        self.lowest_expected
    }

    /// Packets held out of order, waiting for a gap to fill.
    pub fn buffered(&self) -> usize {
        self.buffered.len()
    }

    /// Bytes reassembled so far, in order.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn into_output(self) -> Vec<u8> {
        self.output
    }

    /// Process one decoded frame.
    pub fn on_frame(&mut self, frame: Frame) -> Arrival {
        match frame {
            Frame::Termination => Arrival::EndOfStream,
            Frame::Data { seq, payload } => self.on_data(seq, payload),
        }
    }

    /// Process one data packet with header `seq`.
    pub fn on_data(&mut self, seq: u8, content: Vec<u8>) -> Arrival {
        let stored = match self.slot_for(seq) {
            Some(idx) if !self.buffered.contains_key(&idx) => {
                self.buffered.insert(idx, content);
                true
            }
            _ => false,
        };

        let drained = if seq == self.expected_header() {
            self.drain()
        } else {
            0
        };

        log::debug!(
            "[arq:recv] ← DATA seq={} stored={} drained={} lowest={} buffered={}",
            seq,
            stored,
            drained,
            self.lowest_expected,
            self.buffered.len()
        );
        Arrival::Data {
            ack: seq,
            stored,
            drained,
        }
    }

    /// Header value of the next expected packet.
    fn expected_header(&self) -> u8 {
        (self.lowest_expected % u64::from(self.space.modulus())) as u8
    }

    /// Absolute index in `[lowest_expected, lowest_expected + W - 1]` whose
    /// header is `seq`, if any.  `W < M` makes the match unique.
    fn slot_for(&self, seq: u8) -> Option<u64> {
        if !self.space.contains(seq) {
            return None;
        }
        let offset = self.space.offset(self.expected_header(), seq);
        (offset < self.space.window()).then(|| self.lowest_expected + u64::from(offset))
    }

    /// Move the contiguous run starting at `lowest_expected` into the output.
    fn drain(&mut self) -> usize {
        let mut drained = 0;
        while let Some(content) = self.buffered.remove(&self.lowest_expected) {
            self.output.extend_from_slice(&content);
            self.lowest_expected += 1;
            drained += 1;
        }
        drained
    }
}
