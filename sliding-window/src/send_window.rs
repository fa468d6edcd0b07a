//! Send-side window state.
//!
//! [`SendWindowState`] tracks every transmitted-but-unacknowledged packet and
//! the window's low edge.  Acknowledgements are **selective**: each ack frees
//! exactly the slot it names, in any order.  The low edge, however, only moves
//! over slots that are already free, so one slow packet at the front holds
//! the window in place even when later slots have been acknowledged.
//!
//! ```text
//!  low_edge                         low_edge + W - 1
//!      │                                   │
//!  ────┼───────────────────────────────────┼──────▶ seq space (mod M)
//!      │ [in flight] [acked] [in flight] … │
//!      └──────── admissible seqs ──────────┘
//! ```
//!
//! This module only manages state; transmission, timers, and blocking are
//! the job of [`crate::sender::SendWindow`].

use std::collections::HashMap;

use crate::seq::SequenceSpace;

// ---------------------------------------------------------------------------
// InFlight
// ---------------------------------------------------------------------------

/// A transmitted packet awaiting acknowledgement.
#[derive(Debug, Clone)]
pub struct InFlight {
    /// The encoded packet, header included, exactly as first transmitted.
    pub packet: Vec<u8>,
    /// Total number of times this packet has been transmitted.
    pub tx_count: u32,
}

// ---------------------------------------------------------------------------
// SendWindowState
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SendWindowState {
    space: SequenceSpace,
    /// Oldest sequence number not yet cleared.
    low_edge: u8,
    /// Sequence number after the most recently admitted packet.  The low
    /// edge never moves past it: slots that were never sent are not cleared.
    next_seq: u8,
    in_flight: HashMap<u8, InFlight>,
    retransmissions: u64,
}

impl SendWindowState {
    pub fn new(space: SequenceSpace) -> Self {
        Self {
            space,
            low_edge: 0,
            next_seq: 0,
            in_flight: HashMap::with_capacity(usize::from(space.window())),
            retransmissions: 0,
        }
    }

    pub fn low_edge(&self) -> u8 {
        self.low_edge
    }

    /// Number of packets awaiting acknowledgement.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn contains(&self, seq: u8) -> bool {
        self.in_flight.contains_key(&seq)
    }

    /// Retransmissions performed so far across all packets.
    pub fn retransmissions(&self) -> u64 {
        self.retransmissions
    }

    /// `true` when a packet with header `seq` may be sent now: the window has
    /// a free slot and `seq` lies within `[low_edge, low_edge + W - 1]`.
    pub fn can_admit(&self, seq: u8) -> bool {
        self.in_flight.len() < usize::from(self.space.window())
            && self.space.in_window(seq, self.low_edge)
    }

    /// Record a just-transmitted packet.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `seq` is not admissible.  Check [`can_admit`]
    /// before calling.
    ///
    /// [`can_admit`]: Self::can_admit
    pub fn record_sent(&mut self, seq: u8, packet: Vec<u8>) {
        debug_assert!(
            self.can_admit(seq),
            "record_sent({seq}) outside window low={} in_flight={}",
            self.low_edge,
            self.in_flight.len()
        );
        self.in_flight.insert(seq, InFlight { packet, tx_count: 1 });
        self.next_seq = self.space.advance(seq);
    }

    /// Clear the slot for `seq`.
    ///
    /// Returns `false` (and changes nothing) for a duplicate or stale ack.
    pub fn acknowledge(&mut self, seq: u8) -> bool {
        if self.in_flight.remove(&seq).is_none() {
            return false;
        }
        self.shift_low_edge();
        true
    }

    /// Packet to resend for an expired timer on `seq`, or `None` if it has
    /// been acknowledged in the meantime.
    pub fn retransmit(&mut self, seq: u8) -> Option<Vec<u8>> {
        let entry = self.in_flight.get_mut(&seq)?;
        entry.tx_count += 1;
        self.retransmissions += 1;
        Some(entry.packet.clone())
    }

    pub fn entry(&self, seq: u8) -> Option<&InFlight> {
        self.in_flight.get(&seq)
    }

    /// Walk the low edge forward over free slots, stopping at the first
    /// unacknowledged one, at the first never-sent one, or after W slots.
    fn shift_low_edge(&mut self) {
        let mut low = self.low_edge;
        for _ in 0..self.space.window() {
            if low == self.next_seq || self.in_flight.contains_key(&low) {
                break;
            }
            low = self.space.advance(low);
        }
        self.low_edge = low;
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::encode_data;

    fn window(w: u8) -> SendWindowState {
        SendWindowState::new(SequenceSpace::new(w))
    }

    fn send(s: &mut SendWindowState, seq: u8) {
        assert!(s.can_admit(seq), "seq {seq} should be admissible");
        s.record_sent(seq, encode_data(seq, &[seq; 4]));
    }

    #[test]
    fn initial_state() {
        let s = window(4);
        assert_eq!(s.low_edge(), 0);
        assert!(s.is_empty());
        assert!(s.can_admit(0));
        assert!(s.can_admit(3));
        assert!(!s.can_admit(4));
    }

    #[test]
    fn full_window_blocks_admission() {
        let mut s = window(2);
        send(&mut s, 0);
        send(&mut s, 1);
        assert_eq!(s.in_flight(), 2);
        assert!(!s.can_admit(2));
    }

    #[test]
    fn in_order_ack_slides_low_edge() {
        let mut s = window(4);
        send(&mut s, 0);
        send(&mut s, 1);
        assert!(s.acknowledge(0));
        assert_eq!(s.low_edge(), 1);
        assert!(s.can_admit(4));
        assert!(!s.can_admit(5));
    }

    #[test]
    fn duplicate_ack_leaves_state_unchanged() {
        let mut s = window(4);
        send(&mut s, 0);
        send(&mut s, 1);
        assert!(s.acknowledge(0));
        let (low, n) = (s.low_edge(), s.in_flight());

        assert!(!s.acknowledge(0));
        assert!(!s.acknowledge(3));
        assert_eq!(s.low_edge(), low);
        assert_eq!(s.in_flight(), n);
    }

    #[test]
    fn ack_behind_unacked_head_frees_slot_but_not_edge() {
        let mut s = window(4);
        for seq in 0..4 {
            send(&mut s, seq);
        }
        assert!(s.acknowledge(2));
        assert!(s.acknowledge(3));

        // Two slots free, but the edge is still pinned on 0.
        assert_eq!(s.in_flight(), 2);
        assert_eq!(s.low_edge(), 0);
        assert!(!s.can_admit(4));

        // Clearing the head releases everything behind it up to 1.
        assert!(s.acknowledge(0));
        assert_eq!(s.low_edge(), 1);
        assert!(s.can_admit(4));
        assert!(!s.can_admit(5));

        assert!(s.acknowledge(1));
        assert_eq!(s.low_edge(), 4);
        assert!(s.is_empty());
    }

    #[test]
    fn edge_stops_at_next_unsent_sequence() {
        let mut s = window(20);
        send(&mut s, 0);
        assert!(s.acknowledge(0));
        assert_eq!(s.low_edge(), 1);
        assert!(s.can_admit(1));
    }

    #[test]
    fn wraparound_admission() {
        let mut s = window(2);
        let mut seq = 0;
        for _ in 0..10 {
            send(&mut s, seq);
            assert!(s.acknowledge(seq));
            seq = SequenceSpace::new(2).advance(seq);
            assert_eq!(s.low_edge(), seq);
        }
    }

    #[test]
    fn retransmit_returns_identical_packet() {
        let mut s = window(4);
        send(&mut s, 1);
        let original = s.entry(1).unwrap().packet.clone();

        assert_eq!(s.retransmit(1), Some(original));
        assert_eq!(s.entry(1).unwrap().tx_count, 2);
        assert_eq!(s.retransmissions(), 1);

        assert!(s.acknowledge(1));
        assert_eq!(s.retransmit(1), None);
        assert_eq!(s.retransmissions(), 1);
    }
}
