//! Wire framing for data, acknowledgement, and termination packets.
//!
//! Every unit on the wire is one byte.  The first unit of a data or ack packet
//! is the sequence header; the termination packet is a single reserved unit.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! ```text
//!  data         ┌─────┬───────────────────────────┐
//!               │ seq │ payload (1..=P units)     │
//!               └─────┴───────────────────────────┘
//!  ack          ┌─────┐
//!               │ seq │
//!               └─────┘
//!  termination  ┌─────┐
//!               │ 200 │
//!               └─────┘
//! ```
//!
//! `seq` is always in `[0, M)` with `M = 2·W ≤ 200`, so the termination
//! sentinel is structurally distinguishable from every valid header.

use thiserror::Error;

use crate::seq::SequenceSpace;

/// Number of header units at the front of a data or ack packet.
pub const HEADER_LEN: usize = 1;

/// Reserved header value of the one-unit termination packet.
pub const TERMINATION_SENTINEL: u8 = 200;

/// A decoded inbound packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A sequenced packet.  Carries payload when it is data; an ack carries
    /// only the header, so its payload is empty.
    Data { seq: u8, payload: Vec<u8> },
    /// End-of-stream marker sent once by the sender after the window drains.
    Termination,
}

impl Frame {
    /// Parse a raw packet against the sequence space `space`.
    pub fn decode(buf: &[u8], space: &SequenceSpace) -> Result<Self, FrameError> {
        let (&header, payload) = buf.split_first().ok_or(FrameError::Empty)?;

        if header == TERMINATION_SENTINEL && payload.is_empty() {
            return Ok(Frame::Termination);
        }
        if !space.contains(header) {
            return Err(FrameError::HeaderOutOfRange {
                header,
                modulus: space.modulus(),
            });
        }
        Ok(Frame::Data {
            seq: header,
            payload: payload.to_vec(),
        })
    }
}

/// Build a data packet: header unit followed by `payload`.
pub fn encode_data(seq: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.push(seq);
    buf.extend_from_slice(payload);
    buf
}

/// Build an acknowledgement packet echoing `seq`.
pub fn encode_ack(seq: u8) -> Vec<u8> {
    vec![seq]
}

/// Build the termination packet.
pub fn encode_termination() -> Vec<u8> {
    vec![TERMINATION_SENTINEL]
}

/// Errors that can arise when parsing a raw packet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("empty packet")]
    Empty,
    #[error("header {header} outside sequence range [0, {modulus})")]
    HeaderOutOfRange { header: u8, modulus: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> SequenceSpace {
        SequenceSpace::new(20)
    }

    #[test]
    fn data_packet_layout() {
        let bytes = encode_data(7, b"abc");
        assert_eq!(bytes, vec![7, b'a', b'b', b'c']);
        assert_eq!(
            Frame::decode(&bytes, &space()),
            Ok(Frame::Data {
                seq: 7,
                payload: b"abc".to_vec()
            })
        );
    }

    #[test]
    fn ack_is_a_single_header_unit() {
        let bytes = encode_ack(39);
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(
            Frame::decode(&bytes, &space()),
            Ok(Frame::Data {
                seq: 39,
                payload: vec![]
            })
        );
    }

    #[test]
    fn termination_is_recognised() {
        assert_eq!(encode_termination(), vec![TERMINATION_SENTINEL]);
        assert_eq!(
            Frame::decode(&encode_termination(), &space()),
            Ok(Frame::Termination)
        );
    }

    #[test]
    fn sentinel_with_payload_is_not_termination() {
        assert_eq!(
            Frame::decode(&[TERMINATION_SENTINEL, 1], &space()),
            Err(FrameError::HeaderOutOfRange {
                header: TERMINATION_SENTINEL,
                modulus: 40
            })
        );
    }

    #[test]
    fn header_past_modulus_is_rejected() {
        assert_eq!(
            Frame::decode(&[40, 1, 2], &space()),
            Err(FrameError::HeaderOutOfRange {
                header: 40,
                modulus: 40
            })
        );
    }

    #[test]
    fn empty_buffer_is_rejected() {
        assert_eq!(Frame::decode(&[], &space()), Err(FrameError::Empty));
    }
}
