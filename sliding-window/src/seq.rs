//! Circular sequence-number arithmetic.
//!
//! Sequence numbers live in `[0, M)` where `M = 2·W`.  The same numeric value
//! recurs every `M` packets, so ordering questions are only ever answered
//! relative to a window's low edge — never by comparing raw integers.
//!
//! ```text
//!  W = 20, M = 40, low = 35
//!
//!  35 36 37 38 39 │ 0 1 2 ... 14 │ 15 ... 34
//!  ◀──────── in window ─────────▶ ◀ outside ▶
//! ```

/// Largest window whose modulus stays below the termination sentinel, so the
/// sentinel can never be mistaken for a sequence header.
pub const MAX_WINDOW: u8 = crate::packet::TERMINATION_SENTINEL / 2;

/// A sequence space of modulus `M = 2·W` for a fixed window size `W`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSpace {
    window: u8,
}

impl SequenceSpace {
    /// Create the sequence space for a window of `window` packets.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero or larger than [`MAX_WINDOW`].
    /// [`crate::config::ArqConfig::validate`] rejects both cases before a
    /// space is ever built from user input.
    pub fn new(window: u8) -> Self {
        assert!(
            (1..=MAX_WINDOW).contains(&window),
            "window size must be in 1..={MAX_WINDOW}, got {window}"
        );
        Self { window }
    }

    /// Window size `W`.
    #[inline]
    pub fn window(&self) -> u8 {
        self.window
    }

    /// Sequence modulus `M = 2·W`.
    #[inline]
    pub fn modulus(&self) -> u8 {
        self.window * 2
    }

    /// Increment `seq` modulo `M`.
    #[inline]
    pub fn advance(&self, seq: u8) -> u8 {
        ((u16::from(seq) + 1) % u16::from(self.modulus())) as u8
    }

    /// Forward circular distance from `from` to `to`, in `[0, M)`.
    #[inline]
    pub fn offset(&self, from: u8, to: u8) -> u8 {
        let m = u16::from(self.modulus());
        ((u16::from(to) + m - u16::from(from) % m) % m) as u8
    }

    /// `true` when `seq` lies in `[low, low + W - 1] mod M`.
    ///
    /// Values outside `[0, M)` are never in any window.
    #[inline]
    pub fn in_window(&self, seq: u8, low: u8) -> bool {
        seq < self.modulus() && self.offset(low, seq) < self.window
    }

    /// `true` when `seq` is a valid header value for this space.
    #[inline]
    pub fn contains(&self, seq: u8) -> bool {
        seq < self.modulus()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulus_is_twice_the_window() {
        assert_eq!(SequenceSpace::new(20).modulus(), 40);
        assert_eq!(SequenceSpace::new(2).modulus(), 4);
    }

    #[test]
    fn largest_window_keeps_sentinel_out_of_range() {
        let s = SequenceSpace::new(MAX_WINDOW);
        assert!(!s.contains(crate::packet::TERMINATION_SENTINEL));
    }

    #[test]
    #[should_panic]
    fn zero_window_is_rejected() {
        SequenceSpace::new(0);
    }

    #[test]
    fn advance_wraps_at_modulus() {
        let s = SequenceSpace::new(20);
        assert_eq!(s.advance(0), 1);
        assert_eq!(s.advance(38), 39);
        assert_eq!(s.advance(39), 0);
    }

    #[test]
    fn window_without_wrap() {
        let s = SequenceSpace::new(20);
        assert!(s.in_window(0, 0));
        assert!(s.in_window(19, 0));
        assert!(!s.in_window(20, 0));
        assert!(!s.in_window(39, 0));
    }

    #[test]
    fn window_wrapping_past_modulus() {
        let s = SequenceSpace::new(20);
        for seq in (35..40).chain(0..15) {
            assert!(s.in_window(seq, 35), "{seq} should be inside [35, 14]");
        }
        for seq in 15..35 {
            assert!(!s.in_window(seq, 35), "{seq} should be outside [35, 14]");
        }
    }

    #[test]
    fn out_of_range_values_never_in_window() {
        let s = SequenceSpace::new(20);
        assert!(!s.in_window(40, 39));
        assert!(!s.in_window(200, 0));
        assert!(!s.contains(40));
        assert!(s.contains(39));
    }

    #[test]
    fn offset_is_forward_distance() {
        let s = SequenceSpace::new(2);
        assert_eq!(s.offset(3, 0), 1);
        assert_eq!(s.offset(0, 3), 3);
        assert_eq!(s.offset(2, 2), 0);
    }
}
