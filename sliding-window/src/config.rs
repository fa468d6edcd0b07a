//! Protocol parameters shared by both endpoints.
//!
//! Both sides of a transfer must agree on `window_size` (it fixes the
//! sequence modulus); the other fields only affect the local endpoint.

use std::time::Duration;

use thiserror::Error;

use crate::seq::{SequenceSpace, MAX_WINDOW};

/// Default number of payload units per data packet (P).
pub const DEFAULT_PAYLOAD_SIZE: usize = 128;
/// Default window size (W); implies a sequence modulus of 40.
pub const DEFAULT_WINDOW_SIZE: u8 = 20;
/// Default retransmission timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);
/// Default idle back-off between empty network polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Adjustable protocol parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArqConfig {
    /// Maximum payload units carried by one data packet.
    pub payload_size: usize,
    /// Maximum number of unacknowledged packets in flight.
    pub window_size: u8,
    /// Delay before an unacknowledged packet is retransmitted.
    pub timeout: Duration,
    /// Back-off applied after a poll that returned nothing.
    pub poll_interval: Duration,
}

impl Default for ArqConfig {
    fn default() -> Self {
        Self {
            payload_size: DEFAULT_PAYLOAD_SIZE,
            window_size: DEFAULT_WINDOW_SIZE,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ArqConfig {
    pub fn with_payload_size(mut self, payload_size: usize) -> Self {
        self.payload_size = payload_size;
        self
    }

    pub fn with_window_size(mut self, window_size: u8) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Check every parameter is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.payload_size == 0 {
            return Err(ConfigError::ZeroPayload);
        }
        if !(1..=MAX_WINDOW).contains(&self.window_size) {
            return Err(ConfigError::WindowOutOfRange(self.window_size));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    /// Sequence space implied by `window_size`.
    ///
    /// Call [`validate`](Self::validate) first; an out-of-range window panics.
    pub fn sequence_space(&self) -> SequenceSpace {
        SequenceSpace::new(self.window_size)
    }
}

/// Rejected configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("payload size must be at least 1")]
    ZeroPayload,
    #[error("window size {0} outside 1..={max}", max = MAX_WINDOW)]
    WindowOutOfRange(u8),
    #[error("retransmission timeout must be non-zero")]
    ZeroTimeout,
    #[error("poll interval must be non-zero")]
    ZeroPollInterval,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let c = ArqConfig::default();
        assert_eq!(c.payload_size, 128);
        assert_eq!(c.window_size, 20);
        assert_eq!(c.timeout, Duration::from_millis(500));
        assert_eq!(c.sequence_space().modulus(), 40);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_window_that_would_collide_with_sentinel() {
        let c = ArqConfig::default().with_window_size(101);
        assert_eq!(c.validate(), Err(ConfigError::WindowOutOfRange(101)));
        assert!(ArqConfig::default().with_window_size(100).validate().is_ok());
    }

    #[test]
    fn rejects_zero_values() {
        let base = ArqConfig::default();
        assert_eq!(
            base.clone().with_payload_size(0).validate(),
            Err(ConfigError::ZeroPayload)
        );
        assert_eq!(
            base.clone().with_window_size(0).validate(),
            Err(ConfigError::WindowOutOfRange(0))
        );
        assert_eq!(
            base.clone().with_timeout(Duration::ZERO).validate(),
            Err(ConfigError::ZeroTimeout)
        );
        assert_eq!(
            base.with_poll_interval(Duration::ZERO).validate(),
            Err(ConfigError::ZeroPollInterval)
        );
    }
}
