//! One-shot retransmission timers.
//!
//! [`TimerService::schedule`] arms a timer that calls
//! [`TimeoutHandler::timeout_elapsed`] once with its tag after the delay.
//! There is no per-timer cancellation: a handler must treat a firing for a
//! tag it no longer cares about as a no-op.  Cancelling the service's token
//! disarms every pending timer at once, which is how a finished transfer
//! cleans up.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Receiver of timer firings.
pub trait TimeoutHandler: Send + Sync + 'static {
    /// Called once per scheduled timer, on a runtime worker, with the tag
    /// the timer was armed with.
    fn timeout_elapsed(self: Arc<Self>, tag: u8);
}

/// Spawns timer tasks on the current tokio runtime.
#[derive(Debug, Clone)]
pub struct TimerService {
    cancel: CancellationToken,
}

impl TimerService {
    /// Create a service whose pending timers are disarmed when `cancel` fires.
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Fire `handler.timeout_elapsed(tag)` once after `delay`.
    pub fn schedule<H: TimeoutHandler>(&self, delay: Duration, tag: u8, handler: Arc<H>) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => handler.timeout_elapsed(tag),
                _ = cancel.cancelled() => {}
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        fired: Mutex<Vec<u8>>,
    }

    impl TimeoutHandler for Recorder {
        fn timeout_elapsed(self: Arc<Self>, tag: u8) {
            self.fired.lock().unwrap().push(tag);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let rec = Arc::new(Recorder::default());
        let timers = TimerService::new(CancellationToken::new());
        timers.schedule(Duration::from_millis(500), 7, Arc::clone(&rec));

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(rec.fired.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(*rec.fired.lock().unwrap(), vec![7]);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*rec.fired.lock().unwrap(), vec![7]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_disarms_pending_timers() {
        let rec = Arc::new(Recorder::default());
        let token = CancellationToken::new();
        let timers = TimerService::new(token.clone());
        timers.schedule(Duration::from_millis(100), 1, Arc::clone(&rec));
        timers.schedule(Duration::from_millis(200), 2, Arc::clone(&rec));

        tokio::time::sleep(Duration::from_millis(150)).await;
        token.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(*rec.fired.lock().unwrap(), vec![1]);
    }
}
