use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// A write-once shutdown latch shared between the lifecycle and the supervision loop.
///
/// Once [`ShutdownSignal::signal`] has been called the latch stays set for the
/// rest of its life. Clones observe the same latch.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the latch. Calling it again is a no-op.
    pub fn signal(&self) {
        self.token.cancel();
    }

    /// Non-blocking poll.
    pub fn is_set(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns `true` as soon as the latch is set, or `false` once `timeout`
    /// elapses. A zero timeout is a plain poll.
    pub async fn is_signaled(&self, timeout: Duration) -> bool {
        if self.is_set() {
            return true;
        }
        if timeout.is_zero() {
            return false;
        }
        tokio::time::timeout(timeout, self.token.cancelled())
            .await
            .is_ok()
    }

    /// Resolves once the latch is set.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}
