//! Clock seam for the sampling loop
//!
//! The manual benchmark mode interleaves sensor reads with timed sleeps.
//! Routing both the monotonic reading and the sleep through this trait lets
//! tests drive the full sampling loop against a virtual clock with no
//! wall-clock delay.

use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Monotonic time source with an async sleep
#[async_trait]
pub trait Clock: Send + Sync {
    /// Monotonic time since an arbitrary fixed origin
    fn monotonic(&self) -> Duration;

    /// Suspends the caller for the given duration
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by `Instant` and tokio's timer
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
