//! Cancel-and-replace species hold timer
//!
//! At most one timer task is outstanding. Arming aborts the previous task
//! before spawning the next, and every expiry carries the generation it was
//! armed with so the receiver can discard anything that slipped through.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

pub struct HoldTimer {
    duration: Duration,
    handle: Option<JoinHandle<()>>,
}

impl HoldTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            handle: None,
        }
    }

    /// Replace any pending timer; `on_expire` runs with `generation` after the hold
    pub fn arm<F>(&mut self, generation: u64, on_expire: F)
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();
        let duration = self.duration;
        trace!(generation, ?duration, "Arming species hold");
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            on_expire(generation);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether a timer task is still waiting to fire
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }
}

impl Drop for HoldTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
