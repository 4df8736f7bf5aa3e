//! Single shared slot holding the current blocking error
//!
//! Last writer wins, except that a `Device` error is sticky: once set, every
//! later error is suppressed until the slot is cleared by a screen reset.

use seek_common::events::{ErrorKind, ErrorState};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct ErrorSlot {
    current: Option<ErrorState>,
}

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ErrorState> {
        self.current.as_ref()
    }

    /// Store `error`, returning whether the visible error changed
    pub fn set(&mut self, error: ErrorState) -> bool {
        if let Some(existing) = &self.current {
            if existing.kind == ErrorKind::Device {
                debug!(
                    suppressed = %error.kind,
                    "Device error active, suppressing later error"
                );
                return false;
            }
            if *existing == error {
                return false;
            }
        }

        warn!(kind = %error.kind, detail = ?error.detail, "Pipeline error set");
        self.current = Some(error);
        true
    }

    /// Clear the slot (screen reset), returning whether anything was cleared
    pub fn clear(&mut self) -> bool {
        self.current.take().is_some()
    }
}
