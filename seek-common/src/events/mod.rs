//! Event types for the identification pipeline
//!
//! Provides the shared event definitions and the EventBus that the pipeline
//! publishes state changes on.

// Sub-modules (supporting types)
mod error_types;
mod prediction_types;
mod route_types;

pub use error_types::{ErrorKind, ErrorState};
pub use prediction_types::{PredictionState, Selection};
pub use route_types::{
    CapturePhase, MatchOutcome, OfflineResult, RemoteTaxon, RouteDecision, TaxonPhoto,
    VisionResult,
};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Pipeline event types
///
/// Every observable state transition is published as exactly one event.
/// Transitions that leave state unchanged publish nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// Displayed prediction changed (including reset to empty)
    PredictionChanged {
        state: PredictionState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Blocking error set or cleared
    ErrorChanged {
        error: Option<ErrorState>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Capture session moved to a new phase
    CaptureChanged {
        old_phase: CapturePhase,
        new_phase: CapturePhase,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Capture handed off to a result view
    Routed {
        decision: Box<RouteDecision>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// First classifier frame arrived; loading indicator can be hidden
    ClassifierReady {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PipelineEvent {
    /// Short event name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::PredictionChanged { .. } => "PredictionChanged",
            PipelineEvent::ErrorChanged { .. } => "ErrorChanged",
            PipelineEvent::CaptureChanged { .. } => "CaptureChanged",
            PipelineEvent::Routed { .. } => "Routed",
            PipelineEvent::ClassifierReady { .. } => "ClassifierReady",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Distribution bus for pipeline events
///
/// Uses tokio::broadcast internally: publishing never blocks, any number of
/// subscribers may listen, and slow subscribers observe `Lagged`.
///
/// # Examples
///
/// ```
/// use seek_common::events::{EventBus, PipelineEvent};
///
/// let bus = EventBus::new(100);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(PipelineEvent::ClassifierReady {
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, returning the number of subscribers that received it
    pub fn emit(
        &self,
        event: PipelineEvent,
    ) -> Result<usize, broadcast::error::SendError<PipelineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: PipelineEvent) {
        let event_type = event.event_type();
        if self.tx.send(event).is_err() {
            tracing::trace!(event_type, "No subscribers for pipeline event");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
