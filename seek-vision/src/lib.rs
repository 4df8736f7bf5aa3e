//! # Seek Vision
//!
//! Real-time species identification pipeline:
//! - Classification stream debouncing with a cancel-and-replace species hold
//! - Capture session coordination over platform capture backends
//! - Online vision scoring with downtime backoff
//! - Single-queue event dispatch loop tying the components together

pub mod capture;
pub mod collaborators;
pub mod debouncer;
pub mod error_state;
pub mod hold_timer;
pub mod online;
pub mod pipeline;
pub mod scoring;
pub mod store;

pub use online::OnlineMatcher;
pub use pipeline::{NativeEvent, Pipeline, PipelineDeps, PipelineHandle, PipelineMessage};
