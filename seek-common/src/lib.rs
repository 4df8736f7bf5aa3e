//! # Seek Common Library
//!
//! Shared code for the Seek identification pipeline including:
//! - Taxonomic ranks, classifier candidates, and classification events
//! - Photo artifacts and coordinates
//! - Pipeline event types (PipelineEvent enum) and the EventBus
//! - Configuration loading
//! - HTTP-date and timestamp helpers
//! - SQLite datastore for common names and the species collection

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod photo;
pub mod taxa;
pub mod time;

pub use error::{Error, Result};
pub use photo::{Coordinates, PhotoArtifact};
pub use taxa::{Candidate, ClassificationEvent, Rank};
