//! Online vision scoring
//!
//! The remote service ranks taxa for a submitted photo. Callers pass an
//! explicit [`RequestContext`] (token, user agent, endpoint) into every call.

pub mod client;
pub mod response;

pub use client::ScoringClient;
pub use response::{interpret, CommonAncestor, ScoreResponse, ScoredResult, SPECIES_SCORE_THRESHOLD};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use seek_common::events::{ErrorKind, ErrorState};
use seek_common::time::retry_after_hours;
use seek_common::PhotoArtifact;
use thiserror::Error;

/// HTTP status the service uses for planned downtime
pub const DOWNTIME_STATUS: u16 = 503;

/// Per-call request parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub token: String,
    pub user_agent: String,
    pub endpoint: String,
}

/// Scoring failure
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Scoring service returned {status}")]
    Http {
        status: u16,
        retry_after: Option<String>,
        body: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Token error: {0}")]
    Token(String),
}

impl ScoreError {
    /// Map to the user-facing error: 503 is downtime, everything else online-vision
    pub fn to_error_state(&self, now: DateTime<Utc>) -> ErrorState {
        match self {
            ScoreError::Http {
                status: DOWNTIME_STATUS,
                retry_after,
                ..
            } => {
                let hours = retry_after
                    .as_deref()
                    .and_then(|value| retry_after_hours(value, now));
                ErrorState::downtime(hours)
            }
            other => ErrorState::with_detail(ErrorKind::OnlineVision, other.to_string()),
        }
    }
}

#[async_trait]
pub trait VisionScorer: Send + Sync {
    async fn score(
        &self,
        photo: &PhotoArtifact,
        ctx: &RequestContext,
    ) -> Result<ScoreResponse, ScoreError>;
}
