//! Capture & persistence coordinator
//!
//! Drives one capture session through
//! `Idle -> Capturing -> Saving -> Routing -> Idle`, with `Errored` reachable
//! from every phase. Each method consumes the completion of one suspension
//! point and returns the next [`CaptureStep`] for the dispatch loop to run.
//!
//! Completions carry the session id they were started under; anything from an
//! earlier session (for example after the screen was left mid-capture) is
//! ignored.

pub mod backend;

pub use backend::{select_backend, CaptureBackend, ManagerBackend, SaveFailure, ViewBackend};

use seek_common::events::{
    CapturePhase, ErrorKind, ErrorState, MatchOutcome, OfflineResult, PredictionState,
};
use seek_common::taxa::Candidate;
use seek_common::PhotoArtifact;
use thiserror::Error;
use tracing::{debug, info};

/// Signature identifying a storage-permission denial in a save failure message
pub const PERMISSION_DENIAL_SIGNATURE: &str = "permission denied";

/// Capture request rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Capture already in progress (phase: {0})")]
    SessionActive(CapturePhase),

    #[error("Capture blocked by {0} error")]
    Blocked(ErrorKind),
}

/// Next action for the dispatch loop
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureStep {
    /// Invoke the platform capture capability
    TakePicture { session: u64 },
    /// Persist the photo to the gallery
    SavePhoto { session: u64, photo: PhotoArtifact },
    /// Hand off to the offline result view
    RouteOffline(OfflineResult),
    /// Hand off to the online scoring client
    ScoreOnline { session: u64, photo: PhotoArtifact },
    /// Hand off to the match view
    RouteMatch(MatchOutcome),
    /// Session failed
    Fail(ErrorState),
    /// Completion was stale or out of phase
    Ignore,
}

/// Classify a gallery save failure by its message
pub fn classify_save_failure(message: &str) -> ErrorKind {
    if message
        .to_ascii_lowercase()
        .contains(PERMISSION_DENIAL_SIGNATURE)
    {
        ErrorKind::Gallery
    } else {
        ErrorKind::Save
    }
}

/// Exactly one capture session at a time
#[derive(Debug)]
pub struct CaptureCoordinator {
    phase: CapturePhase,
    session: u64,
    photo: Option<PhotoArtifact>,
    predictions: Vec<Candidate>,
}

impl Default for CaptureCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureCoordinator {
    pub fn new() -> Self {
        Self {
            phase: CapturePhase::Idle,
            session: 0,
            photo: None,
            predictions: Vec::new(),
        }
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    /// Whether classifier output must be frozen; an errored session releases it
    pub fn picture_taken(&self) -> bool {
        matches!(
            self.phase,
            CapturePhase::Capturing | CapturePhase::Saving | CapturePhase::Routing
        )
    }

    /// Shutter pressed: snapshot predictions and start capturing
    pub fn request_capture(
        &mut self,
        predictions: &PredictionState,
        blocking_error: Option<ErrorKind>,
    ) -> Result<CaptureStep, CaptureError> {
        if self.phase != CapturePhase::Idle {
            return Err(CaptureError::SessionActive(self.phase));
        }
        if let Some(kind) = blocking_error {
            return Err(CaptureError::Blocked(kind));
        }

        self.session += 1;
        self.predictions = predictions.snapshot_predictions();
        self.photo = None;
        self.phase = CapturePhase::Capturing;
        info!(
            session = self.session,
            predictions = self.predictions.len(),
            "Capture started"
        );
        Ok(CaptureStep::TakePicture {
            session: self.session,
        })
    }

    pub fn on_picture_taken(
        &mut self,
        session: u64,
        result: Result<PhotoArtifact, String>,
    ) -> CaptureStep {
        if !self.is_current(session, CapturePhase::Capturing) {
            return CaptureStep::Ignore;
        }

        match result {
            Ok(mut photo) => {
                photo.on_device_predictions = self.predictions.clone();
                self.phase = CapturePhase::Saving;
                self.photo = Some(photo.clone());
                CaptureStep::SavePhoto { session, photo }
            }
            Err(message) => self.fail(ErrorState::with_detail(ErrorKind::Take, message)),
        }
    }

    pub fn on_photo_saved(
        &mut self,
        session: u64,
        result: Result<Option<PhotoArtifact>, SaveFailure>,
    ) -> CaptureStep {
        if !self.is_current(session, CapturePhase::Saving) {
            return CaptureStep::Ignore;
        }

        match result {
            Ok(Some(persisted)) => {
                let photo = self.merge_persisted(persisted);
                self.photo = Some(photo.clone());
                self.route(photo)
            }
            Ok(None) => self.fail(ErrorState::with_detail(
                ErrorKind::Save,
                "gallery returned no photo after save",
            )),
            Err(failure) => {
                let kind = classify_save_failure(&failure.message);
                self.fail(ErrorState::with_detail(kind, failure.message))
            }
        }
    }

    /// Offline result when predictions exist, otherwise online scoring
    fn route(&mut self, photo: PhotoArtifact) -> CaptureStep {
        self.phase = CapturePhase::Routing;
        if photo.on_device_predictions.is_empty() {
            info!(session = self.session, "No on-device prediction, scoring online");
            CaptureStep::ScoreOnline {
                session: self.session,
                photo,
            }
        } else {
            info!(session = self.session, "Routing to offline result");
            self.phase = CapturePhase::Idle;
            CaptureStep::RouteOffline(OfflineResult {
                predictions: photo.on_device_predictions.clone(),
                photo,
            })
        }
    }

    /// Online flow finished; the outcome is delivered regardless of session
    pub fn on_online_finished(
        &mut self,
        session: u64,
        result: Result<MatchOutcome, ErrorState>,
    ) -> CaptureStep {
        let current = self.is_current(session, CapturePhase::Routing);
        match result {
            Ok(outcome) => {
                if current {
                    self.phase = CapturePhase::Idle;
                }
                CaptureStep::RouteMatch(outcome)
            }
            Err(error) => {
                if current {
                    self.phase = CapturePhase::Errored;
                }
                CaptureStep::Fail(error)
            }
        }
    }

    /// Screen exit: abandon the session
    pub fn reset(&mut self) -> CapturePhase {
        let previous = self.phase;
        self.phase = CapturePhase::Idle;
        self.photo = None;
        self.predictions.clear();
        // Invalidate completions from the abandoned session
        self.session += 1;
        previous
    }

    fn is_current(&self, session: u64, phase: CapturePhase) -> bool {
        let current = session == self.session && self.phase == phase;
        if !current {
            debug!(
                session,
                current_session = self.session,
                phase = %self.phase,
                expected = %phase,
                "Ignoring stale capture completion"
            );
        }
        current
    }

    fn fail(&mut self, error: ErrorState) -> CaptureStep {
        self.phase = CapturePhase::Errored;
        CaptureStep::Fail(error)
    }

    /// Persisted artifact with capture-time data the gallery does not return
    fn merge_persisted(&self, mut persisted: PhotoArtifact) -> PhotoArtifact {
        persisted.on_device_predictions = self.predictions.clone();
        if let Some(captured) = &self.photo {
            if persisted.coordinates().is_none() {
                if let Some(coords) = captured.coordinates() {
                    persisted.set_coordinates(coords);
                }
            }
        }
        persisted
    }
}
