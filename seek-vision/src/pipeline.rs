//! Single-queue event dispatch loop
//!
//! [`Pipeline`] owns the debouncer, error slot, hold timer and capture
//! coordinator. Every input (native classifier events, screen lifecycle,
//! shutter presses, timer expiries, finished async work) arrives as a
//! [`PipelineMessage`] on one unbounded mpsc queue and is handled to
//! completion before the next message is read.
//!
//! Async work (permission prompts, capture, save, common-name lookup, online
//! scoring) runs in spawned tasks that post their completion back onto the
//! same queue, so state is only ever touched from the loop.

use crate::capture::{CaptureBackend, CaptureCoordinator, CaptureStep, SaveFailure};
use crate::collaborators::{CommonNameLookup, Navigator, PermissionService};
use crate::debouncer::{Debouncer, FoldOutcome, HoldCommand, NameLookup};
use crate::error_state::ErrorSlot;
use crate::hold_timer::HoldTimer;
use crate::online::OnlineMatcher;
use seek_common::config::SeekConfig;
use seek_common::events::{
    CapturePhase, ErrorKind, ErrorState, EventBus, MatchOutcome, PipelineEvent, RouteDecision,
};
use seek_common::taxa::ClassificationEvent;
use seek_common::PhotoArtifact;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Callback from the native classifier capability
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    TaxaDetected(ClassificationEvent),
    CameraError(String),
    CameraPermissionMissing,
    ClassifierError(Option<String>),
    DeviceNotSupported(Option<String>),
    Log(String),
}

impl NativeEvent {
    /// Error this event raises, if any
    fn error_state(&self) -> Option<ErrorState> {
        let (kind, detail) = match self {
            NativeEvent::CameraError(message) => (ErrorKind::Camera, Some(message.clone())),
            NativeEvent::CameraPermissionMissing => (ErrorKind::Permissions, None),
            NativeEvent::ClassifierError(message) => (ErrorKind::Classifier, message.clone()),
            NativeEvent::DeviceNotSupported(message) => (ErrorKind::Device, message.clone()),
            NativeEvent::TaxaDetected(_) | NativeEvent::Log(_) => return None,
        };
        Some(ErrorState {
            kind,
            detail,
            retry_hours: None,
        })
    }
}

/// Everything the dispatch loop reacts to
#[derive(Debug)]
pub enum PipelineMessage {
    Native(NativeEvent),
    ScreenFocused,
    ScreenBlurred,
    ShutterPressed,
    HoldExpired {
        generation: u64,
    },
    CommonNameResolved {
        request: u64,
        name: Option<String>,
    },
    FocusCompleted {
        focus: u64,
        result: Result<(), ErrorState>,
    },
    PictureTaken {
        session: u64,
        result: Result<PhotoArtifact, String>,
    },
    PhotoSaved {
        session: u64,
        result: Result<Option<PhotoArtifact>, SaveFailure>,
    },
    OnlineFinished {
        session: u64,
        result: Result<MatchOutcome, ErrorState>,
    },
    Shutdown,
}

/// Collaborators the pipeline drives
#[derive(Clone)]
pub struct PipelineDeps {
    pub backend: Arc<dyn CaptureBackend>,
    pub permissions: Arc<dyn PermissionService>,
    pub names: Arc<dyn CommonNameLookup>,
    pub online: Arc<OnlineMatcher>,
    pub navigator: Arc<dyn Navigator>,
}

/// Sending side of the pipeline queue
#[derive(Clone)]
pub struct PipelineHandle {
    tx: mpsc::UnboundedSender<PipelineMessage>,
}

impl PipelineHandle {
    /// Post a message; returns false once the loop has stopped
    pub fn send(&self, message: PipelineMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    pub fn native(&self, event: NativeEvent) -> bool {
        self.send(PipelineMessage::Native(event))
    }

    pub fn focus(&self) -> bool {
        self.send(PipelineMessage::ScreenFocused)
    }

    pub fn blur(&self) -> bool {
        self.send(PipelineMessage::ScreenBlurred)
    }

    pub fn shutter(&self) -> bool {
        self.send(PipelineMessage::ShutterPressed)
    }

    pub fn shutdown(&self) -> bool {
        self.send(PipelineMessage::Shutdown)
    }
}

pub struct Pipeline {
    rx: mpsc::UnboundedReceiver<PipelineMessage>,
    tx: mpsc::UnboundedSender<PipelineMessage>,
    deps: PipelineDeps,
    bus: EventBus,
    debouncer: Debouncer,
    hold: HoldTimer,
    errors: ErrorSlot,
    capture: CaptureCoordinator,
    focused: bool,
    focus: u64,
    classifier_ready: bool,
}

impl Pipeline {
    pub fn new(config: &SeekConfig, deps: PipelineDeps, bus: EventBus) -> (Self, PipelineHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = PipelineHandle { tx: tx.clone() };
        let pipeline = Self {
            rx,
            tx,
            deps,
            bus,
            debouncer: Debouncer::new(config.scientific_names),
            hold: HoldTimer::new(config.hold_duration()),
            errors: ErrorSlot::new(),
            capture: CaptureCoordinator::new(),
            focused: false,
            focus: 0,
            classifier_ready: false,
        };
        (pipeline, handle)
    }

    /// Process messages until `Shutdown`
    ///
    /// The loop keeps a sender for its own tasks, so dropping every
    /// [`PipelineHandle`] does not end it.
    pub async fn run(mut self) {
        info!(platform = ?self.deps.backend.platform(), "Identification pipeline started");
        while let Some(message) = self.rx.recv().await {
            if !self.handle(message) {
                break;
            }
        }
        self.hold.cancel();
        info!("Identification pipeline stopped");
    }

    /// Handle one message; false stops the loop
    fn handle(&mut self, message: PipelineMessage) -> bool {
        match message {
            PipelineMessage::Native(event) => self.on_native(event),
            PipelineMessage::ScreenFocused => self.on_focus(),
            PipelineMessage::ScreenBlurred => self.on_blur(),
            PipelineMessage::ShutterPressed => self.on_shutter(),
            PipelineMessage::HoldExpired { generation } => {
                let picture_taken = self.capture.picture_taken();
                if self.debouncer.on_hold_expired(generation, picture_taken) {
                    debug!(generation, "Species hold expired");
                    self.publish_prediction();
                }
            }
            PipelineMessage::CommonNameResolved { request, name } => {
                let picture_taken = self.capture.picture_taken();
                if self.debouncer.on_common_name(request, name, picture_taken) {
                    self.publish_prediction();
                }
            }
            PipelineMessage::FocusCompleted { focus, result } => {
                if focus != self.focus || !self.focused {
                    debug!(focus, current = self.focus, "Ignoring stale focus completion");
                } else if let Err(state) = result {
                    self.set_error(state);
                } else {
                    debug!("Camera resumed and classifier armed");
                }
            }
            PipelineMessage::PictureTaken { session, result } => {
                self.advance(|capture| capture.on_picture_taken(session, result));
            }
            PipelineMessage::PhotoSaved { session, result } => {
                self.advance(|capture| capture.on_photo_saved(session, result));
            }
            PipelineMessage::OnlineFinished { session, result } => {
                if session != self.capture.session() {
                    if let Err(state) = &result {
                        warn!(session, kind = %state.kind, "Abandoned session failed online, not reporting");
                        return true;
                    }
                }
                self.advance(|capture| capture.on_online_finished(session, result));
            }
            PipelineMessage::Shutdown => return false,
        }
        true
    }

    fn on_native(&mut self, event: NativeEvent) {
        if let NativeEvent::Log(message) = &event {
            debug!(target: "seek_vision::native", "{}", message);
            return;
        }
        if !self.focused {
            debug!("Screen not focused, dropping native event");
            return;
        }

        if let Some(state) = event.error_state() {
            self.set_error(state);
            return;
        }

        if let NativeEvent::TaxaDetected(frame) = event {
            if !self.classifier_ready {
                self.classifier_ready = true;
                self.bus.emit_lossy(PipelineEvent::ClassifierReady {
                    timestamp: seek_common::time::now(),
                });
            }
            let outcome = self.debouncer.on_event(&frame, self.capture.picture_taken());
            self.apply_fold(outcome);
        }
    }

    fn apply_fold(&mut self, outcome: FoldOutcome) {
        match outcome.hold {
            HoldCommand::Keep => {}
            HoldCommand::Arm { generation } => {
                let tx = self.tx.clone();
                self.hold.arm(generation, move |generation| {
                    tx.send(PipelineMessage::HoldExpired { generation }).ok();
                });
            }
            HoldCommand::Cancel => self.hold.cancel(),
        }

        if let Some(lookup) = outcome.lookup {
            self.spawn_name_lookup(lookup);
        }

        if outcome.changed {
            self.publish_prediction();
        }
    }

    fn spawn_name_lookup(&self, lookup: NameLookup) {
        let names = self.deps.names.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let name = match names.common_name(lookup.taxon_id).await {
                Ok(name) => name,
                Err(e) => {
                    warn!(taxon_id = lookup.taxon_id, error = %e, "Common name lookup failed");
                    None
                }
            };
            tx.send(PipelineMessage::CommonNameResolved {
                request: lookup.request,
                name,
            })
            .ok();
        });
    }

    fn on_focus(&mut self) {
        self.focused = true;
        self.focus += 1;
        self.classifier_ready = false;
        info!(focus = self.focus, "Capture screen focused");

        let focus = self.focus;
        let permissions = self.deps.permissions.clone();
        let backend = self.deps.backend.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match permissions.request_camera().await {
                Ok(true) => backend
                    .resume()
                    .await
                    .map_err(|e| ErrorState::with_detail(ErrorKind::Camera, e.to_string())),
                Ok(false) => Err(ErrorState::new(ErrorKind::Permissions)),
                Err(e) => Err(ErrorState::with_detail(ErrorKind::Permissions, e.to_string())),
            };
            tx.send(PipelineMessage::FocusCompleted { focus, result }).ok();
        });
    }

    /// Screen exit: cancel the hold, clear predictions and errors, abandon
    /// any capture session, and halt the classifier
    fn on_blur(&mut self) {
        self.focused = false;
        self.focus += 1;
        self.classifier_ready = false;
        info!("Capture screen blurred, resetting pipeline");

        self.hold.cancel();
        if self.debouncer.clear() {
            self.publish_prediction();
        }
        if self.errors.clear() {
            self.bus.emit_lossy(PipelineEvent::ErrorChanged {
                error: None,
                timestamp: seek_common::time::now(),
            });
        }
        let previous = self.capture.reset();
        self.publish_phase(previous);

        let backend = self.deps.backend.clone();
        tokio::spawn(async move {
            if let Err(e) = backend.stop().await {
                warn!(error = %e, "Failed to stop native classifier");
            }
        });
    }

    fn on_shutter(&mut self) {
        if !self.focused {
            warn!("Screen not focused, ignoring shutter");
            return;
        }
        let blocking = self.errors.current().map(|e| e.kind);
        let old = self.capture.phase();
        match self.capture.request_capture(self.debouncer.state(), blocking) {
            Ok(step) => {
                self.publish_phase(old);
                self.run_step(step);
            }
            Err(e) => warn!(error = %e, "Capture request rejected"),
        }
    }

    /// Feed a completion to the coordinator and run whatever comes next
    fn advance<F>(&mut self, f: F)
    where
        F: FnOnce(&mut CaptureCoordinator) -> CaptureStep,
    {
        let old = self.capture.phase();
        let step = f(&mut self.capture);
        self.publish_phase(old);
        self.run_step(step);
    }

    fn run_step(&mut self, step: CaptureStep) {
        match step {
            CaptureStep::TakePicture { session } => {
                let backend = self.deps.backend.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = backend.take_picture().await;
                    tx.send(PipelineMessage::PictureTaken { session, result }).ok();
                });
            }
            CaptureStep::SavePhoto { session, photo } => {
                let backend = self.deps.backend.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = backend.save(&photo).await;
                    tx.send(PipelineMessage::PhotoSaved { session, result }).ok();
                });
            }
            CaptureStep::ScoreOnline { session, photo } => {
                let online = self.deps.online.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = online.run(photo).await;
                    tx.send(PipelineMessage::OnlineFinished { session, result }).ok();
                });
            }
            CaptureStep::RouteOffline(result) => {
                self.deps.navigator.show_offline_result(&result);
                self.publish_route(RouteDecision::Offline(result));
            }
            CaptureStep::RouteMatch(outcome) => {
                self.deps.navigator.show_match(&outcome);
                self.publish_route(RouteDecision::Match(outcome));
            }
            CaptureStep::Fail(state) => {
                error!(kind = %state.kind, detail = ?state.detail, "Capture session failed");
                self.set_error(state);
            }
            CaptureStep::Ignore => {}
        }
    }

    fn set_error(&mut self, state: ErrorState) {
        if self.errors.set(state) {
            self.bus.emit_lossy(PipelineEvent::ErrorChanged {
                error: self.errors.current().cloned(),
                timestamp: seek_common::time::now(),
            });
        }
    }

    fn publish_prediction(&self) {
        self.bus.emit_lossy(PipelineEvent::PredictionChanged {
            state: self.debouncer.state().clone(),
            timestamp: seek_common::time::now(),
        });
    }

    fn publish_phase(&self, old_phase: CapturePhase) {
        let new_phase = self.capture.phase();
        if old_phase != new_phase {
            info!(from = %old_phase, to = %new_phase, "Capture phase changed");
            self.bus.emit_lossy(PipelineEvent::CaptureChanged {
                old_phase,
                new_phase,
                timestamp: seek_common::time::now(),
            });
        }
    }

    fn publish_route(&self, decision: RouteDecision) {
        self.bus.emit_lossy(PipelineEvent::Routed {
            decision: Box::new(decision),
            timestamp: seek_common::time::now(),
        });
    }
}
