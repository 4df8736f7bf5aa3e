//! Fake collaborators and a pipeline harness shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use seek_common::config::{Platform, SeekConfig};
use seek_common::events::{
    EventBus, MatchOutcome, OfflineResult, PipelineEvent, RemoteTaxon,
};
use seek_common::taxa::{Candidate, ClassificationEvent, Rank};
use seek_common::{Coordinates, PhotoArtifact};
use seek_vision::capture::select_backend;
use seek_vision::collaborators::{
    CaptureOptions, CommonNameLookup, Gallery, LocationProvider, NativeCamera, Navigator,
    PermissionService, SeenHistory, StaticToken,
};
use seek_vision::scoring::{
    CommonAncestor, RequestContext, ScoreError, ScoreResponse, ScoredResult, VisionScorer,
};
use seek_vision::{OnlineMatcher, Pipeline, PipelineDeps, PipelineHandle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

pub const CAPTURE_URI: &str = "file:///tmp/seek/capture.jpg";
pub const SAVED_URI: &str = "ph://saved/1";

// ========================================
// Native camera
// ========================================

#[derive(Default)]
pub struct FakeCamera {
    pub arm_calls: AtomicUsize,
    pub resume_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub take_calls: AtomicUsize,
    pub options: Mutex<Vec<CaptureOptions>>,
    pub take_failure: Mutex<Option<String>>,
    pub capture_delay: Mutex<Option<Duration>>,
}

#[async_trait]
impl NativeCamera for FakeCamera {
    async fn arm(&self) -> anyhow::Result<()> {
        self.arm_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn resume_preview(&self) -> anyhow::Result<()> {
        self.resume_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_camera(&self) -> anyhow::Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn take_picture(&self, options: CaptureOptions) -> Result<PhotoArtifact, String> {
        self.take_calls.fetch_add(1, Ordering::SeqCst);
        self.options.lock().unwrap().push(options);
        let delay = *self.capture_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.take_failure.lock().unwrap().clone() {
            return Err(message);
        }
        Ok(PhotoArtifact::new(CAPTURE_URI, Utc::now()))
    }
}

// ========================================
// Gallery
// ========================================

pub struct FakeGallery {
    pub permission: bool,
    pub save_failure: Mutex<Option<String>>,
    pub empty: bool,
    pub saved: Mutex<Vec<String>>,
}

impl Default for FakeGallery {
    fn default() -> Self {
        Self {
            permission: true,
            save_failure: Mutex::new(None),
            empty: false,
            saved: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Gallery for FakeGallery {
    async fn request_permission(&self) -> anyhow::Result<bool> {
        Ok(self.permission)
    }

    async fn save(&self, uri: &str) -> Result<String, String> {
        if let Some(message) = self.save_failure.lock().unwrap().clone() {
            return Err(message);
        }
        self.saved.lock().unwrap().push(uri.to_string());
        Ok(SAVED_URI.to_string())
    }

    async fn read_last(&self) -> anyhow::Result<Option<PhotoArtifact>> {
        if self.empty {
            return Ok(None);
        }
        Ok(Some(PhotoArtifact::new(SAVED_URI, Utc::now())))
    }
}

// ========================================
// Permissions, location, names, history
// ========================================

pub struct FakePermissions(pub bool);

#[async_trait]
impl PermissionService for FakePermissions {
    async fn request_camera(&self) -> anyhow::Result<bool> {
        Ok(self.0)
    }
}

pub struct FakeLocation {
    pub result: Result<Coordinates, String>,
    pub calls: AtomicUsize,
}

impl FakeLocation {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            result: Ok(Coordinates {
                latitude,
                longitude,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(code: &str) -> Self {
        Self {
            result: Err(code.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LocationProvider for FakeLocation {
    async fn current_location(&self) -> Result<Coordinates, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

#[derive(Default)]
pub struct FakeNames {
    pub names: HashMap<u64, String>,
    pub calls: AtomicUsize,
}

impl FakeNames {
    pub fn with(taxon_id: u64, name: &str) -> Self {
        let mut names = HashMap::new();
        names.insert(taxon_id, name.to_string());
        Self {
            names,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CommonNameLookup for FakeNames {
    async fn common_name(&self, taxon_id: u64) -> anyhow::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.names.get(&taxon_id).cloned())
    }
}

#[derive(Default)]
pub struct FakeSeen {
    pub seen: HashMap<u64, NaiveDate>,
    pub fail_lookup: bool,
    pub lookups: AtomicUsize,
    pub added: Mutex<Vec<(u64, Option<String>, String)>>,
}

impl FakeSeen {
    pub fn seen_on(taxon_id: u64, date: NaiveDate) -> Self {
        let mut seen = HashMap::new();
        seen.insert(taxon_id, date);
        Self {
            seen,
            ..Default::default()
        }
    }

    pub fn add_calls(&self) -> usize {
        self.added.lock().unwrap().len()
    }
}

#[async_trait]
impl SeenHistory for FakeSeen {
    async fn first_seen(&self, taxon_id: u64) -> anyhow::Result<Option<NaiveDate>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup {
            anyhow::bail!("database is locked");
        }
        Ok(self.seen.get(&taxon_id).copied())
    }

    async fn add_to_collection(
        &self,
        taxon: &RemoteTaxon,
        common_name: Option<&str>,
        photo: &PhotoArtifact,
    ) -> anyhow::Result<()> {
        self.added.lock().unwrap().push((
            taxon.id,
            common_name.map(str::to_owned),
            photo.uri.clone(),
        ));
        Ok(())
    }
}

// ========================================
// Scorer
// ========================================

#[derive(Debug, Clone)]
pub enum Scripted {
    Respond(ScoreResponse),
    Status(u16, Option<String>),
}

pub struct FakeScorer {
    pub script: Scripted,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<(PhotoArtifact, RequestContext)>>,
}

impl FakeScorer {
    pub fn new(script: Scripted) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionScorer for FakeScorer {
    async fn score(
        &self,
        photo: &PhotoArtifact,
        ctx: &RequestContext,
    ) -> Result<ScoreResponse, ScoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((photo.clone(), ctx.clone()));
        match &self.script {
            Scripted::Respond(response) => Ok(response.clone()),
            Scripted::Status(status, retry_after) => Err(ScoreError::Http {
                status: *status,
                retry_after: retry_after.clone(),
                body: String::new(),
            }),
        }
    }
}

pub fn remote_taxon(id: u64, name: &str, rank: &str, rank_level: f64) -> RemoteTaxon {
    RemoteTaxon {
        id,
        name: name.to_string(),
        rank: rank.to_string(),
        rank_level,
        default_photo: None,
    }
}

/// Top result `Danaus plexippus` at `score`
pub fn species_response(score: f64) -> ScoreResponse {
    ScoreResponse {
        results: vec![ScoredResult {
            combined_score: score,
            taxon: remote_taxon(48662, "Danaus plexippus", "species", 10.0),
        }],
        common_ancestor: None,
    }
}

pub fn ancestor_response() -> ScoreResponse {
    ScoreResponse {
        results: vec![ScoredResult {
            combined_score: 40.0,
            taxon: remote_taxon(48662, "Danaus plexippus", "species", 10.0),
        }],
        common_ancestor: Some(CommonAncestor {
            taxon: remote_taxon(48661, "danaus", "genus", 20.0),
            score: Some(80.0),
        }),
    }
}

// ========================================
// Navigator
// ========================================

#[derive(Default)]
pub struct RecordingNavigator {
    pub offline: Mutex<Vec<OfflineResult>>,
    pub matches: Mutex<Vec<MatchOutcome>>,
}

impl Navigator for RecordingNavigator {
    fn show_offline_result(&self, result: &OfflineResult) {
        self.offline.lock().unwrap().push(result.clone());
    }

    fn show_match(&self, outcome: &MatchOutcome) {
        self.matches.lock().unwrap().push(outcome.clone());
    }
}

// ========================================
// Classifier frames
// ========================================

pub fn candidate(taxon_id: u64, name: &str) -> Candidate {
    Candidate {
        taxon_id,
        name: name.to_string(),
        confidence: 0.9,
    }
}

pub fn species_frame() -> ClassificationEvent {
    ClassificationEvent::new()
        .with_rank(Rank::Species, vec![candidate(48662, "Danaus plexippus")])
        .with_rank(Rank::Genus, vec![candidate(48661, "Danaus")])
}

pub fn genus_frame() -> ClassificationEvent {
    ClassificationEvent::new().with_rank(Rank::Genus, vec![candidate(48661, "Danaus")])
}

pub fn kingdom_frame() -> ClassificationEvent {
    ClassificationEvent::new()
        .with_rank(Rank::Kingdom, vec![candidate(1, "Animalia")])
        .with_rank(Rank::Phylum, vec![candidate(47120, "Arthropoda")])
}

// ========================================
// Pipeline harness
// ========================================

pub struct Harness {
    pub handle: PipelineHandle,
    pub events: broadcast::Receiver<PipelineEvent>,
    pub camera: Arc<FakeCamera>,
    pub gallery: Arc<FakeGallery>,
    pub names: Arc<FakeNames>,
    pub seen: Arc<FakeSeen>,
    pub location: Arc<FakeLocation>,
    pub scorer: Arc<FakeScorer>,
    pub navigator: Arc<RecordingNavigator>,
}

pub struct HarnessBuilder {
    pub platform: Platform,
    pub camera_permission: bool,
    pub camera: FakeCamera,
    pub gallery: FakeGallery,
    pub names: FakeNames,
    pub seen: FakeSeen,
    pub script: Scripted,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            platform: Platform::Ios,
            camera_permission: true,
            camera: FakeCamera::default(),
            gallery: FakeGallery::default(),
            names: FakeNames::default(),
            seen: FakeSeen::default(),
            script: Scripted::Respond(species_response(92.0)),
        }
    }
}

impl HarnessBuilder {
    /// Start the dispatch loop on the current runtime
    pub fn start(self) -> Harness {
        let config = SeekConfig {
            platform: self.platform,
            ..SeekConfig::default()
        };

        let camera = Arc::new(self.camera);
        let gallery = Arc::new(self.gallery);
        let names = Arc::new(self.names);
        let seen = Arc::new(self.seen);
        let location = Arc::new(FakeLocation::at(37.7749, -122.4194));
        let scorer = Arc::new(FakeScorer::new(self.script));
        let navigator = Arc::new(RecordingNavigator::default());

        let online = OnlineMatcher::new(
            scorer.clone(),
            Arc::new(StaticToken::new("test-token")),
            names.clone(),
            seen.clone(),
            location.clone(),
            config.endpoint.clone(),
            config.user_agent.clone(),
        );

        let deps = PipelineDeps {
            backend: select_backend(config.platform, camera.clone(), gallery.clone()),
            permissions: Arc::new(FakePermissions(self.camera_permission)),
            names: names.clone(),
            online: Arc::new(online),
            navigator: navigator.clone(),
        };

        let bus = EventBus::new(256);
        let events = bus.subscribe();
        let (pipeline, handle) = Pipeline::new(&config, deps, bus);
        tokio::spawn(pipeline.run());

        Harness {
            handle,
            events,
            camera,
            gallery,
            names,
            seen,
            location,
            scorer,
            navigator,
        }
    }
}

impl Harness {
    /// Let the loop and its spawned tasks run until idle
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    /// Focus the screen and discard the focus-time events
    pub async fn focused(self) -> Self {
        let mut harness = self;
        harness.handle.focus();
        harness.settle().await;
        harness.drain();
        harness
    }

    /// All events published since the last drain
    pub fn drain(&mut self) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Prediction snapshots among `events`
pub fn predictions(events: &[PipelineEvent]) -> Vec<seek_common::events::PredictionState> {
    events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::PredictionChanged { state, .. } => Some(state.clone()),
            _ => None,
        })
        .collect()
}

/// Error values among `events`
pub fn errors(events: &[PipelineEvent]) -> Vec<Option<seek_common::events::ErrorState>> {
    events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::ErrorChanged { error, .. } => Some(error.clone()),
            _ => None,
        })
        .collect()
}
