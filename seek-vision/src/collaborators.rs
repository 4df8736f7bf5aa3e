//! Interfaces to the collaborators the pipeline consumes
//!
//! None of these are implemented by the pipeline itself except where noted:
//! the native camera, gallery, permission, location, and auth services are
//! platform capabilities; [`crate::store::SqliteStore`] backs the common-name
//! and seen-history lookups.

use async_trait::async_trait;
use chrono::NaiveDate;
use seek_common::events::{MatchOutcome, OfflineResult, RemoteTaxon};
use seek_common::{Coordinates, PhotoArtifact};

/// Options passed to the native capture call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Freeze the preview on the captured frame
    pub pause_after_capture: bool,
}

/// Native classifier camera while it is mounted
///
/// Events (`onTaxaDetected`, `onCameraError`, ...) arrive separately as
/// [`crate::pipeline::NativeEvent`]s.
#[async_trait]
pub trait NativeCamera: Send + Sync {
    async fn arm(&self) -> anyhow::Result<()>;
    async fn resume_preview(&self) -> anyhow::Result<()>;
    async fn stop_camera(&self) -> anyhow::Result<()>;
    /// Capture a photo; the error is the native failure message
    async fn take_picture(&self, options: CaptureOptions) -> Result<PhotoArtifact, String>;
}

/// Device photo gallery
#[async_trait]
pub trait Gallery: Send + Sync {
    /// Request read/write access to the gallery
    async fn request_permission(&self) -> anyhow::Result<bool>;
    /// Persist the photo at `uri`, returning the persisted uri or the failure message
    async fn save(&self, uri: &str) -> Result<String, String>;
    /// Most recently saved photo, if any
    async fn read_last(&self) -> anyhow::Result<Option<PhotoArtifact>>;
}

#[async_trait]
pub trait PermissionService: Send + Sync {
    /// Request camera access; `Ok(false)` means the user denied it
    async fn request_camera(&self) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Current device location; the error is a platform error code
    async fn current_location(&self) -> Result<Coordinates, String>;
}

#[async_trait]
pub trait CommonNameLookup: Send + Sync {
    async fn common_name(&self, taxon_id: u64) -> anyhow::Result<Option<String>>;
}

/// "Species already seen" history and the user's collection
#[async_trait]
pub trait SeenHistory: Send + Sync {
    /// Date the taxon was first recorded, `None` if never
    async fn first_seen(&self, taxon_id: u64) -> anyhow::Result<Option<NaiveDate>>;
    async fn add_to_collection(
        &self,
        taxon: &RemoteTaxon,
        common_name: Option<&str>,
        photo: &PhotoArtifact,
    ) -> anyhow::Result<()>;
}

#[async_trait]
pub trait AuthTokenProvider: Send + Sync {
    async fn bearer_token(&self) -> anyhow::Result<String>;
}

/// Result views the pipeline hands finished captures to
pub trait Navigator: Send + Sync {
    fn show_offline_result(&self, result: &OfflineResult);
    fn show_match(&self, outcome: &MatchOutcome);
}

/// Token supplied up front (environment or CLI)
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Read the token from an environment variable
    pub fn from_env(var: &str) -> anyhow::Result<Self> {
        let token = std::env::var(var)
            .map_err(|_| anyhow::anyhow!("{} is not set", var))?;
        if token.trim().is_empty() {
            anyhow::bail!("{} is empty", var);
        }
        Ok(Self(token))
    }
}

#[async_trait]
impl AuthTokenProvider for StaticToken {
    async fn bearer_token(&self) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}
