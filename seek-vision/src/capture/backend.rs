//! Platform capture backends
//!
//! One [`CaptureBackend`] interface with two implementations, chosen once at
//! startup from [`Platform`]:
//!
//! | Backend          | Capture options          | Before save               | Stop            |
//! |------------------|--------------------------|---------------------------|-----------------|
//! | `ManagerBackend` | defaults                 | none                      | `stop_camera()` |
//! | `ViewBackend`    | `pause_after_capture`    | gallery permission check  | `stop_camera()` |

use crate::collaborators::{CaptureOptions, Gallery, NativeCamera};
use async_trait::async_trait;
use seek_common::config::Platform;
use seek_common::PhotoArtifact;
use std::sync::Arc;
use tracing::debug;

/// Message used when the gallery permission prompt is denied
pub const GALLERY_PERMISSION_DENIED: &str = "permission denied: gallery access not granted";

/// Save failure carrying the raw platform message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFailure {
    pub message: String,
}

impl SaveFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait CaptureBackend: Send + Sync {
    fn platform(&self) -> Platform;

    /// Resume the preview and arm the classifier (screen focus)
    async fn resume(&self) -> anyhow::Result<()>;

    async fn take_picture(&self) -> Result<PhotoArtifact, String>;

    /// Save to the gallery and read the persisted photo back
    ///
    /// `Ok(None)` means the save reported success but the gallery is empty.
    async fn save(&self, photo: &PhotoArtifact) -> Result<Option<PhotoArtifact>, SaveFailure>;

    /// Halt the native classifier (screen blur)
    async fn stop(&self) -> anyhow::Result<()>;
}

/// Select the backend for `platform`
pub fn select_backend(
    platform: Platform,
    camera: Arc<dyn NativeCamera>,
    gallery: Arc<dyn Gallery>,
) -> Arc<dyn CaptureBackend> {
    debug!(?platform, "Selecting capture backend");
    match platform {
        Platform::Ios => Arc::new(ManagerBackend { camera, gallery }),
        Platform::Android => Arc::new(ViewBackend { camera, gallery }),
    }
}

async fn save_and_read_back(
    gallery: &dyn Gallery,
    photo: &PhotoArtifact,
) -> Result<Option<PhotoArtifact>, SaveFailure> {
    let persisted_uri = gallery.save(&photo.uri).await.map_err(SaveFailure::new)?;
    debug!(uri = %persisted_uri, "Photo saved to gallery");
    gallery
        .read_last()
        .await
        .map_err(|e| SaveFailure::new(format!("gallery read failed: {}", e)))
}

/// Capture through the native module manager
pub struct ManagerBackend {
    camera: Arc<dyn NativeCamera>,
    gallery: Arc<dyn Gallery>,
}

#[async_trait]
impl CaptureBackend for ManagerBackend {
    fn platform(&self) -> Platform {
        Platform::Ios
    }

    async fn resume(&self) -> anyhow::Result<()> {
        self.camera.resume_preview().await?;
        self.camera.arm().await
    }

    async fn take_picture(&self) -> Result<PhotoArtifact, String> {
        self.camera.take_picture(CaptureOptions::default()).await
    }

    async fn save(&self, photo: &PhotoArtifact) -> Result<Option<PhotoArtifact>, SaveFailure> {
        save_and_read_back(self.gallery.as_ref(), photo).await
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.camera.stop_camera().await
    }
}

/// Capture through the mounted camera view
pub struct ViewBackend {
    camera: Arc<dyn NativeCamera>,
    gallery: Arc<dyn Gallery>,
}

#[async_trait]
impl CaptureBackend for ViewBackend {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    async fn resume(&self) -> anyhow::Result<()> {
        self.camera.resume_preview().await?;
        self.camera.arm().await
    }

    async fn take_picture(&self) -> Result<PhotoArtifact, String> {
        self.camera
            .take_picture(CaptureOptions {
                pause_after_capture: true,
            })
            .await
    }

    async fn save(&self, photo: &PhotoArtifact) -> Result<Option<PhotoArtifact>, SaveFailure> {
        let granted = self
            .gallery
            .request_permission()
            .await
            .map_err(|e| SaveFailure::new(format!("{}: {}", GALLERY_PERMISSION_DENIED, e)))?;
        if !granted {
            return Err(SaveFailure::new(GALLERY_PERMISSION_DENIED));
        }
        save_and_read_back(self.gallery.as_ref(), photo).await
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.camera.stop_camera().await
    }
}
