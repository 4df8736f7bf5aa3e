//! Blocking error conditions surfaced by the identification pipeline

use serde::{Deserialize, Serialize};

/// Kind of blocking condition currently shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Camera permission missing or denied
    Permissions,
    /// Native camera reported a failure
    Camera,
    /// On-device classifier failed to load or run
    Classifier,
    /// Device cannot run the classifier (sticky until screen reset)
    Device,
    /// Photo storage permission denied
    Gallery,
    /// Photo could not be saved or read back
    Save,
    /// Shutter capture failed
    Take,
    /// Remote scoring failed
    OnlineVision,
    /// Remote scoring service is temporarily down
    Downtime,
}

impl ErrorKind {
    /// Localization key for the kind-specific message
    pub fn message_key(&self) -> &'static str {
        match self {
            ErrorKind::Permissions => "camera.error_permissions",
            ErrorKind::Camera => "camera.error_camera",
            ErrorKind::Classifier => "camera.error_classifier",
            ErrorKind::Device => "camera.device_support",
            ErrorKind::Gallery => "camera.error_gallery",
            ErrorKind::Save => "camera.error_save",
            ErrorKind::Take => "camera.error_take",
            ErrorKind::OnlineVision => "results.error_online_vision",
            ErrorKind::Downtime => "results.error_downtime",
        }
    }

    /// Whether the error renders as a permission prompt rather than inline text
    pub fn is_permission_prompt(&self) -> bool {
        matches!(
            self,
            ErrorKind::Permissions | ErrorKind::Gallery | ErrorKind::Save
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Permissions => "permissions",
            ErrorKind::Camera => "camera",
            ErrorKind::Classifier => "classifier",
            ErrorKind::Device => "device",
            ErrorKind::Gallery => "gallery",
            ErrorKind::Save => "save",
            ErrorKind::Take => "take",
            ErrorKind::OnlineVision => "onlineVision",
            ErrorKind::Downtime => "downtime",
        };
        f.write_str(name)
    }
}

/// Active error with its raw diagnostic payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorState {
    pub kind: ErrorKind,
    pub detail: Option<String>,
    /// Estimated hours until the scoring service is back (Downtime only)
    pub retry_hours: Option<u32>,
}

impl ErrorState {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            detail: None,
            retry_hours: None,
        }
    }

    pub fn with_detail(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
            retry_hours: None,
        }
    }

    pub fn downtime(retry_hours: Option<u32>) -> Self {
        Self {
            kind: ErrorKind::Downtime,
            detail: None,
            retry_hours,
        }
    }
}
