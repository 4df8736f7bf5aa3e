//! Captured photo artifacts

use crate::taxa::Candidate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Truncate both components to two decimal places (roughly 1 km)
    pub fn truncated(&self) -> Self {
        Self {
            latitude: (self.latitude * 100.0).trunc() / 100.0,
            longitude: (self.longitude * 100.0).trunc() / 100.0,
        }
    }
}

/// Photo produced by the capture step
///
/// Latitude/longitude may be absent at capture time and back-filled later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoArtifact {
    pub uri: String,
    pub captured_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// On-device predictions snapshotted at the instant of capture
    #[serde(default)]
    pub on_device_predictions: Vec<Candidate>,
}

impl PhotoArtifact {
    pub fn new(uri: impl Into<String>, captured_at: DateTime<Utc>) -> Self {
        Self {
            uri: uri.into(),
            captured_at,
            latitude: None,
            longitude: None,
            on_device_predictions: Vec::new(),
        }
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
            _ => None,
        }
    }

    pub fn set_coordinates(&mut self, coords: Coordinates) {
        self.latitude = Some(coords.latitude);
        self.longitude = Some(coords.longitude);
    }

    /// Local filesystem path for `file://` or bare-path URIs
    pub fn local_path(&self) -> &str {
        self.uri.strip_prefix("file://").unwrap_or(&self.uri)
    }
}
