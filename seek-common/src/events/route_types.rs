//! Capture session phases, vision results, and routing decisions

use crate::photo::PhotoArtifact;
use crate::taxa::Candidate;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Capture session lifecycle
///
/// `Idle -> Capturing -> Saving -> Routing -> Idle`, with `Errored` reachable
/// from any phase and terminal until the screen is re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapturePhase {
    Idle,
    Capturing,
    Saving,
    Routing,
    Errored,
}

impl std::fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapturePhase::Idle => write!(f, "idle"),
            CapturePhase::Capturing => write!(f, "capturing"),
            CapturePhase::Saving => write!(f, "saving"),
            CapturePhase::Routing => write!(f, "routing"),
            CapturePhase::Errored => write!(f, "errored"),
        }
    }
}

/// Default photo attached to a taxon by the scoring service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonPhoto {
    pub medium_url: Option<String>,
}

/// Taxon as described by the remote scoring service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTaxon {
    pub id: u64,
    pub name: String,
    pub rank: String,
    /// Numeric rank level (10 = species, 20 = genus, ...); may be fractional
    pub rank_level: f64,
    #[serde(default)]
    pub default_photo: Option<TaxonPhoto>,
}

/// Outcome of one remote scoring call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VisionResult {
    SpeciesMatch {
        taxon: RemoteTaxon,
        common_name: Option<String>,
    },
    AncestorMatch {
        taxon: RemoteTaxon,
        rank: f64,
    },
    NoMatch,
}

impl VisionResult {
    pub fn taxon(&self) -> Option<&RemoteTaxon> {
        match self {
            VisionResult::SpeciesMatch { taxon, .. } | VisionResult::AncestorMatch { taxon, .. } => {
                Some(taxon)
            }
            VisionResult::NoMatch => None,
        }
    }

    pub fn is_species_match(&self) -> bool {
        matches!(self, VisionResult::SpeciesMatch { .. })
    }
}

/// Payload for the match view after online scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub result: VisionResult,
    /// Title-cased common name, or scientific name when none is known
    pub display_name: Option<String>,
    pub scientific_name: Option<String>,
    pub taxon_photo_url: Option<String>,
    pub photo: PhotoArtifact,
    /// Date the species was first recorded, if previously seen
    pub seen_date: Option<NaiveDate>,
    /// Location lookup failure, recorded but not fatal
    pub location_error: Option<String>,
}

/// Payload for the offline result view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineResult {
    pub photo: PhotoArtifact,
    pub predictions: Vec<Candidate>,
}

/// Where a finished capture was routed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "route")]
pub enum RouteDecision {
    Offline(OfflineResult),
    Match(MatchOutcome),
}
