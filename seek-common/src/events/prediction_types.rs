//! Stabilized prediction shown while scanning

use crate::taxa::{Candidate, Rank};
use serde::{Deserialize, Serialize};

/// Currently displayed rank together with its top candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub rank: Rank,
    pub taxon: Candidate,
}

/// Current best rank + taxon projection
///
/// The rank and taxon are stored together, so a rank without a taxon (or
/// the reverse) cannot be represented.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionState {
    selection: Option<Selection>,
    common_name: Option<String>,
}

impl PredictionState {
    /// Empty default (nothing recognized)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn selected(rank: Rank, taxon: Candidate) -> Self {
        Self {
            selection: Some(Selection { rank, taxon }),
            common_name: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selection.is_none() && self.common_name.is_none()
    }

    pub fn active_rank(&self) -> Option<Rank> {
        self.selection.as_ref().map(|s| s.rank)
    }

    pub fn taxon(&self) -> Option<&Candidate> {
        self.selection.as_ref().map(|s| &s.taxon)
    }

    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    pub fn set_common_name(&mut self, name: Option<String>) {
        if self.selection.is_some() {
            self.common_name = name;
        }
    }

    /// Predictions to attach to a photo captured right now
    pub fn snapshot_predictions(&self) -> Vec<Candidate> {
        self.taxon().cloned().into_iter().collect()
    }

    /// Localization key for the scanning hint under the viewfinder
    pub fn scan_hint_key(&self) -> &'static str {
        match self.active_rank() {
            Some(Rank::Class) | Some(Rank::Order) | Some(Rank::Family) => "camera.scan_class",
            Some(Rank::Genus) => "camera.scan_genus",
            Some(Rank::Species) => "camera.scan_species",
            _ => "camera.scan",
        }
    }

    /// Whether the shutter shows the "species recognized" indicator
    pub fn species_shutter(&self) -> bool {
        self.active_rank() == Some(Rank::Species)
    }
}
