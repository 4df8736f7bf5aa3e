//! Scoring service response and its interpretation

use seek_common::events::{RemoteTaxon, VisionResult};
use serde::{Deserialize, Serialize};

/// Top result must score strictly above this to count as a species match
pub const SPECIES_SCORE_THRESHOLD: f64 = 85.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub combined_score: f64,
    pub taxon: RemoteTaxon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonAncestor {
    pub taxon: RemoteTaxon,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Ranked scoring response, best result first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreResponse {
    #[serde(default)]
    pub results: Vec<ScoredResult>,
    #[serde(default)]
    pub common_ancestor: Option<CommonAncestor>,
}

/// Decide species match / ancestor match / no match
///
/// The common name is left unresolved; the online flow fills it in.
pub fn interpret(response: &ScoreResponse) -> VisionResult {
    if let Some(top) = response.results.first() {
        if top.combined_score > SPECIES_SCORE_THRESHOLD && top.taxon.rank == "species" {
            return VisionResult::SpeciesMatch {
                taxon: top.taxon.clone(),
                common_name: None,
            };
        }
    }

    match &response.common_ancestor {
        Some(ancestor) => VisionResult::AncestorMatch {
            taxon: ancestor.taxon.clone(),
            rank: ancestor.taxon.rank_level,
        },
        None => VisionResult::NoMatch,
    }
}
