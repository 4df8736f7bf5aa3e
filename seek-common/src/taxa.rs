//! Taxonomic ranks, classifier candidates, and per-frame classification events

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Taxonomic classification level reported by the on-device classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Species,
    Genus,
    Family,
    Order,
    Class,
    Phylum,
    Kingdom,
}

impl Rank {
    /// Ranks eligible for display, most specific first
    ///
    /// Kingdom and phylum are received from the classifier but never surfaced.
    pub const DISPLAY_PRIORITY: [Rank; 5] = [
        Rank::Species,
        Rank::Genus,
        Rank::Family,
        Rank::Order,
        Rank::Class,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Species => "species",
            Rank::Genus => "genus",
            Rank::Family => "family",
            Rank::Order => "order",
            Rank::Class => "class",
            Rank::Phylum => "phylum",
            Rank::Kingdom => "kingdom",
        }
    }

    /// Whether this rank can become the displayed rank
    pub fn is_displayable(&self) -> bool {
        Self::DISPLAY_PRIORITY.contains(self)
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "species" => Ok(Rank::Species),
            "genus" => Ok(Rank::Genus),
            "family" => Ok(Rank::Family),
            "order" => Ok(Rank::Order),
            "class" => Ok(Rank::Class),
            "phylum" => Ok(Rank::Phylum),
            "kingdom" => Ok(Rank::Kingdom),
            other => Err(crate::Error::InvalidInput(format!("Unknown rank: {}", other))),
        }
    }
}

/// Single classifier-proposed taxon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub taxon_id: u64,
    /// Scientific name as embedded by the classifier's taxonomy file
    pub name: String,
    /// Classifier confidence (0.0 to 1.0)
    #[serde(alias = "score")]
    pub confidence: f64,
}

/// One classifier frame: candidates per rank, best first
///
/// Unknown rank keys in the native payload are ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "HashMap<String, Vec<Candidate>>",
    into = "BTreeMap<Rank, Vec<Candidate>>"
)]
pub struct ClassificationEvent {
    ranks: BTreeMap<Rank, Vec<Candidate>>,
}

impl From<HashMap<String, Vec<Candidate>>> for ClassificationEvent {
    fn from(raw: HashMap<String, Vec<Candidate>>) -> Self {
        let ranks = raw
            .into_iter()
            .filter_map(|(key, candidates)| key.parse::<Rank>().ok().map(|rank| (rank, candidates)))
            .collect();
        Self { ranks }
    }
}

impl From<ClassificationEvent> for BTreeMap<Rank, Vec<Candidate>> {
    fn from(event: ClassificationEvent) -> Self {
        event.ranks
    }
}

impl ClassificationEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and adapters
    pub fn with_rank(mut self, rank: Rank, candidates: Vec<Candidate>) -> Self {
        self.ranks.insert(rank, candidates);
        self
    }

    /// Candidates for a rank (empty slice if absent)
    pub fn candidates(&self, rank: Rank) -> &[Candidate] {
        self.ranks.get(&rank).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First displayable rank with a non-empty candidate list, and its top candidate
    pub fn best_displayable(&self) -> Option<(Rank, &Candidate)> {
        Rank::DISPLAY_PRIORITY
            .iter()
            .find_map(|rank| self.candidates(*rank).first().map(|c| (*rank, c)))
    }
}

/// Title-case every whitespace- or hyphen-separated word of a display name
///
/// "red-tailed hawk" becomes "Red-Tailed Hawk".
pub fn capitalize_names(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_word_start = true;
    for ch in name.chars() {
        if at_word_start && ch.is_alphabetic() {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.push(ch);
            if ch.is_whitespace() || ch == '-' {
                at_word_start = true;
            } else if ch.is_alphabetic() {
                at_word_start = false;
            }
        }
    }
    out
}
