//! Classification stream debouncer
//!
//! Folds per-frame classifier output into the stabilized [`PredictionState`]
//! shown while scanning. The fold is synchronous and side-effect free: timer
//! and common-name work is returned to the caller as commands.
//!
//! Rules:
//! - Frames are dropped while a picture is being taken.
//! - The first rank in `species > genus > family > order > class` with a
//!   candidate wins; its top candidate becomes the taxon.
//! - A species selection (re)arms the hold. Only one hold is ever pending:
//!   each arm bumps the generation, invalidating older expiries.
//! - A frame with no displayable rank resets immediately, unless a species
//!   hold is pending, in which case the hold's expiry performs the reset.
//! - Resetting an already-empty state reports no change.

use seek_common::events::PredictionState;
use seek_common::taxa::{ClassificationEvent, Rank};
use tracing::debug;

/// What the caller must do with the hold timer after a fold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldCommand {
    /// Leave any pending timer alone
    Keep,
    /// Cancel any pending timer and start a new one tagged `generation`
    Arm { generation: u64 },
    /// Cancel the pending timer
    Cancel,
}

/// Asynchronous common-name lookup to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameLookup {
    pub request: u64,
    pub taxon_id: u64,
}

/// Result of folding one classifier frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldOutcome {
    /// Whether the visible prediction changed
    pub changed: bool,
    pub hold: HoldCommand,
    pub lookup: Option<NameLookup>,
}

impl FoldOutcome {
    fn unchanged() -> Self {
        Self {
            changed: false,
            hold: HoldCommand::Keep,
            lookup: None,
        }
    }
}

/// Owner of the prediction state
#[derive(Debug)]
pub struct Debouncer {
    state: PredictionState,
    scientific_names: bool,
    hold_generation: u64,
    hold_pending: bool,
    next_request: u64,
    /// Outstanding lookup: (request, taxon_id)
    pending_lookup: Option<(u64, u64)>,
}

impl Debouncer {
    /// `scientific_names` displays the candidate's embedded name instead of
    /// looking up a common name
    pub fn new(scientific_names: bool) -> Self {
        Self {
            state: PredictionState::empty(),
            scientific_names,
            hold_generation: 0,
            hold_pending: false,
            next_request: 0,
            pending_lookup: None,
        }
    }

    pub fn state(&self) -> &PredictionState {
        &self.state
    }

    pub fn hold_pending(&self) -> bool {
        self.hold_pending
    }

    /// Fold one classifier frame into the prediction state
    pub fn on_event(&mut self, event: &ClassificationEvent, picture_taken: bool) -> FoldOutcome {
        if picture_taken {
            debug!("Picture in progress, dropping classifier frame");
            return FoldOutcome::unchanged();
        }

        let Some((rank, candidate)) = event.best_displayable() else {
            if self.hold_pending {
                return FoldOutcome::unchanged();
            }
            return FoldOutcome {
                changed: self.reset(),
                ..FoldOutcome::unchanged()
            };
        };

        let same_taxon = self.state.taxon().map(|t| t.taxon_id) == Some(candidate.taxon_id);
        let mut next = PredictionState::selected(rank, candidate.clone());
        let mut lookup = None;

        if self.scientific_names {
            next.set_common_name(Some(candidate.name.clone()));
        } else {
            let lookup_in_flight = self
                .pending_lookup
                .map_or(false, |(_, taxon_id)| taxon_id == candidate.taxon_id);
            if same_taxon && (self.state.common_name().is_some() || lookup_in_flight) {
                next.set_common_name(self.state.common_name().map(str::to_owned));
            } else {
                self.next_request += 1;
                self.pending_lookup = Some((self.next_request, candidate.taxon_id));
                lookup = Some(NameLookup {
                    request: self.next_request,
                    taxon_id: candidate.taxon_id,
                });
            }
        }

        let hold = if rank == Rank::Species {
            self.hold_generation += 1;
            self.hold_pending = true;
            HoldCommand::Arm {
                generation: self.hold_generation,
            }
        } else if self.hold_pending {
            self.invalidate_hold();
            HoldCommand::Cancel
        } else {
            HoldCommand::Keep
        };

        let changed = next != self.state;
        if changed {
            debug!(rank = %rank, taxon_id = candidate.taxon_id, "Prediction updated");
        }
        self.state = next;

        FoldOutcome {
            changed,
            hold,
            lookup,
        }
    }

    /// Apply a hold expiry; stale generations are ignored
    pub fn on_hold_expired(&mut self, generation: u64, picture_taken: bool) -> bool {
        if !self.hold_pending || generation != self.hold_generation {
            debug!(generation, current = self.hold_generation, "Ignoring stale hold expiry");
            return false;
        }
        self.hold_pending = false;
        if picture_taken {
            return false;
        }
        self.reset()
    }

    /// Apply a resolved common name if it still refers to the displayed taxon
    pub fn on_common_name(&mut self, request: u64, name: Option<String>, picture_taken: bool) -> bool {
        let Some((pending_request, taxon_id)) = self.pending_lookup else {
            return false;
        };
        if pending_request != request {
            return false;
        }
        // Settled either way; a dropped name is requested again on the next frame
        self.pending_lookup = None;
        if picture_taken {
            debug!(request, "Picture in progress, dropping common name");
            return false;
        }

        if self.state.taxon().map(|t| t.taxon_id) != Some(taxon_id) {
            return false;
        }
        let before = self.state.common_name().map(str::to_owned);
        self.state.set_common_name(name);
        before.as_deref() != self.state.common_name()
    }

    /// Return to the empty default; no-op (false) when already empty
    pub fn reset(&mut self) -> bool {
        self.pending_lookup = None;
        if self.state.is_empty() {
            return false;
        }
        debug!("Prediction reset");
        self.state = PredictionState::empty();
        true
    }

    /// Screen-exit reset: invalidate the hold and clear the state
    pub fn clear(&mut self) -> bool {
        self.invalidate_hold();
        self.reset()
    }

    fn invalidate_hold(&mut self) {
        self.hold_pending = false;
        self.hold_generation += 1;
    }
}
