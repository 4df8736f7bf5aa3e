//! Online match flow: score a photo and reconcile the result
//!
//! 1. Build the request context (token from the auth collaborator).
//! 2. Score the photo. If it has no coordinates, fetch the device location
//!    concurrently; the request does not wait for it and a location failure
//!    is recorded on the outcome instead of failing the flow.
//! 3. Interpret the response and resolve the taxon's common name.
//! 4. For species matches, look up the first-seen date; a species never seen
//!    before is added to the collection before the outcome is returned.

use crate::collaborators::{AuthTokenProvider, CommonNameLookup, LocationProvider, SeenHistory};
use crate::scoring::{interpret, RequestContext, ScoreError, VisionScorer};
use seek_common::events::{ErrorState, MatchOutcome, RemoteTaxon, VisionResult};
use seek_common::taxa::capitalize_names;
use seek_common::{Coordinates, PhotoArtifact};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct OnlineMatcher {
    scorer: Arc<dyn VisionScorer>,
    auth: Arc<dyn AuthTokenProvider>,
    names: Arc<dyn CommonNameLookup>,
    seen: Arc<dyn SeenHistory>,
    location: Arc<dyn LocationProvider>,
    endpoint: String,
    user_agent: String,
}

impl OnlineMatcher {
    pub fn new(
        scorer: Arc<dyn VisionScorer>,
        auth: Arc<dyn AuthTokenProvider>,
        names: Arc<dyn CommonNameLookup>,
        seen: Arc<dyn SeenHistory>,
        location: Arc<dyn LocationProvider>,
        endpoint: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            scorer,
            auth,
            names,
            seen,
            location,
            endpoint: endpoint.into(),
            user_agent: user_agent.into(),
        }
    }

    async fn request_context(&self) -> Result<RequestContext, ScoreError> {
        let token = self
            .auth
            .bearer_token()
            .await
            .map_err(|e| ScoreError::Token(e.to_string()))?;
        Ok(RequestContext {
            token,
            user_agent: self.user_agent.clone(),
            endpoint: self.endpoint.clone(),
        })
    }

    async fn backfill_location(&self, needed: bool) -> Option<Result<Coordinates, String>> {
        if !needed {
            return None;
        }
        Some(self.location.current_location().await)
    }

    async fn resolve_common_name(&self, taxon: &RemoteTaxon) -> Option<String> {
        match self.names.common_name(taxon.id).await {
            Ok(name) => name,
            Err(e) => {
                warn!(taxon_id = taxon.id, error = %e, "Common name lookup failed");
                None
            }
        }
    }

    /// Score `photo` and produce the match view payload, or the error to show
    pub async fn run(&self, mut photo: PhotoArtifact) -> Result<MatchOutcome, ErrorState> {
        let now = seek_common::time::now();
        let ctx = self
            .request_context()
            .await
            .map_err(|e| e.to_error_state(now))?;

        let request_photo = photo.clone();
        let (scored, location) = tokio::join!(
            self.scorer.score(&request_photo, &ctx),
            self.backfill_location(photo.latitude.is_none()),
        );

        let mut location_error = None;
        match location {
            Some(Ok(coords)) => {
                debug!("Attaching device location to photo");
                photo.set_coordinates(coords.truncated());
            }
            Some(Err(code)) => {
                warn!(code = %code, "Location unavailable, continuing without it");
                location_error = Some(code);
            }
            None => {}
        }

        let response = scored.map_err(|e| e.to_error_state(seek_common::time::now()))?;
        let mut result = interpret(&response);

        let common_name = match result.taxon() {
            Some(taxon) => self.resolve_common_name(taxon).await,
            None => None,
        };
        if let VisionResult::SpeciesMatch {
            common_name: slot, ..
        } = &mut result
        {
            *slot = common_name.clone();
        }

        let taxon = result.taxon().cloned();
        let seen_date = match &result {
            VisionResult::SpeciesMatch { taxon, .. } => {
                self.record_if_new(taxon, common_name.as_deref(), &photo)
                    .await
            }
            _ => None,
        };

        let kind = match &result {
            VisionResult::SpeciesMatch { .. } => "species",
            VisionResult::AncestorMatch { .. } => "ancestor",
            VisionResult::NoMatch => "none",
        };
        info!(
            result = kind,
            taxon_id = taxon.as_ref().map(|t| t.id),
            previously_seen = seen_date.is_some(),
            "Online match resolved"
        );

        Ok(MatchOutcome {
            display_name: taxon
                .as_ref()
                .map(|t| capitalize_names(common_name.as_deref().unwrap_or(&t.name))),
            scientific_name: taxon.as_ref().map(|t| t.name.clone()),
            taxon_photo_url: taxon
                .as_ref()
                .and_then(|t| t.default_photo.as_ref())
                .and_then(|p| p.medium_url.clone()),
            result,
            photo,
            seen_date,
            location_error,
        })
    }

    /// First-seen date; records the species when it has never been seen
    async fn record_if_new(
        &self,
        taxon: &RemoteTaxon,
        common_name: Option<&str>,
        photo: &PhotoArtifact,
    ) -> Option<chrono::NaiveDate> {
        match self.seen.first_seen(taxon.id).await {
            Ok(Some(date)) => Some(date),
            Ok(None) => {
                match self.seen.add_to_collection(taxon, common_name, photo).await {
                    Ok(()) => info!(taxon_id = taxon.id, "New species added to collection"),
                    Err(e) => warn!(taxon_id = taxon.id, error = %e, "Failed to add to collection"),
                }
                None
            }
            Err(e) => {
                warn!(
                    taxon_id = taxon.id,
                    error = %e,
                    "Seen-history lookup failed, not recording"
                );
                None
            }
        }
    }
}
