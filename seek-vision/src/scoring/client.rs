//! HTTP client for the remote vision scoring service

use super::{RequestContext, ScoreError, ScoreResponse, VisionScorer};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::multipart::{Form, Part};
use seek_common::PhotoArtifact;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct ScoringClient {
    http_client: reqwest::Client,
}

impl ScoringClient {
    pub fn new(timeout: Duration) -> Result<Self, ScoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScoreError::Network(e.to_string()))?;

        Ok(Self { http_client })
    }

    async fn build_form(photo: &PhotoArtifact) -> Result<Form, ScoreError> {
        let path = photo.local_path();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ScoreError::Image(format!("{}: {}", path, e)))?;

        let image = Part::bytes(bytes)
            .file_name("photo.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| ScoreError::Image(e.to_string()))?;

        let mut form = Form::new()
            .part("image", image)
            .text("observed_on", photo.captured_at.to_rfc3339());
        if let Some(coords) = photo.coordinates() {
            form = form
                .text("lat", coords.latitude.to_string())
                .text("lng", coords.longitude.to_string());
        }
        Ok(form)
    }
}

#[async_trait]
impl VisionScorer for ScoringClient {
    async fn score(
        &self,
        photo: &PhotoArtifact,
        ctx: &RequestContext,
    ) -> Result<ScoreResponse, ScoreError> {
        let form = Self::build_form(photo).await?;

        debug!(
            endpoint = %ctx.endpoint,
            has_location = photo.coordinates().is_some(),
            "Submitting photo for online scoring"
        );

        let response = self
            .http_client
            .post(&ctx.endpoint)
            // The service expects the JWT as-is, without a "Bearer " scheme
            .header(AUTHORIZATION, &ctx.token)
            .header(USER_AGENT, &ctx.user_agent)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ScoreError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                retry_after = ?retry_after,
                "Scoring request failed"
            );
            return Err(ScoreError::Http {
                status: status.as_u16(),
                retry_after,
                body,
            });
        }

        let scored: ScoreResponse = response
            .json()
            .await
            .map_err(|e| ScoreError::Parse(e.to_string()))?;

        if let Some(top) = scored.results.first() {
            info!(
                taxon_id = top.taxon.id,
                rank = %top.taxon.rank,
                score = top.combined_score,
                results = scored.results.len(),
                "Scoring successful"
            );
        } else {
            info!(
                has_ancestor = scored.common_ancestor.is_some(),
                "Scoring returned no ranked results"
            );
        }

        Ok(scored)
    }
}
