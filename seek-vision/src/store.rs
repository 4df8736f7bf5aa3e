//! SQLite-backed common-name and seen-history lookups

use crate::collaborators::{CommonNameLookup, SeenHistory};
use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use seek_common::db::{self, NewObservation};
use seek_common::events::RemoteTaxon;
use seek_common::PhotoArtifact;
use sqlx::SqlitePool;

pub struct SqliteStore {
    pool: SqlitePool,
    locale: String,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, locale: impl Into<String>) -> Self {
        Self {
            pool,
            locale: locale.into(),
        }
    }
}

fn db_taxon_id(taxon_id: u64) -> anyhow::Result<i64> {
    i64::try_from(taxon_id).with_context(|| format!("taxon id {} out of range", taxon_id))
}

#[async_trait]
impl CommonNameLookup for SqliteStore {
    async fn common_name(&self, taxon_id: u64) -> anyhow::Result<Option<String>> {
        let name = db::common_name(&self.pool, db_taxon_id(taxon_id)?, &self.locale).await?;
        Ok(name)
    }
}

#[async_trait]
impl SeenHistory for SqliteStore {
    async fn first_seen(&self, taxon_id: u64) -> anyhow::Result<Option<NaiveDate>> {
        let date = db::first_seen_date(&self.pool, db_taxon_id(taxon_id)?).await?;
        Ok(date)
    }

    async fn add_to_collection(
        &self,
        taxon: &RemoteTaxon,
        common_name: Option<&str>,
        photo: &PhotoArtifact,
    ) -> anyhow::Result<()> {
        let observation = NewObservation {
            taxon_id: db_taxon_id(taxon.id)?,
            name: common_name.map(str::to_owned),
            scientific_name: taxon.name.clone(),
            photo_uri: photo.uri.clone(),
            latitude: photo.latitude,
            longitude: photo.longitude,
            seen_date: photo.captured_at.date_naive(),
        };
        db::add_observation(&self.pool, &observation)
            .await
            .context("Failed to record observation")?;
        Ok(())
    }
}
