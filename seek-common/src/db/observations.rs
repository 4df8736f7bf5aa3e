//! The user's collection of recorded species

use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Collection entry to be recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewObservation {
    pub taxon_id: i64,
    /// Common name at the time of recording, if known
    pub name: Option<String>,
    pub scientific_name: String,
    pub photo_uri: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub seen_date: NaiveDate,
}

/// Insert a collection entry, returning its id
pub async fn add_observation(pool: &SqlitePool, observation: &NewObservation) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO observations
            (id, taxon_id, name, scientific_name, photo_uri, latitude, longitude, seen_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(observation.taxon_id)
    .bind(&observation.name)
    .bind(&observation.scientific_name)
    .bind(&observation.photo_uri)
    .bind(observation.latitude)
    .bind(observation.longitude)
    .bind(observation.seen_date.format(DATE_FORMAT).to_string())
    .execute(pool)
    .await?;

    Ok(id)
}

/// Date the taxon was first recorded, `None` if never seen
pub async fn first_seen_date(pool: &SqlitePool, taxon_id: i64) -> Result<Option<NaiveDate>> {
    let raw: Option<String> =
        sqlx::query_scalar("SELECT MIN(seen_date) FROM observations WHERE taxon_id = ?")
            .bind(taxon_id)
            .fetch_one(pool)
            .await?;

    raw.map(|s| {
        NaiveDate::parse_from_str(&s, DATE_FORMAT)
            .map_err(|e| Error::Internal(format!("Corrupt seen_date {:?}: {}", s, e)))
    })
    .transpose()
}

/// Number of recorded entries for a taxon
pub async fn observation_count(pool: &SqlitePool, taxon_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM observations WHERE taxon_id = ?")
        .bind(taxon_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
