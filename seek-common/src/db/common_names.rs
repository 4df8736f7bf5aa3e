//! Common-name lookups keyed by taxon id and locale

use crate::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};

/// One row of a bundled common-name dictionary
///
/// Field names match the compact dictionary files (`i`, `l`, `n`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonNameRow {
    #[serde(rename = "i")]
    pub taxon_id: i64,
    #[serde(rename = "l")]
    pub locale: String,
    #[serde(rename = "n")]
    pub name: String,
}

/// Look up the common name for a taxon in the given locale
pub async fn common_name(pool: &SqlitePool, taxon_id: i64, locale: &str) -> Result<Option<String>> {
    let name = sqlx::query_scalar::<_, String>(
        "SELECT name FROM common_names WHERE taxon_id = ? AND locale = ?",
    )
    .bind(taxon_id)
    .bind(locale)
    .fetch_optional(pool)
    .await?;

    Ok(name)
}

/// Number of stored names and the locale of the first stored row
pub async fn stored_locale(pool: &SqlitePool) -> Result<(i64, Option<String>)> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM common_names")
        .fetch_one(pool)
        .await?;
    let locale = sqlx::query_scalar::<_, String>("SELECT locale FROM common_names LIMIT 1")
        .fetch_optional(pool)
        .await?;
    Ok((count, locale))
}

/// Load dictionary rows for `locale`, replacing the table when needed
///
/// The table is rebuilt when the stored locale differs from `locale` or when
/// fewer than `min_rows` names are stored. Rows for other locales are skipped.
/// Returns the number of rows inserted (0 when the table was already current).
pub async fn load_common_names(
    pool: &SqlitePool,
    rows: &[CommonNameRow],
    locale: &str,
    min_rows: i64,
) -> Result<usize> {
    let (count, stored) = stored_locale(pool).await?;
    if stored.as_deref() == Some(locale) && count >= min_rows {
        debug!(count, locale, "Common names already loaded");
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM common_names")
        .execute(&mut *tx)
        .await?;

    let mut inserted = 0usize;
    for row in rows.iter().filter(|r| r.locale == locale) {
        sqlx::query(
            "INSERT OR REPLACE INTO common_names (taxon_id, locale, name) VALUES (?, ?, ?)",
        )
        .bind(row.taxon_id)
        .bind(&row.locale)
        .bind(&row.name)
        .execute(&mut *tx)
        .await?;
        inserted += 1;
    }
    tx.commit().await?;

    info!(
        inserted,
        locale,
        previous_locale = ?stored,
        previous_count = count,
        "Reloaded common names"
    );
    Ok(inserted)
}
