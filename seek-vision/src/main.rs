//! Seek Vision command-line front end
//!
//! Runs the online identification path against the remote scoring service
//! and manages the local common-name dictionary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use seek_common::config::SeekConfig;
use seek_common::db::{self, CommonNameRow};
use seek_common::events::ErrorKind;
use seek_common::{Coordinates, PhotoArtifact};
use seek_vision::collaborators::{LocationProvider, StaticToken};
use seek_vision::scoring::ScoringClient;
use seek_vision::store::SqliteStore;
use seek_vision::OnlineMatcher;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TOKEN_ENV_VAR: &str = "SEEK_API_TOKEN";

/// Command-line arguments for seek-vision
#[derive(Parser, Debug)]
#[command(name = "seek-vision")]
#[command(about = "Species identification from photos")]
#[command(version)]
struct Args {
    /// Config file (overrides SEEK_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score an image with the online vision service
    Score {
        image: PathBuf,

        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
    },

    /// Load a common-name dictionary (JSON array of {i, l, n} rows)
    LoadNames {
        dictionary: PathBuf,

        /// Reload when fewer names than this are stored
        #[arg(long, default_value = "1")]
        min_rows: i64,
    },
}

/// No device location on the command line
struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_location(&self) -> std::result::Result<Coordinates, String> {
        Err("location_unavailable".to_string())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seek_vision=debug,seek_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = SeekConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    match args.command {
        Command::Score { image, lat, lng } => score(&config, image, lat.zip(lng)).await,
        Command::LoadNames {
            dictionary,
            min_rows,
        } => load_names(&config, dictionary, min_rows).await,
    }
}

async fn score(config: &SeekConfig, image: PathBuf, location: Option<(f64, f64)>) -> Result<()> {
    let token = StaticToken::from_env(TOKEN_ENV_VAR)?;
    let pool = db::init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    let store = Arc::new(SqliteStore::new(pool, config.locale.clone()));
    let scorer = ScoringClient::new(std::time::Duration::from_secs(config.request_timeout_secs))?;

    let matcher = OnlineMatcher::new(
        Arc::new(scorer),
        Arc::new(token),
        store.clone(),
        store,
        Arc::new(NoLocation),
        config.endpoint.clone(),
        config.user_agent.clone(),
    );

    let mut photo = PhotoArtifact::new(image.to_string_lossy(), seek_common::time::now());
    if let Some((latitude, longitude)) = location {
        photo.set_coordinates(Coordinates {
            latitude,
            longitude,
        });
    }

    info!(image = %image.display(), "Scoring image");
    match matcher.run(photo).await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Err(state) if state.kind == ErrorKind::Downtime => match state.retry_hours {
            Some(hours) => anyhow::bail!(
                "Scoring service is down, expected back in about {} hour(s)",
                hours
            ),
            None => anyhow::bail!("Scoring service is down, try again later"),
        },
        Err(state) => anyhow::bail!(
            "Scoring failed ({}): {}",
            state.kind,
            state.detail.unwrap_or_default()
        ),
    }
}

async fn load_names(config: &SeekConfig, dictionary: PathBuf, min_rows: i64) -> Result<()> {
    let content = tokio::fs::read_to_string(&dictionary)
        .await
        .with_context(|| format!("Failed to read {}", dictionary.display()))?;
    let rows: Vec<CommonNameRow> =
        serde_json::from_str(&content).context("Failed to parse common-name dictionary")?;

    let pool = db::init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    let inserted = db::load_common_names(&pool, &rows, &config.locale, min_rows).await?;
    info!(inserted, locale = %config.locale, "Common-name dictionary loaded");
    println!("{}", inserted);
    Ok(())
}
