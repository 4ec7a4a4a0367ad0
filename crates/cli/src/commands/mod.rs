//! CLI command implementations

pub mod inventory;
pub mod profiles;
pub mod run;

use advisor_lib::ercole::{ErcoleInventory, FileErcoleInventory, StaticErcoleInventory};
use advisor_lib::profiles::StaticProfileStore;
use advisor_lib::provider::{OciProviderFactory, ProviderFactory, SnapshotProviderFactory};
use advisor_lib::RecommendationEngine;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use crate::config::{AdvisorConfig, ErcoleConfig};

/// Exit status when some units were skipped.
pub const PARTIAL_FAILURE: u8 = 2;

pub fn exit_code(complete: bool) -> ExitCode {
    if complete {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(PARTIAL_FAILURE)
    }
}

fn ercole_inventory(config: &ErcoleConfig) -> Arc<dyn ErcoleInventory> {
    match &config.databases_path {
        Some(path) => {
            let mut inventory = FileErcoleInventory::new(path);
            if let Some(active) = &config.active_databases_path {
                inventory = inventory.with_active_path(active);
            }
            Arc::new(inventory)
        }
        None => Arc::new(StaticErcoleInventory::empty()),
    }
}

/// Build the engine from configuration, using an offline snapshot when one
/// is given on the command line or in the config.
pub async fn build_engine(
    config: &AdvisorConfig,
    snapshot: Option<&Path>,
) -> Result<RecommendationEngine> {
    let store = Arc::new(StaticProfileStore::new(config.profiles.clone()));

    let factory: Arc<dyn ProviderFactory> = match snapshot.or(config.snapshot_path.as_deref()) {
        Some(path) => {
            info!(path = %path.display(), "Using offline inventory snapshot");
            let factory = SnapshotProviderFactory::load(path)
                .await
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
            Arc::new(factory)
        }
        None => Arc::new(OciProviderFactory::new(config.request_timeout())),
    };

    Ok(RecommendationEngine::new(
        store,
        factory,
        ercole_inventory(&config.ercole),
    ))
}
