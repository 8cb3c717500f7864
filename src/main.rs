//! Crop Dashboard - Main Entry Point
//!
//! Loads the crop list, selects a crop (from the command line or the last
//! persisted selection), waits for its dashboard and prints it as JSON.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use crop_dashboard::domain::config::AppConfig;
use crop_dashboard::domain::crop::CropId;
use crop_dashboard::features::crops::CropsController;
use crop_dashboard::services::{DashboardEvent, HttpFetcher, runtime};
use crop_dashboard::utils::config_store::load_config;
use crop_dashboard::utils::logging::init_logging;
use crop_dashboard::utils::storage::{JsonFileStore, KeyValueStore, MemoryStore};
use tokio::sync::broadcast;
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    let (config, config_error) = match load_config() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    let _logging = init_logging(&config.logging).context("failed to initialize logging")?;
    if let Some(e) = config_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    info!("Starting Crop Dashboard...");
    let crop_arg = std::env::args().nth(1).map(CropId::from);
    runtime::block_on(run(config, crop_arg))
}

async fn run(config: AppConfig, crop_arg: Option<CropId>) -> anyhow::Result<()> {
    let fetcher = Arc::new(HttpFetcher::new(&config.api).context("failed to build HTTP client")?);
    info!(base_url = fetcher.base_url(), "Using crop API");

    let storage: Arc<dyn KeyValueStore> = match JsonFileStore::open_default() {
        Ok(store) => {
            info!(path = %store.path().display(), "Using state file");
            Arc::new(store)
        }
        Err(e) => {
            warn!(error = %e, "State file unavailable, selection will not persist");
            Arc::new(MemoryStore::new())
        }
    };

    let controller = CropsController::new(fetcher, storage, &config);
    let mut events = controller.subscribe();

    if let Err(e) = controller.start().await {
        controller.teardown().await;
        return Err(e).context("failed to load crops");
    }
    if let Some(crop_id) = crop_arg {
        controller.select_crop(Some(crop_id));
    }

    let output = match controller.selected_crop_id() {
        Some(crop_id) => {
            let budget =
                config.timeouts.overall() + config.reactor.debounce() + Duration::from_secs(1);
            if !wait_for_dashboard(&mut events, &crop_id, budget).await {
                warn!(crop_id = %crop_id, "No dashboard before timeout");
            }
            let view = controller.dashboard();
            serde_json::json!({
                "crop": controller.selected_crop(),
                "dashboard": view.snapshot,
                "error": view.error,
            })
        }
        None => serde_json::json!({ "crops": controller.crops() }),
    };

    controller.teardown().await;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Wait until a load for `crop_id` settles; false on timeout or closed channel
async fn wait_for_dashboard(
    events: &mut broadcast::Receiver<DashboardEvent>,
    crop_id: &CropId,
    budget: Duration,
) -> bool {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) if event.is_load_settled() && event.crop_id() == Some(crop_id) => {
                    return true;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Dashboard events lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return false,
            }
        }
    };
    tokio::time::timeout(budget, wait).await.unwrap_or(false)
}
