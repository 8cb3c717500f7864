//! Crops Controller
//!
//! Presentation-facing entry point of the crop dashboard. Owns the selection,
//! the dashboard state, the crop catalog and the reactor, and publishes
//! [`DashboardEvent`]s for subscribers.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::domain::action::ActionAck;
use crate::domain::config::{AppConfig, TimeoutConfig};
use crate::domain::crop::{Crop, CropId};
use crate::error::{FetchError, Result};
use crate::features::crops::loader::AggregateLoader;
use crate::features::crops::reactor::{
    ReactorHandle, ReactorPhase, SelectionReactor, deliver_outcome,
};
use crate::services::{CropDataService, DashboardEvent, Fetcher};
use crate::state::{
    CropCatalog, DashboardSnapshot, DashboardState, LOAD_TIMEOUT_MESSAGE, LoadDisposition,
    SelectionStore,
};
use crate::utils::storage::KeyValueStore;

/// Read-only view of the dashboard for presentation
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    pub snapshot: Option<DashboardSnapshot>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Crop dashboard controller
pub struct CropsController {
    service: CropDataService,
    loader: AggregateLoader,
    selection: Arc<SelectionStore>,
    state: Arc<RwLock<DashboardState>>,
    catalog: RwLock<CropCatalog>,
    events: broadcast::Sender<DashboardEvent>,
    reactor: Mutex<Option<ReactorHandle>>,
    timeouts: TimeoutConfig,
    debounce: std::time::Duration,
}

impl CropsController {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        storage: Arc<dyn KeyValueStore>,
        config: &AppConfig,
    ) -> Self {
        let service = CropDataService::new(fetcher, config);
        let loader = AggregateLoader::new(service.clone(), config);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            service,
            loader,
            selection: Arc::new(SelectionStore::new(storage)),
            state: Arc::new(RwLock::new(DashboardState::new())),
            catalog: RwLock::new(CropCatalog::new()),
            events,
            reactor: Mutex::new(None),
            timeouts: config.timeouts.clone(),
            debounce: config.reactor.debounce(),
        }
    }

    // ==================== Lifecycle ====================

    /// Load the crop list and start reacting to selection changes
    ///
    /// When a crop is already selected (restored from storage) and the list
    /// is non-empty, its dashboard is loaded right away. A crop list failure
    /// is reported but the reactor still starts.
    pub async fn start(&self) -> Result<()> {
        if self.reactor.lock().is_some() {
            warn!("Crops controller already started");
            return Ok(());
        }

        let loaded = self.load_crops().await;
        let load_current = matches!(&loaded, Ok(count) if *count > 0);

        let reactor = SelectionReactor::new(
            self.loader.clone(),
            self.selection.clone(),
            self.state.clone(),
            self.events.clone(),
            self.debounce,
        )
        .spawn(load_current);
        *self.reactor.lock() = Some(reactor);

        info!(
            selected = ?self.selection.current().map(|id| id.to_string()),
            "Crops controller started"
        );
        loaded.map(|_| ())
    }

    async fn load_crops(&self) -> Result<usize> {
        let budget = self.timeouts.initial_load();
        let crops = match tokio::time::timeout(budget, self.service.crops()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::timeout("crops", budget)),
        };

        match crops {
            Ok(crops) => {
                let count = crops.len();
                self.catalog.write().set_crops(crops);
                info!(count, "Crops loaded");
                let _ = self.events.send(DashboardEvent::CropsLoaded { count });
                Ok(count)
            }
            Err(e) => {
                error!(error = %e, "Failed to load crops");
                self.state.write().set_error(if e.is_timeout() {
                    LOAD_TIMEOUT_MESSAGE
                } else {
                    "Failed to load crops"
                });
                Err(e.into())
            }
        }
    }

    /// Stop the reactor and drop all cached data
    pub async fn teardown(&self) {
        let reactor = self.reactor.lock().take();
        if let Some(reactor) = reactor {
            let stats = reactor.shutdown().await;
            info!(
                loads_started = stats.loads_started,
                loads_delivered = stats.loads_delivered,
                "Crops controller stopped"
            );
        }
        self.service.clear_caches();
        self.state.write().clear();
        self.catalog.write().clear();
    }

    // ==================== Selection ====================

    /// Select a crop, or clear the selection
    pub fn select_crop(&self, crop_id: Option<CropId>) {
        self.selection.select(crop_id.clone());
        let _ = self
            .events
            .send(DashboardEvent::SelectionChanged { crop_id });
    }

    pub fn selected_crop_id(&self) -> Option<CropId> {
        self.selection.current()
    }

    /// Receiver of selection changes
    pub fn selection_changes(&self) -> watch::Receiver<Option<CropId>> {
        self.selection.subscribe()
    }

    /// Record of the selected crop, if it is in the catalog
    pub fn selected_crop(&self) -> Option<Crop> {
        let selected = self.selection.current();
        self.catalog.read().selected(selected.as_ref())
    }

    pub fn crops(&self) -> Vec<Crop> {
        self.catalog.read().crops().to_vec()
    }

    // ==================== Dashboard ====================

    pub fn dashboard(&self) -> DashboardView {
        let state = self.state.read();
        DashboardView {
            snapshot: state.snapshot().cloned(),
            loading: state.is_loading(),
            error: state.error().map(str::to_string),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    pub fn reactor_phase(&self) -> ReactorPhase {
        self.reactor
            .lock()
            .as_ref()
            .map(ReactorHandle::phase)
            .unwrap_or(ReactorPhase::Idle)
    }

    /// Reload the dashboard of the current selection, bypassing the reactor
    ///
    /// Cached sensors and readings are reused; KPIs are always fetched fresh.
    pub async fn refresh(&self) -> Option<LoadDisposition> {
        let crop_id = self.selection.current()?;
        let ticket = self.state.write().begin_load(crop_id.clone());
        let _ = self.events.send(DashboardEvent::LoadStarted {
            crop_id: crop_id.clone(),
            seq: ticket.seq,
        });

        let outcome = self.loader.load_aggregate(&crop_id).await;
        let current = self.selection.current();
        let disposition =
            deliver_outcome(&self.state, &self.events, &ticket, outcome, current.as_ref());
        if disposition == LoadDisposition::Failed {
            warn!(crop_id = %crop_id, seq = ticket.seq, "Dashboard refresh failed");
        }
        Some(disposition)
    }

    // ==================== Actions ====================

    /// Execute a device action for a crop
    pub async fn execute_action(&self, crop_id: &CropId, action: &str) -> Result<ActionAck> {
        match self.service.execute_action(crop_id, action).await {
            Ok(ack) => {
                info!(crop_id = %crop_id, action = %action, ok = ack.ok, "Action executed");
                let _ = self.events.send(DashboardEvent::ActionExecuted {
                    crop_id: crop_id.clone(),
                    action: action.to_string(),
                    ok: ack.ok,
                });
                Ok(ack)
            }
            Err(e) => {
                error!(crop_id = %crop_id, action = %action, error = %e, "Action failed");
                let _ = self.events.send(DashboardEvent::ActionFailed {
                    crop_id: crop_id.clone(),
                    action: action.to_string(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }
}
