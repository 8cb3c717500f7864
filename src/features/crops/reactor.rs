//! Selection-Change Reactor
//!
//! Turns the stream of crop selections into aggregate loads. A background
//! task debounces distinct selections and runs at most one load at a time:
//!
//! ```text
//!            distinct Some(id)              quiet period elapsed
//!   Idle ───────────────────────► Debouncing ──────────────────► Loading
//!    ▲                               │  ▲                           │
//!    │          None                 │  │    distinct Some(id)      │
//!    └───────────────────────────────┘  └───────────────────────────┤
//!    └──────────────────────────── load settled ◄───────────────────┘
//! ```
//!
//! A debounce that elapses while a load is running is deferred until that
//! load settles. Results are delivered only if their crop is still selected.
//! On shutdown a running load is detached rather than aborted: it still
//! settles into the caches, but its result is not delivered.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

use crate::domain::crop::CropId;
use crate::features::crops::loader::AggregateLoader;
use crate::services::{DashboardEvent, runtime};
use crate::state::{DashboardState, LoadDisposition, LoadOutcome, LoadTicket, SelectionStore};

/// Observable reactor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorPhase {
    Idle,
    Debouncing,
    Loading,
}

/// Counters reported when the reactor stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReactorStats {
    pub loads_started: u64,
    pub loads_delivered: u64,
    pub loads_discarded: u64,
    /// Selection notifications that did not change anything
    pub changes_ignored: u64,
}

struct InFlightLoad {
    ticket: LoadTicket,
    handle: JoinHandle<LoadOutcome>,
}

/// Dependencies of the reactor task
pub struct SelectionReactor {
    loader: AggregateLoader,
    selection: Arc<SelectionStore>,
    state: Arc<RwLock<DashboardState>>,
    events: broadcast::Sender<DashboardEvent>,
    debounce: Duration,
}

/// Handle to a running reactor
pub struct ReactorHandle {
    phase: watch::Receiver<ReactorPhase>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<ReactorStats>,
}

impl ReactorHandle {
    pub fn phase(&self) -> ReactorPhase {
        *self.phase.borrow()
    }

    /// Receiver of phase transitions
    pub fn phase_changes(&self) -> watch::Receiver<ReactorPhase> {
        self.phase.clone()
    }

    /// Stop the reactor and wait for it to exit
    pub async fn shutdown(self) -> ReactorStats {
        // The task may already have exited because the selection stream closed
        let _ = self.shutdown.send(());
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "Selection reactor task failed");
                ReactorStats::default()
            }
        }
    }
}

impl SelectionReactor {
    pub fn new(
        loader: AggregateLoader,
        selection: Arc<SelectionStore>,
        state: Arc<RwLock<DashboardState>>,
        events: broadcast::Sender<DashboardEvent>,
        debounce: Duration,
    ) -> Self {
        Self {
            loader,
            selection,
            state,
            events,
            debounce,
        }
    }

    /// Spawn the reactor task
    ///
    /// The selection at the time of the call is the baseline and does not
    /// trigger a load unless `load_current` is set, in which case it is loaded
    /// immediately without debouncing.
    pub fn spawn(self, load_current: bool) -> ReactorHandle {
        let selection = self.selection.subscribe();
        let (phase_tx, phase_rx) = watch::channel(ReactorPhase::Idle);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = runtime::spawn_named(
            "selection-reactor",
            self.run(selection, shutdown_rx, phase_tx, load_current),
        );

        ReactorHandle {
            phase: phase_rx,
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(
        self,
        mut selection: watch::Receiver<Option<CropId>>,
        mut shutdown: oneshot::Receiver<()>,
        phase: watch::Sender<ReactorPhase>,
        load_current: bool,
    ) -> ReactorStats {
        let mut stats = ReactorStats::default();
        let mut observed = selection.borrow_and_update().clone();
        let mut last_loaded: Option<CropId> = None;
        let mut pending: Option<(CropId, Instant)> = None;
        let mut deferred: Option<CropId> = None;
        let mut in_flight: Option<InFlightLoad> = None;

        if load_current {
            if let Some(id) = observed.clone() {
                in_flight = Some(self.start_load(id.clone(), &mut stats));
                last_loaded = Some(id);
            }
        }

        info!(debounce_ms = self.debounce.as_millis() as u64, "Selection reactor started");

        loop {
            let current_phase = if pending.is_some() || deferred.is_some() {
                ReactorPhase::Debouncing
            } else if in_flight.is_some() {
                ReactorPhase::Loading
            } else {
                ReactorPhase::Idle
            };
            phase.send_if_modified(|p| {
                let changed = *p != current_phase;
                *p = current_phase;
                changed
            });

            let deadline = pending.as_ref().map(|(_, at)| *at);

            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Selection reactor shutdown requested");
                    break;
                }

                changed = selection.changed() => {
                    if changed.is_err() {
                        debug!("Selection stream closed");
                        break;
                    }
                    let value = selection.borrow_and_update().clone();
                    if value == observed {
                        stats.changes_ignored += 1;
                        continue;
                    }
                    observed = value.clone();

                    match value {
                        None => {
                            debug!("Selection cleared, cancelling pending load");
                            pending = None;
                            deferred = None;
                        }
                        Some(id) if last_loaded.as_ref() == Some(&id) => {
                            debug!(crop_id = %id, "Crop already loaded, skipping");
                            stats.changes_ignored += 1;
                            pending = None;
                            deferred = None;
                        }
                        Some(id) => {
                            pending = Some((id, Instant::now() + self.debounce));
                            deferred = None;
                        }
                    }
                }

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some((id, _)) = pending.take() {
                        if in_flight.is_some() {
                            debug!(crop_id = %id, "Load in progress, deferring");
                            deferred = Some(id);
                        } else {
                            in_flight = Some(self.start_load(id.clone(), &mut stats));
                            last_loaded = Some(id);
                        }
                    }
                }

                (ticket, joined) = join_load(&mut in_flight), if in_flight.is_some() => {
                    let applied = self.settle_load(&ticket, joined, &mut stats);
                    if !applied && last_loaded.as_ref() == Some(&ticket.crop_id) {
                        // Nothing was shown for this crop, so selecting it again must reload
                        last_loaded = None;
                    }

                    if let Some(id) = deferred.take() {
                        if last_loaded.as_ref() == Some(&id) {
                            debug!(crop_id = %id, "Deferred crop already loaded, skipping");
                        } else {
                            in_flight = Some(self.start_load(id.clone(), &mut stats));
                            last_loaded = Some(id);
                        }
                    }
                }
            }
        }

        if let Some(load) = in_flight.take() {
            info!(
                crop_id = %load.ticket.crop_id,
                "Reactor stopped with a load in flight, result will not be delivered"
            );
            self.state.write().abandon_load(&load.ticket);
            // Dropping the handle detaches the task, the load still fills the caches
            drop(load.handle);
        }
        phase.send_replace(ReactorPhase::Idle);

        info!(
            loads_started = stats.loads_started,
            loads_delivered = stats.loads_delivered,
            loads_discarded = stats.loads_discarded,
            "Selection reactor stopped"
        );
        stats
    }

    fn start_load(&self, crop_id: CropId, stats: &mut ReactorStats) -> InFlightLoad {
        let ticket = self.state.write().begin_load(crop_id.clone());
        stats.loads_started += 1;
        debug!(crop_id = %crop_id, seq = ticket.seq, "Starting dashboard load");
        let _ = self.events.send(DashboardEvent::LoadStarted {
            crop_id: crop_id.clone(),
            seq: ticket.seq,
        });

        let loader = self.loader.clone();
        let handle = runtime::spawn_named("dashboard-load", async move {
            loader.load_aggregate(&crop_id).await
        });
        InFlightLoad { ticket, handle }
    }

    /// Apply or discard a settled load; returns whether a complete dashboard was applied
    fn settle_load(
        &self,
        ticket: &LoadTicket,
        joined: Result<LoadOutcome, JoinError>,
        stats: &mut ReactorStats,
    ) -> bool {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(crop_id = %ticket.crop_id, error = %e, "Dashboard load task failed");
                self.state.write().abandon_load(ticket);
                let _ = self.events.send(DashboardEvent::LoadFailed {
                    crop_id: ticket.crop_id.clone(),
                    seq: ticket.seq,
                    message: e.to_string(),
                });
                return false;
            }
        };

        let current = self.selection.current();
        let disposition =
            deliver_outcome(&self.state, &self.events, ticket, outcome, current.as_ref());
        match disposition {
            LoadDisposition::Applied | LoadDisposition::Failed => stats.loads_delivered += 1,
            LoadDisposition::Discarded => stats.loads_discarded += 1,
        }
        disposition == LoadDisposition::Applied
    }
}

/// Apply a settled load to the dashboard state and publish the matching event
pub(crate) fn deliver_outcome(
    state: &RwLock<DashboardState>,
    events: &broadcast::Sender<DashboardEvent>,
    ticket: &LoadTicket,
    outcome: LoadOutcome,
    current: Option<&CropId>,
) -> LoadDisposition {
    let failure = outcome.failure.as_ref().map(ToString::to_string);
    let degraded = outcome.degraded.clone();
    let disposition = state.write().finish_load(ticket, outcome, current);

    let crop_id = ticket.crop_id.clone();
    let seq = ticket.seq;
    let event = match disposition {
        LoadDisposition::Applied => DashboardEvent::DashboardLoaded {
            crop_id,
            seq,
            degraded,
        },
        LoadDisposition::Failed => DashboardEvent::LoadFailed {
            crop_id,
            seq,
            message: failure.unwrap_or_default(),
        },
        LoadDisposition::Discarded => {
            warn!(
                crop_id = %crop_id,
                seq,
                "Discarding dashboard for a crop that is no longer selected"
            );
            DashboardEvent::LoadDiscarded { crop_id, seq }
        }
    };
    let _ = events.send(event);
    disposition
}

/// Wait for the in-flight load, clearing the slot once it settles
async fn join_load(
    slot: &mut Option<InFlightLoad>,
) -> (LoadTicket, Result<LoadOutcome, JoinError>) {
    let Some(load) = slot.as_mut() else {
        return std::future::pending().await;
    };
    let joined = (&mut load.handle).await;
    let ticket = load.ticket.clone();
    *slot = None;
    (ticket, joined)
}
