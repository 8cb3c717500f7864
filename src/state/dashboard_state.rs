//! DashboardState - Current Dashboard Snapshot and Load Bookkeeping
//!
//! Loads are tagged with a [`LoadTicket`] carrying the crop id and a
//! monotonically increasing sequence number. A finished load is applied only
//! if its crop is still selected and no newer load has been applied, so a slow
//! response for a previous selection can never overwrite the current one.

use serde::Serialize;

use crate::domain::crop::CropId;
use crate::domain::dashboard::CropDashboard;
use crate::error::FetchError;
use crate::services::SubLoad;

/// Message shown when the aggregate load timed out as a whole
pub const LOAD_TIMEOUT_MESSAGE: &str = "Request timed out. Backend may be slow or unavailable.";

/// Message shown when the aggregate load failed for another reason
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load crop dashboard";

/// Tag of one aggregate load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub crop_id: CropId,
    pub seq: u64,
}

/// Result of one aggregate load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub crop_id: CropId,
    /// Always fully shaped; failed parts hold their fallbacks
    pub dashboard: CropDashboard,
    /// Sub-loads that fell back
    pub degraded: Vec<SubLoad>,
    /// Set only when the whole load failed
    pub failure: Option<FetchError>,
}

/// Applied dashboard for one crop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub crop_id: CropId,
    pub seq: u64,
    pub dashboard: CropDashboard,
    #[serde(serialize_with = "serialize_sub_loads")]
    pub degraded: Vec<SubLoad>,
}

fn serialize_sub_loads<S: serde::Serializer>(
    loads: &[SubLoad],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(loads.iter().map(SubLoad::label))
}

/// What happened to a finished load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadDisposition {
    /// Applied as the current dashboard
    Applied,
    /// Applied, but the load failed as a whole
    Failed,
    /// Dropped because the selection moved on or a newer load was applied
    Discarded,
}

/// State for the dashboard of the selected crop
#[derive(Debug, Default)]
pub struct DashboardState {
    snapshot: Option<DashboardSnapshot>,
    loading: Option<LoadTicket>,
    error: Option<String>,
    next_seq: u64,
    applied_seq: u64,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new load and mark the dashboard as loading
    pub fn begin_load(&mut self, crop_id: CropId) -> LoadTicket {
        self.next_seq += 1;
        let ticket = LoadTicket {
            crop_id,
            seq: self.next_seq,
        };
        self.loading = Some(ticket.clone());
        self.error = None;
        ticket
    }

    /// Apply a finished load if it is still authoritative
    pub fn finish_load(
        &mut self,
        ticket: &LoadTicket,
        outcome: LoadOutcome,
        current_selection: Option<&CropId>,
    ) -> LoadDisposition {
        if self.loading.as_ref() == Some(ticket) {
            self.loading = None;
        }

        let selected = current_selection == Some(&ticket.crop_id);
        if !selected || ticket.seq < self.applied_seq {
            return LoadDisposition::Discarded;
        }

        self.applied_seq = ticket.seq;
        let disposition = match &outcome.failure {
            Some(failure) => {
                self.error = Some(if failure.is_timeout() {
                    LOAD_TIMEOUT_MESSAGE.to_string()
                } else {
                    LOAD_FAILED_MESSAGE.to_string()
                });
                LoadDisposition::Failed
            }
            None => {
                self.error = None;
                LoadDisposition::Applied
            }
        };
        self.snapshot = Some(DashboardSnapshot {
            crop_id: ticket.crop_id.clone(),
            seq: ticket.seq,
            dashboard: outcome.dashboard,
            degraded: outcome.degraded,
        });
        disposition
    }

    /// Forget a load that will never finish (its task died)
    pub fn abandon_load(&mut self, ticket: &LoadTicket) {
        if self.loading.as_ref() == Some(ticket) {
            self.loading = None;
        }
    }

    /// Set a user-visible error outside of a load (e.g. crop list failure)
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn snapshot(&self) -> Option<&DashboardSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Reset everything except the sequence counter
    pub fn clear(&mut self) {
        self.snapshot = None;
        self.loading = None;
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn outcome(crop: &str, failure: Option<FetchError>) -> LoadOutcome {
        LoadOutcome {
            crop_id: CropId::from(crop),
            dashboard: CropDashboard::fallback(),
            degraded: Vec::new(),
            failure,
        }
    }

    #[test]
    fn test_applies_current_selection() {
        let mut state = DashboardState::new();
        let c1 = CropId::from("c1");
        let ticket = state.begin_load(c1.clone());
        assert!(state.is_loading());

        let disposition = state.finish_load(&ticket, outcome("c1", None), Some(&c1));
        assert_eq!(disposition, LoadDisposition::Applied);
        assert!(!state.is_loading());
        assert_eq!(state.snapshot().map(|s| s.crop_id.clone()), Some(c1));
    }

    #[test]
    fn test_discards_stale_selection() {
        let mut state = DashboardState::new();
        let c1 = CropId::from("c1");
        let c2 = CropId::from("c2");
        let ticket = state.begin_load(c1);

        let disposition = state.finish_load(&ticket, outcome("c1", None), Some(&c2));
        assert_eq!(disposition, LoadDisposition::Discarded);
        assert!(state.snapshot().is_none());
    }

    #[test]
    fn test_older_load_never_overwrites_newer() {
        let mut state = DashboardState::new();
        let c1 = CropId::from("c1");
        let old = state.begin_load(c1.clone());
        let new = state.begin_load(c1.clone());

        assert_eq!(
            state.finish_load(&new, outcome("c1", None), Some(&c1)),
            LoadDisposition::Applied
        );
        assert_eq!(
            state.finish_load(&old, outcome("c1", None), Some(&c1)),
            LoadDisposition::Discarded
        );
        assert_eq!(state.snapshot().map(|s| s.seq), Some(new.seq));
    }

    #[test]
    fn test_timeout_sets_error_message() {
        let mut state = DashboardState::new();
        let c1 = CropId::from("c1");
        let ticket = state.begin_load(c1.clone());
        let failure = FetchError::timeout("dashboard", Duration::from_secs(15));

        let disposition = state.finish_load(&ticket, outcome("c1", Some(failure)), Some(&c1));
        assert_eq!(disposition, LoadDisposition::Failed);
        assert_eq!(state.error(), Some(LOAD_TIMEOUT_MESSAGE));
        assert!(state.snapshot().is_some());

        // The next load clears the error
        state.begin_load(c1);
        assert!(state.error().is_none());
    }
}
