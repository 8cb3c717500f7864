//! Dashboard Events
//!
//! Notifications published by the crop controller on a broadcast channel.
//! Subscribers that fall behind lose the oldest events; state can always be
//! re-read from the controller.

use crate::domain::crop::CropId;

/// Part of the dashboard aggregate that is loaded independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubLoad {
    Kpis,
    Analytics,
    Events,
    Metrics,
    Comparison,
}

impl SubLoad {
    pub fn label(&self) -> &'static str {
        match self {
            SubLoad::Kpis => "kpis",
            SubLoad::Analytics => "analytics",
            SubLoad::Events => "events",
            SubLoad::Metrics => "metrics",
            SubLoad::Comparison => "comparison",
        }
    }
}

/// Events published to dashboard subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    /// The crop list was (re)loaded
    CropsLoaded { count: usize },

    /// The selected crop changed
    SelectionChanged { crop_id: Option<CropId> },

    /// An aggregate load started
    LoadStarted { crop_id: CropId, seq: u64 },

    /// An aggregate load was applied; `degraded` lists sub-loads that fell back
    DashboardLoaded {
        crop_id: CropId,
        seq: u64,
        degraded: Vec<SubLoad>,
    },

    /// An aggregate load failed as a whole
    LoadFailed {
        crop_id: CropId,
        seq: u64,
        message: String,
    },

    /// A load completed after the selection moved on and was dropped
    LoadDiscarded { crop_id: CropId, seq: u64 },

    /// A device action was accepted by the backend
    ActionExecuted {
        crop_id: CropId,
        action: String,
        ok: bool,
    },

    /// A device action could not be sent
    ActionFailed {
        crop_id: CropId,
        action: String,
        message: String,
    },
}

impl DashboardEvent {
    /// The crop this event concerns, if any
    pub fn crop_id(&self) -> Option<&CropId> {
        match self {
            DashboardEvent::CropsLoaded { .. } => None,
            DashboardEvent::SelectionChanged { crop_id } => crop_id.as_ref(),
            DashboardEvent::LoadStarted { crop_id, .. }
            | DashboardEvent::DashboardLoaded { crop_id, .. }
            | DashboardEvent::LoadFailed { crop_id, .. }
            | DashboardEvent::LoadDiscarded { crop_id, .. }
            | DashboardEvent::ActionExecuted { crop_id, .. }
            | DashboardEvent::ActionFailed { crop_id, .. } => Some(crop_id),
        }
    }

    /// Whether this event ends a load (applied, failed or discarded)
    pub fn is_load_settled(&self) -> bool {
        matches!(
            self,
            DashboardEvent::DashboardLoaded { .. }
                | DashboardEvent::LoadFailed { .. }
                | DashboardEvent::LoadDiscarded { .. }
        )
    }
}
