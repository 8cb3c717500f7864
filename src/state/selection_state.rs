//! SelectionState - Selected Crop with Best-Effort Persistence
//!
//! The selection is a single observable value. Writes are last-write-wins and
//! every write notifies subscribers; filtering repeated values is left to the
//! consumer.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::constants::SELECTED_CROP_STORAGE_KEY;
use crate::domain::crop::CropId;
use crate::utils::storage::KeyValueStore;

/// Observable, persisted crop selection
pub struct SelectionStore {
    tx: watch::Sender<Option<CropId>>,
    storage: Arc<dyn KeyValueStore>,
}

impl SelectionStore {
    /// Create the store, restoring the persisted selection if any
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let restored = storage
            .get(SELECTED_CROP_STORAGE_KEY)
            .filter(|id| !id.is_empty())
            .map(CropId::from);
        if let Some(id) = &restored {
            debug!(crop_id = %id, "Restored crop selection");
        }
        let (tx, _) = watch::channel(restored);
        Self { tx, storage }
    }

    /// Set the selection and persist it
    ///
    /// Persistence failures are logged and do not affect the in-memory value.
    pub fn select(&self, crop_id: Option<CropId>) {
        let persisted = match &crop_id {
            Some(id) => self.storage.set(SELECTED_CROP_STORAGE_KEY, id.as_str()),
            None => self.storage.remove(SELECTED_CROP_STORAGE_KEY),
        };
        if let Err(e) = persisted {
            warn!(error = %e, "Failed to persist crop selection");
        }

        debug!(crop_id = ?crop_id.as_ref().map(CropId::as_str), "Crop selected");
        self.tx.send_replace(crop_id);
    }

    /// The current selection
    pub fn current(&self) -> Option<CropId> {
        self.tx.borrow().clone()
    }

    /// Subscribe to selection changes
    ///
    /// The receiver starts with the current value marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<Option<CropId>> {
        self.tx.subscribe()
    }
}
