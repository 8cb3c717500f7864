//! CropCatalog - Known Crops and Memoized Selected-Crop Lookup

use parking_lot::Mutex;

use crate::domain::crop::{Crop, CropId};

#[derive(Debug, Clone)]
struct LookupMemo {
    crop_id: Option<CropId>,
    generation: u64,
    result: Option<Crop>,
}

/// The crop list with a one-entry lookup memo
///
/// The memo is keyed by the requested id and the list generation, which bumps
/// on every replacement of the list.
#[derive(Debug, Default)]
pub struct CropCatalog {
    crops: Vec<Crop>,
    generation: u64,
    memo: Mutex<Option<LookupMemo>>,
}

impl CropCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the crop list
    pub fn set_crops(&mut self, crops: Vec<Crop>) {
        self.crops = crops;
        self.generation += 1;
    }

    pub fn crops(&self) -> &[Crop] {
        &self.crops
    }

    /// The crop record for `crop_id`, memoized on (id, list generation)
    pub fn selected(&self, crop_id: Option<&CropId>) -> Option<Crop> {
        let mut memo = self.memo.lock();
        if let Some(hit) = memo
            .as_ref()
            .filter(|m| m.crop_id.as_ref() == crop_id && m.generation == self.generation)
        {
            return hit.result.clone();
        }

        let result =
            crop_id.and_then(|id| self.crops.iter().find(|c| &c.crop_id == id).cloned());
        *memo = Some(LookupMemo {
            crop_id: crop_id.cloned(),
            generation: self.generation,
            result: result.clone(),
        });
        result
    }

    pub fn clear(&mut self) {
        self.crops.clear();
        self.generation += 1;
        *self.memo.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crop::CropStatus;

    #[test]
    fn test_selected_lookup() {
        let mut catalog = CropCatalog::new();
        catalog.set_crops(vec![
            Crop::new("c1", "Corn", CropStatus::Growing),
            Crop::new("c2", "Wheat", CropStatus::Planted),
        ]);

        let c2 = CropId::from("c2");
        assert_eq!(catalog.selected(Some(&c2)).map(|c| c.name), Some("Wheat".to_string()));
        assert!(catalog.selected(Some(&CropId::from("zz"))).is_none());
        assert!(catalog.selected(None).is_none());
    }

    #[test]
    fn test_memo_invalidated_by_same_length_replacement() {
        let mut catalog = CropCatalog::new();
        let c1 = CropId::from("c1");
        catalog.set_crops(vec![Crop::new("c1", "Corn", CropStatus::Growing)]);
        assert_eq!(catalog.selected(Some(&c1)).map(|c| c.name), Some("Corn".to_string()));

        catalog.set_crops(vec![Crop::new("c1", "Sweet Corn", CropStatus::Harvested)]);
        assert_eq!(
            catalog.selected(Some(&c1)).map(|c| c.name),
            Some("Sweet Corn".to_string())
        );
    }

    #[test]
    fn test_clear_drops_list_and_memo() {
        let mut catalog = CropCatalog::new();
        let c1 = CropId::from("c1");
        catalog.set_crops(vec![Crop::new("c1", "Corn", CropStatus::Growing)]);
        assert!(catalog.selected(Some(&c1)).is_some());

        catalog.clear();
        assert!(catalog.crops().is_empty());
        assert!(catalog.selected(Some(&c1)).is_none());
    }
}
