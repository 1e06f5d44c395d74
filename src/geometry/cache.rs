// binfronts/src/geometry/cache.rs

use super::aoi::AoiIndex;
use super::window::Window;
use crate::errors::GeometryError;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GeometryKey {
    nrows: usize,
    window: [u64; 4],
}

impl GeometryKey {
    fn new(nrows: usize, window: &Window) -> Self {
        Self {
            nrows,
            window: window.key(),
        }
    }
}

/// AOI indices of a batch run, built once per `(nrows, window)` and shared
/// read-only between granule tasks.
#[derive(Debug, Default)]
pub struct GeometryCache {
    entries: RwLock<HashMap<GeometryKey, Arc<AoiIndex>>>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, nrows: usize, window: &Window) -> Option<Arc<AoiIndex>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&GeometryKey::new(nrows, window)).cloned()
    }

    pub fn get_or_build(&self, nrows: usize, window: &Window) -> Result<Arc<AoiIndex>, GeometryError> {
        if let Some(aoi) = self.get(nrows, window) {
            debug!("AOI cache hit for nrows={} window={}", nrows, window);
            return Ok(aoi);
        }
        // built outside the lock; a concurrent builder may win the insert
        let built = Arc::new(AoiIndex::build(nrows, window)?);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let aoi = entries
            .entry(GeometryKey::new(nrows, window))
            .or_insert(built)
            .clone();
        info!("AOI cache holds {} layouts", entries.len());
        Ok(aoi)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
