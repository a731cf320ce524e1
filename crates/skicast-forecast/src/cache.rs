//! In-memory forecast cache keyed by resort and elevation band.
//!
//! There is no eviction: the resort universe is small and fixed, and the
//! whole cache is dropped whenever the elevation band changes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::{CacheKey, ResortForecast};

#[derive(Debug, Default)]
pub struct ForecastCache {
    entries: RwLock<HashMap<CacheKey, Arc<ResortForecast>>>,
}

impl ForecastCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<ResortForecast>> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Insert or replace the entry for `key`.
    pub fn put(&self, key: CacheKey, forecast: Arc<ResortForecast>) {
        self.entries.write().insert(key, forecast);
    }

    /// Insert only if `still_valid` holds, evaluated under the write lock.
    ///
    /// A writer that checks its token here cannot land after a concurrent
    /// cancel-then-[`clear`](Self::clear) sequence has begun clearing.
    pub fn put_when(
        &self,
        key: CacheKey,
        forecast: Arc<ResortForecast>,
        still_valid: impl FnOnce() -> bool,
    ) -> bool {
        let mut entries = self.entries.write();
        if !still_valid() {
            return false;
        }
        entries.insert(key, forecast);
        true
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        let dropped = entries.len();
        entries.clear();
        tracing::debug!("Forecast cache cleared ({} entries)", dropped);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
