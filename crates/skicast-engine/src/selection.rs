//! Which resorts the user is looking at, and how.

use skicast_forecast::{ResortCatalog, ResortId};

/// Selected resorts, always kept in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    resorts: Vec<ResortId>,
}

impl Selection {
    /// Keep the ids that exist in `catalog`, in catalog order.
    pub fn new(catalog: &ResortCatalog, ids: impl IntoIterator<Item = ResortId>) -> Self {
        let wanted: Vec<ResortId> = ids.into_iter().collect();
        let unknown: Vec<&ResortId> = wanted.iter().filter(|id| !catalog.contains(id)).collect();
        if !unknown.is_empty() {
            tracing::warn!("Ignoring unknown resorts in selection: {:?}", unknown);
        }

        let resorts = catalog
            .resorts()
            .iter()
            .filter(|id| wanted.contains(id))
            .cloned()
            .collect();
        Self { resorts }
    }

    pub fn resorts(&self) -> &[ResortId] {
        &self.resorts
    }

    pub fn contains(&self, id: &ResortId) -> bool {
        self.resorts.contains(id)
    }

    pub fn len(&self) -> usize {
        self.resorts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resorts.is_empty()
    }

    /// Add or remove one resort. Unknown ids are ignored.
    ///
    /// Returns whether the resort is selected afterwards.
    pub fn toggle(&mut self, catalog: &ResortCatalog, id: &ResortId) -> bool {
        if let Some(pos) = self.resorts.iter().position(|r| r == id) {
            self.resorts.remove(pos);
            return false;
        }
        if !catalog.contains(id) {
            return false;
        }
        let mut ids = std::mem::take(&mut self.resorts);
        ids.push(id.clone());
        *self = Self::new(catalog, ids);
        true
    }

    /// Select every resort in `visible` (a search result) on top of the
    /// current selection.
    pub fn select_all(&mut self, catalog: &ResortCatalog, visible: &[ResortId]) {
        let mut ids = std::mem::take(&mut self.resorts);
        ids.extend(visible.iter().cloned());
        *self = Self::new(catalog, ids);
    }

    pub fn clear(&mut self) {
        self.resorts.clear();
    }

    /// Whether every resort in `visible` is selected. False for an empty list.
    pub fn all_selected(&self, visible: &[ResortId]) -> bool {
        !visible.is_empty() && visible.iter().all(|id| self.contains(id))
    }
}
