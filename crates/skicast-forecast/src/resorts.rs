//! The resort universe and its canonical display order.

use crate::types::ResortId;

/// Every resort the forecast source knows, in canonical order.
pub const SKI_RESORTS: &[&str] = &[
    "Apex",
    "Mt-Baldy-Ski-Area",
    "Big-White",
    "CrystalResort",
    "Cypress-Mountain",
    "Fairmont-Hot-Springs",
    "Fernie",
    "Grouse-Mountain",
    "Harper-Mountain",
    "Ski-Smithers",
    "Kicking-Horse",
    "Kimberley",
    "Manning-Park-Resort",
    "MountCain",
    "Mount-Timothy-Ski-Area",
    "Mount-Washington",
    "Mount-Seymour",
    "Murray-Ridge",
    "Panorama",
    "PowderKing",
    "Purden",
    "Red-Mountain",
    "Revelstoke",
    "Salmo",
    "HemlockResort",
    "ShamesMountain",
    "Silver-Star",
    "Summit-Lake-Ski-and-Snowboard-Area",
    "Sun-Peaks",
    "Tabor-Mountain",
    "Troll-Resort",
    "Whistler-Blackcomb",
    "Whitewater",
    "Lake-Louise",
    "Sunshine",
    "Banff-Norquay",
    "Marmot-Basin",
    "Nakiska",
    "Castle-Mountain-Resort",
    "Fortress-Mountain",
    "Pass-Powderkeg",
    "Mount-Baker",
    "Crystal-Mountain",
];

/// Selected on first launch.
pub const DEFAULT_SELECTED_RESORTS: &[&str] = &["Cypress-Mountain", "Mount-Seymour", "Grouse-Mountain"];

/// An ordered resort universe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResortCatalog {
    resorts: Vec<ResortId>,
}

impl Default for ResortCatalog {
    fn default() -> Self {
        Self::new(SKI_RESORTS.iter().copied().map(ResortId::from))
    }
}

impl ResortCatalog {
    /// Build a catalog, dropping duplicates but keeping first-seen order.
    pub fn new(resorts: impl IntoIterator<Item = ResortId>) -> Self {
        let mut unique: Vec<ResortId> = Vec::new();
        for id in resorts {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self { resorts: unique }
    }

    pub fn resorts(&self) -> &[ResortId] {
        &self.resorts
    }

    pub fn contains(&self, id: &ResortId) -> bool {
        self.resorts.contains(id)
    }

    pub fn position(&self, id: &ResortId) -> Option<usize> {
        self.resorts.iter().position(|r| r == id)
    }

    pub fn len(&self) -> usize {
        self.resorts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resorts.is_empty()
    }

    pub fn default_selection(&self) -> Vec<ResortId> {
        DEFAULT_SELECTED_RESORTS
            .iter()
            .copied()
            .map(ResortId::from)
            .filter(|id| self.contains(id))
            .collect()
    }

    /// Resorts whose display name contains `term`, case-insensitively.
    /// An empty term matches everything.
    pub fn search(&self, term: &str) -> Vec<ResortId> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.resorts.clone();
        }
        self.resorts
            .iter()
            .filter(|id| id.display_name().to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog = ResortCatalog::default();
        assert_eq!(catalog.len(), SKI_RESORTS.len());
        assert_eq!(catalog.resorts()[0].as_str(), "Apex");
        assert_eq!(catalog.default_selection().len(), 3);
    }

    #[test]
    fn test_new_drops_duplicates() {
        let catalog = ResortCatalog::new(["A", "B", "A", "C"].map(ResortId::from));
        let ids: Vec<&str> = catalog.resorts().iter().map(ResortId::as_str).collect();
        assert_eq!(ids, ["A", "B", "C"]);
    }

    #[test]
    fn test_search_matches_display_name() {
        let catalog = ResortCatalog::default();
        let hits = catalog.search("sun");
        assert!(hits.contains(&"Sun-Peaks".into()));
        assert!(hits.contains(&"Sunshine".into()));

        let hits = catalog.search("sun p");
        assert_eq!(hits, vec![ResortId::from("Sun-Peaks")]);

        let hits = catalog.search("MOUNT SEY");
        assert_eq!(hits, vec![ResortId::from("Mount-Seymour")]);
    }

    #[test]
    fn test_empty_search_returns_all() {
        let catalog = ResortCatalog::default();
        assert_eq!(catalog.search("   ").len(), catalog.len());
    }
}
