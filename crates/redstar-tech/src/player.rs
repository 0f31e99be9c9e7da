//! Per-player tech levels and info fields.
//!
//! A [`PlayerStore`] maps the string form of a platform user ID to a
//! [`Player`]. Each player carries one level per catalog slot plus a free-form
//! string map (`timezone`, `away_until`, `last_tech_update`, ...).
//!
//! # Persistence
//!
//! The store is persisted as a [`PlayerSnapshot`] holding the catalog keys in
//! slot order next to the players. Loading a snapshot written under a different
//! catalog remaps every level by key, drops unknown keys and reports them as
//! orphans. A remapped store is dirty so the caller re-saves it.
//!
//! # Dirty tracking
//!
//! Setters flag the store dirty; lazy creation through [`PlayerStore::ensure`]
//! does not, since an empty record carries no data worth saving.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{TechCatalog, TechId, TechRef};
use crate::derived::DerivedTech;

// =============================================================================
// Player
// =============================================================================

/// One player's levels and info fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Level per catalog slot.
    pub tech: Vec<u32>,
    /// Free-form string fields.
    #[serde(default)]
    pub info: BTreeMap<String, String>,
}

impl Player {
    /// Creates a player with every level at zero.
    #[must_use]
    pub fn blank(slots: usize) -> Self {
        Self {
            tech: vec![0; slots],
            info: BTreeMap::new(),
        }
    }

    /// Level stored at a slot, zero when the slot is out of range.
    #[must_use]
    pub fn level(&self, id: TechId) -> u32 {
        self.tech.get(id.index()).copied().unwrap_or(0)
    }

    /// Info field by name.
    #[must_use]
    pub fn info(&self, key: &str) -> Option<&str> {
        self.info.get(key).map(String::as_str)
    }

    /// True when every level is zero.
    #[must_use]
    pub fn has_no_tech(&self) -> bool {
        self.tech.iter().all(|level| *level == 0)
    }
}

/// Computes a derived value for a player under a catalog.
#[must_use]
pub fn derived_level(catalog: &TechCatalog, player: &Player, derived: DerivedTech) -> u32 {
    let level_of = |key: &str| catalog.slot(key).map_or(0, |id| player.level(id));
    derived.compute(level_of("cargobayextension"), level_of("transport"))
}

// =============================================================================
// Snapshot
// =============================================================================

/// Persisted form of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Catalog keys in slot order at save time.
    pub tech_keys: Vec<String>,
    /// Players by ID.
    pub players: BTreeMap<String, Player>,
}

/// Outcome of loading a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of players loaded.
    pub players: usize,
    /// True when levels were remapped to the current catalog.
    pub remapped: bool,
    /// Keys present in the snapshot but unknown to the catalog, sorted.
    pub orphans: Vec<String>,
}

/// Errors raised by a malformed snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// A player stores more levels than the snapshot has keys.
    #[error("player {player} stores {found} levels but the snapshot names {expected} techs")]
    TooManyLevels {
        /// Offending player ID
        player: String,
        /// Number of keys in the snapshot
        expected: usize,
        /// Number of levels stored
        found: usize,
    },
}

// =============================================================================
// Store
// =============================================================================

/// Mutable collection of players bound to a catalog.
#[derive(Debug, Clone)]
pub struct PlayerStore {
    catalog: Arc<TechCatalog>,
    players: BTreeMap<String, Player>,
    dirty: bool,
}

impl PlayerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(catalog: Arc<TechCatalog>) -> Self {
        Self {
            catalog,
            players: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Catalog the levels are indexed by.
    #[must_use]
    pub fn catalog(&self) -> &Arc<TechCatalog> {
        &self.catalog
    }

    /// Number of players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns true if no player exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Returns true if the player exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    /// Player by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    /// Players in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Player)> {
        self.players.iter().map(|(id, player)| (id.as_str(), player))
    }

    /// Returns the player, creating a blank record if absent.
    pub fn ensure(&mut self, id: &str) -> &mut Player {
        let slots = self.catalog.len();
        self.players
            .entry(id.to_string())
            .or_insert_with(|| Player::blank(slots))
    }

    /// Level of a resolved tech; zero for absent players.
    #[must_use]
    pub fn level(&self, id: &str, tech: TechRef) -> u32 {
        let Some(player) = self.players.get(id) else {
            return 0;
        };
        match tech {
            TechRef::Slot(slot) => player.level(slot),
            TechRef::Derived(derived) => derived_level(&self.catalog, player, derived),
        }
    }

    /// Level of a tech named by key, alias or derived name.
    ///
    /// Unknown names and absent players read as zero.
    #[must_use]
    pub fn tech_get(&self, id: &str, token: &str) -> u32 {
        self.catalog
            .resolve(token)
            .map_or(0, |tech| self.level(id, tech))
    }

    /// Sets a level by token.
    ///
    /// Returns false, without creating the player, when the token does not
    /// name a catalog slot.
    pub fn tech_set(&mut self, id: &str, token: &str, value: u32) -> bool {
        match self.catalog.slot(token) {
            Some(slot) => {
                self.set_level(id, slot, value);
                true
            }
            None => false,
        }
    }

    /// Sets a level by slot, creating the player if needed.
    pub fn set_level(&mut self, id: &str, slot: TechId, value: u32) {
        let player = self.ensure(id);
        if let Some(level) = player.tech.get_mut(slot.index()) {
            *level = value;
        }
        self.dirty = true;
    }

    /// Info field of a player.
    #[must_use]
    pub fn info_get(&self, id: &str, key: &str) -> Option<&str> {
        self.players.get(id).and_then(|player| player.info(key))
    }

    /// Sets an info field, creating the player if needed.
    pub fn info_set(&mut self, id: &str, key: &str, value: impl Into<String>) {
        self.ensure(id).info.insert(key.to_string(), value.into());
        self.dirty = true;
    }

    /// Removes an info field.
    pub fn info_remove(&mut self, id: &str, key: &str) -> Option<String> {
        let removed = self
            .players
            .get_mut(id)
            .and_then(|player| player.info.remove(key));
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// IDs of players whose levels are all zero.
    #[must_use]
    pub fn players_without_tech(&self) -> Vec<String> {
        self.players
            .iter()
            .filter(|(_, player)| player.has_no_tech())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Removes players by ID. Returns how many existed.
    pub fn remove_players(&mut self, ids: &[String]) -> usize {
        let removed = ids
            .iter()
            .filter(|id| self.players.remove(id.as_str()).is_some())
            .count();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// True when the store changed since the last save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag after a successful save.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Captures the persisted form.
    #[must_use]
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            tech_keys: self.catalog.key_list(),
            players: self.players.clone(),
        }
    }

    /// Replaces the contents with a snapshot, remapping levels by key when the
    /// snapshot was written under a different catalog.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::TooManyLevels`] when a player stores more
    /// levels than the snapshot names; the store is left untouched.
    pub fn load(&mut self, snapshot: PlayerSnapshot) -> Result<LoadReport, SnapshotError> {
        let expected = snapshot.tech_keys.len();
        if let Some((player, found)) = snapshot
            .players
            .iter()
            .map(|(id, player)| (id, player.tech.len()))
            .find(|(_, found)| *found > expected)
        {
            return Err(SnapshotError::TooManyLevels {
                player: player.clone(),
                expected,
                found,
            });
        }

        let current: Vec<String> = self.catalog.key_list();
        let slots = current.len();
        let mut report = LoadReport {
            players: snapshot.players.len(),
            ..LoadReport::default()
        };

        if snapshot.tech_keys == current {
            self.players = snapshot
                .players
                .into_iter()
                .map(|(id, mut player)| {
                    player.tech.resize(slots, 0);
                    (id, player)
                })
                .collect();
            self.dirty = false;
            tracing::debug!(players = report.players, "player snapshot loaded");
            return Ok(report);
        }

        let mapping: Vec<Option<TechId>> = snapshot
            .tech_keys
            .iter()
            .map(|key| self.catalog.slot(key))
            .collect();
        let mut orphans = BTreeSet::new();

        self.players = snapshot
            .players
            .into_iter()
            .map(|(id, player)| {
                let mut remapped = Player {
                    tech: vec![0; slots],
                    info: player.info,
                };
                for (position, value) in player.tech.into_iter().enumerate() {
                    match mapping[position] {
                        Some(slot) => remapped.tech[slot.index()] = value,
                        None => {
                            orphans.insert(snapshot.tech_keys[position].clone());
                        }
                    }
                }
                (id, remapped)
            })
            .collect();

        report.remapped = true;
        report.orphans = orphans.into_iter().collect();
        self.dirty = true;

        tracing::info!(
            players = report.players,
            orphans = ?report.orphans,
            "player snapshot remapped to the current tech list"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store() -> PlayerStore {
        PlayerStore::new(Arc::new(TechCatalog::standard()))
    }

    #[test]
    fn test_set_then_get() {
        let mut players = store();
        assert!(players.tech_set("42", "rs", 5));
        assert_eq!(players.tech_get("42", "redstarscanner"), 5);
        assert!(players.is_dirty());
    }

    #[test]
    fn test_unknown_tech_creates_no_player() {
        let mut players = store();
        assert!(!players.tech_set("42", "warpdrive", 3));
        assert!(!players.tech_set("42", "relics", 3));
        assert!(!players.contains("42"));
        assert!(!players.is_dirty());
    }

    #[test]
    fn test_absent_player_reads_zero() {
        let players = store();
        assert_eq!(players.tech_get("7", "bs"), 0);
        assert_eq!(players.info_get("7", "timezone"), None);
    }

    #[test]
    fn test_derived_levels() {
        let mut players = store();
        players.tech_set("1", "cbe", 6);
        players.tech_set("1", "ts", 3);
        assert_eq!(players.tech_get("1", "totalcargo"), 12);
        assert_eq!(players.tech_get("1", "relics"), 3);
    }

    #[test]
    fn test_ensure_does_not_dirty() {
        let mut players = store();
        players.ensure("9");
        assert!(players.contains("9"));
        assert!(!players.is_dirty());
    }

    #[test]
    fn test_info_fields() {
        let mut players = store();
        players.info_set("1", "timezone", "+0200");
        assert_eq!(players.info_get("1", "timezone"), Some("+0200"));
        players.mark_clean();
        assert_eq!(players.info_remove("1", "timezone"), Some("+0200".to_string()));
        assert!(players.is_dirty());
        assert_eq!(players.info_remove("1", "timezone"), None);
    }

    #[test]
    fn test_purge_candidates() {
        let mut players = store();
        players.ensure("1");
        players.tech_set("2", "bs", 1);
        players.info_set("3", "timezone", "+0000");
        assert_eq!(players.players_without_tech(), vec!["1".to_string(), "3".to_string()]);
        assert_eq!(players.remove_players(&players.players_without_tech()), 2);
        assert_eq!(players.len(), 1);
    }

    #[test]
    fn test_snapshot_same_catalog_is_clean() {
        let mut players = store();
        players.tech_set("1", "bs", 4);
        let snapshot = players.snapshot();

        let mut loaded = store();
        let report = loaded.load(snapshot).unwrap();
        assert!(!report.remapped);
        assert!(report.orphans.is_empty());
        assert!(!loaded.is_dirty());
        assert_eq!(loaded.tech_get("1", "bs"), 4);
    }

    #[test]
    fn test_snapshot_remap_by_key() {
        let mut old = BTreeMap::new();
        old.insert(
            "5".to_string(),
            Player {
                tech: vec![3, 7, 2],
                info: BTreeMap::new(),
            },
        );
        let snapshot = PlayerSnapshot {
            tech_keys: vec!["battleship".into(), "oldtech".into(), "transport".into()],
            players: old,
        };

        let mut players = store();
        let report = players.load(snapshot).unwrap();
        assert!(report.remapped);
        assert_eq!(report.orphans, vec!["oldtech".to_string()]);
        assert!(players.is_dirty());
        assert_eq!(players.tech_get("5", "bs"), 3);
        assert_eq!(players.tech_get("5", "ts"), 2);
        assert_eq!(players.get("5").unwrap().tech.len(), 59);
    }

    #[test]
    fn test_snapshot_with_excess_levels_rejected() {
        let mut old = BTreeMap::new();
        old.insert("5".to_string(), Player::blank(3));
        let snapshot = PlayerSnapshot {
            tech_keys: vec!["battleship".into()],
            players: old,
        };
        let mut players = store();
        players.tech_set("1", "bs", 1);
        assert!(matches!(
            players.load(snapshot),
            Err(SnapshotError::TooManyLevels { found: 3, .. })
        ));
        assert_eq!(players.tech_get("1", "bs"), 1);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut players = store();
        players.tech_set("1", "rs", 2);
        let json = serde_json::to_value(players.snapshot()).unwrap();
        assert_eq!(json["tech_keys"][0], "redstarscanner");
        assert_eq!(json["players"]["1"]["tech"][0], 2);
    }

    proptest! {
        #[test]
        fn prop_set_get(slot in 0usize..59, value in 0u32..1000) {
            let mut players = store();
            let key = players.catalog().definition(TechId::new(slot)).key.clone();
            prop_assert!(players.tech_set("p", &key, value));
            prop_assert_eq!(players.tech_get("p", &key), value);
        }

        #[test]
        fn prop_remap_preserves_levels(levels in proptest::collection::vec(0u32..20, 59)) {
            let mut players = store();
            for (slot, level) in levels.iter().enumerate() {
                players.set_level("p", TechId::new(slot), *level);
            }
            let mut snapshot = players.snapshot();
            snapshot.tech_keys.reverse();
            if let Some(player) = snapshot.players.get_mut("p") {
                player.tech.reverse();
            }

            let mut loaded = store();
            let report = loaded.load(snapshot).unwrap();
            prop_assert!(report.remapped);
            prop_assert_eq!(&loaded.get("p").unwrap().tech, &levels);
        }
    }
}
