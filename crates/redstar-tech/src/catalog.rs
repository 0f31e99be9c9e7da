//! Tech catalog: identifiers, display names, aliases and category ranges.
//!
//! The catalog is the single source of truth for which techs exist and in
//! which order their levels are stored. A player's level vector has one slot
//! per catalog entry, indexed by [`TechId`].
//!
//! # Invariants
//!
//! - Identifiers are unique and lowercase
//! - Every alias maps to exactly one identifier and never shadows another key
//! - Each [`Category`] occupies one contiguous run of the ordered list, so the
//!   category ranges partition the catalog with no gaps and no overlaps
//!
//! # Derived techs
//!
//! `relics` and `totalcargo` resolve to [`TechRef::Derived`]. They have no slot
//! in the level vector; readers compute them from other levels (see
//! [`crate::derived`]).
//!
//! # Example
//!
//! ```
//! use redstar_tech::{Category, TechCatalog, TechRef};
//!
//! let catalog = TechCatalog::standard();
//! let rs = catalog.resolve("RS").unwrap();
//! assert_eq!(catalog.key_of(rs), "redstarscanner");
//! assert_eq!(catalog.resolve("redstarscanner"), Some(rs));
//!
//! let mining = catalog.range_of(Category::Mining);
//! assert_eq!(mining.len(), 10);
//! assert!(matches!(catalog.resolve("relics"), Some(TechRef::Derived(_))));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::derived::DerivedTech;

// =============================================================================
// Category
// =============================================================================

/// Category tag of a tech.
///
/// Categories partition the catalog into contiguous ranges, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Category {
    /// Techs outside every scored category (the red star scanner)
    Other = 0,
    /// Ship hulls: transport, miner, battleship
    Ships = 1,
    /// Trade modules
    Trade = 2,
    /// Mining modules
    Mining = 3,
    /// Weapon modules
    Weapon = 4,
    /// Shield modules
    Shield = 5,
    /// Support modules
    Support = 6,
}

impl Category {
    /// Total number of categories.
    pub const COUNT: usize = 7;

    /// All categories in catalog order.
    #[must_use]
    pub const fn all() -> &'static [Category] {
        &[
            Category::Other,
            Category::Ships,
            Category::Trade,
            Category::Mining,
            Category::Weapon,
            Category::Shield,
            Category::Support,
        ]
    }

    /// Index of this category.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name of this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Other => "other",
            Self::Ships => "ships",
            Self::Trade => "trade",
            Self::Mining => "mining",
            Self::Weapon => "weapon",
            Self::Shield => "shield",
            Self::Support => "support",
        }
    }

    /// Recognises a category word, singular or plural, already lowercased.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "other" | "others" => Some(Self::Other),
            "ship" | "ships" => Some(Self::Ships),
            "trade" | "trades" => Some(Self::Trade),
            "mining" => Some(Self::Mining),
            "weapon" | "weapons" => Some(Self::Weapon),
            "shield" | "shields" => Some(Self::Shield),
            "support" | "supports" => Some(Self::Support),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Identifiers
// =============================================================================

/// Position of a tech in the catalog and in every player's level vector.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TechId(usize);

impl TechId {
    /// Creates a `TechId` from a raw slot index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for TechId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TechId({})", self.0)
    }
}

/// A resolved tech reference: either a catalog slot or a derived value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TechRef {
    /// A tech with a slot in the level vector.
    Slot(TechId),
    /// A value computed from other levels.
    Derived(DerivedTech),
}

impl TechRef {
    /// Returns the slot, if this reference has one.
    #[must_use]
    pub const fn slot(self) -> Option<TechId> {
        match self {
            Self::Slot(id) => Some(id),
            Self::Derived(_) => None,
        }
    }
}

// =============================================================================
// Definitions
// =============================================================================

/// Definition of one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechDefinition {
    /// Canonical key, lowercase.
    pub key: String,
    /// Human readable name.
    pub name: String,
    /// Alternative tokens accepted for this tech.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Category tag.
    pub category: Category,
}

impl TechDefinition {
    /// Creates a definition without aliases.
    #[must_use]
    pub fn new(key: &str, name: &str, category: Category) -> Self {
        Self {
            key: key.to_lowercase(),
            name: name.to_string(),
            aliases: Vec::new(),
            category,
        }
    }

    /// Adds aliases to the definition.
    #[must_use]
    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases
            .extend(aliases.iter().map(|alias| alias.to_lowercase()));
        self
    }
}

/// Errors raised while building a catalog from definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Two definitions share a key.
    #[error("duplicate tech key {0:?}")]
    DuplicateKey(String),
    /// An alias is declared twice or collides with a key.
    #[error("alias {alias:?} of {tech:?} is already taken by {taken_by:?}")]
    AliasCollision {
        /// The offending alias
        alias: String,
        /// The tech declaring it
        tech: String,
        /// The tech already owning the token
        taken_by: String,
    },
    /// A key or alias uses a name reserved for derived values.
    #[error("{0:?} is reserved for a derived value")]
    Reserved(String),
    /// A category appears in more than one run.
    #[error("category {0} is not contiguous")]
    SplitCategory(Category),
}

// =============================================================================
// Catalog
// =============================================================================

/// Registry of every tech, in storage order.
#[derive(Debug, Clone)]
pub struct TechCatalog {
    /// Definitions in slot order.
    defs: Vec<TechDefinition>,
    /// Key or alias to slot.
    index: HashMap<String, TechId>,
    /// Slot range per category.
    ranges: [Range<usize>; Category::COUNT],
    /// `ids[i] == TechId(i)`, so ranges can be lent out as slices.
    ids: Vec<TechId>,
}

impl TechCatalog {
    /// Builds a catalog, validating uniqueness and category contiguity.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] for duplicate keys, alias collisions, use of
    /// a derived name, or a category split over several runs.
    pub fn from_definitions(defs: Vec<TechDefinition>) -> Result<Self, CatalogError> {
        let mut index = HashMap::new();

        for (slot, def) in defs.iter().enumerate() {
            if DerivedTech::from_key(&def.key).is_some() {
                return Err(CatalogError::Reserved(def.key.clone()));
            }
            if index.insert(def.key.clone(), TechId(slot)).is_some() {
                return Err(CatalogError::DuplicateKey(def.key.clone()));
            }
        }

        for (slot, def) in defs.iter().enumerate() {
            for alias in &def.aliases {
                if DerivedTech::from_key(alias).is_some() {
                    return Err(CatalogError::Reserved(alias.clone()));
                }
                if let Some(taken) = index.get(alias) {
                    return Err(CatalogError::AliasCollision {
                        alias: alias.clone(),
                        tech: def.key.clone(),
                        taken_by: defs[taken.index()].key.clone(),
                    });
                }
                index.insert(alias.clone(), TechId(slot));
            }
        }

        let ranges = Self::category_ranges(&defs)?;
        let ids = (0..defs.len()).map(TechId).collect();

        tracing::debug!(techs = defs.len(), "tech catalog built");

        Ok(Self {
            defs,
            index,
            ranges,
            ids,
        })
    }

    fn category_ranges(
        defs: &[TechDefinition],
    ) -> Result<[Range<usize>; Category::COUNT], CatalogError> {
        let mut ranges: [Option<Range<usize>>; Category::COUNT] = Default::default();

        let mut start = 0;
        while start < defs.len() {
            let category = defs[start].category;
            let mut end = start + 1;
            while end < defs.len() && defs[end].category == category {
                end += 1;
            }

            let entry = &mut ranges[category.index()];
            if entry.is_some() {
                return Err(CatalogError::SplitCategory(category));
            }
            *entry = Some(start..end);
            start = end;
        }

        Ok(ranges.map(|range| range.unwrap_or(0..0)))
    }

    /// The catalog of the game as currently played.
    #[must_use]
    pub fn standard() -> Self {
        let defs = STANDARD_TECHS
            .iter()
            .map(|(key, name, category, aliases)| {
                TechDefinition::new(key, name, *category).with_aliases(aliases)
            })
            .collect();

        match Self::from_definitions(defs) {
            Ok(catalog) => catalog,
            Err(err) => unreachable!("standard tech table is inconsistent: {err}"),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Returns true if the catalog has no techs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Resolves a key, alias or derived name, ignoring case.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<TechRef> {
        let token = token.to_lowercase();
        self.index
            .get(&token)
            .map(|id| TechRef::Slot(*id))
            .or_else(|| DerivedTech::from_key(&token).map(TechRef::Derived))
    }

    /// Resolves a token to a slot, ignoring derived names.
    #[must_use]
    pub fn slot(&self, token: &str) -> Option<TechId> {
        self.resolve(token).and_then(TechRef::slot)
    }

    /// Canonical key of a reference.
    #[must_use]
    pub fn key_of(&self, tech: TechRef) -> &str {
        match tech {
            TechRef::Slot(id) => &self.defs[id.index()].key,
            TechRef::Derived(derived) => derived.key(),
        }
    }

    /// Display name of a reference.
    #[must_use]
    pub fn name_of(&self, tech: TechRef) -> &str {
        match tech {
            TechRef::Slot(id) => &self.defs[id.index()].name,
            TechRef::Derived(derived) => derived.name(),
        }
    }

    /// Definition stored at a slot.
    #[must_use]
    pub fn definition(&self, id: TechId) -> &TechDefinition {
        &self.defs[id.index()]
    }

    /// Category of a slot.
    #[must_use]
    pub fn category_of(&self, id: TechId) -> Category {
        self.defs[id.index()].category
    }

    /// Ordered slots of a category.
    #[must_use]
    pub fn range_of(&self, category: Category) -> &[TechId] {
        &self.ids[self.ranges[category.index()].clone()]
    }

    /// Slot range of a category.
    #[must_use]
    pub fn slot_range(&self, category: Category) -> Range<usize> {
        self.ranges[category.index()].clone()
    }

    /// True when two consecutive report rows belong to different categories.
    ///
    /// A missing previous row counts as a change; derived values have no
    /// category and always differ from slotted techs.
    #[must_use]
    pub fn is_category_change(&self, previous: Option<TechRef>, current: TechRef) -> bool {
        let category = |tech: TechRef| tech.slot().map(|id| self.category_of(id));
        match previous {
            None => true,
            Some(prev) => category(prev) != category(current),
        }
    }

    /// Recognises a category word, case-insensitively.
    #[must_use]
    pub fn category_named(&self, word: &str) -> Option<Category> {
        Category::from_word(&word.to_lowercase())
    }

    /// All slots in order.
    #[must_use]
    pub fn ids(&self) -> &[TechId] {
        &self.ids
    }

    /// Canonical keys in slot order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.defs.iter().map(|def| def.key.as_str())
    }

    /// Canonical keys in slot order, owned, as stored in snapshots.
    #[must_use]
    pub fn key_list(&self) -> Vec<String> {
        self.defs.iter().map(|def| def.key.clone()).collect()
    }
}

impl Default for TechCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

type StandardEntry = (&'static str, &'static str, Category, &'static [&'static str]);

const STANDARD_TECHS: &[StandardEntry] = &[
    // 0
    ("redstarscanner", "RedStar Scanner", Category::Other, &["rs", "rscanner", "rsscanner", "scanner", "redstar"]),
    // 1 ships
    ("transport", "Transport", Category::Ships, &["ts", "transp"]),
    ("miner", "Miner", Category::Ships, &[]),
    ("battleship", "Battleship", Category::Ships, &["bs"]),
    // 4 trade
    ("cargobayextension", "Cargo Bay Extension", Category::Trade, &["cbe", "cargo", "cargobay"]),
    ("shipmentcomputer", "Shipment Computer", Category::Trade, &["computer", "comp", "shipcomp", "shipcomputer"]),
    ("tradeboost", "Trade Boost", Category::Trade, &["tboost"]),
    ("rush", "Rush", Category::Trade, &[]),
    ("tradeburst", "Trade Burst", Category::Trade, &["burst", "tburst"]),
    ("shipmentdrone", "Shipment Drone", Category::Trade, &["sdrone", "shipdrone"]),
    ("offload", "Offload", Category::Trade, &[]),
    ("shipmentbeam", "Shipment Beam", Category::Trade, &["beam", "sbeam"]),
    ("entrust", "Entrust", Category::Trade, &[]),
    ("dispatch", "Dispatch", Category::Trade, &[]),
    ("recall", "Recall", Category::Trade, &[]),
    // 15 mining
    ("miningboost", "Mining Boost", Category::Mining, &["mboost"]),
    ("hydrogenbayextension", "Hydrogen Bay Extension", Category::Mining, &["hbe", "hydrobay", "hydrogenbay"]),
    ("enrich", "Enrich", Category::Mining, &[]),
    ("remotemining", "Remote Mining", Category::Mining, &["remote"]),
    ("hydrogenupload", "Hydrogen Upload", Category::Mining, &["upload", "hupload", "hydroupload"]),
    ("miningunity", "Mining Unity", Category::Mining, &["munity"]),
    ("crunch", "Crunch", Category::Mining, &[]),
    ("genesis", "Genesis", Category::Mining, &[]),
    ("hydrogenrocket", "Hydrogen Rocket", Category::Mining, &["hrocket", "hydrorocket"]),
    ("miningdrone", "Mining Drone", Category::Mining, &["mdrone", "minedrone"]),
    // 25 weapon
    ("battery", "Battery", Category::Weapon, &["batt"]),
    ("laser", "Laser", Category::Weapon, &[]),
    ("massbattery", "Mass Battery", Category::Weapon, &["mb", "mass", "massbatt"]),
    ("duallaser", "Dual Laser", Category::Weapon, &["dl", "dual"]),
    ("barrage", "Barrage", Category::Weapon, &[]),
    ("dart", "Dart", Category::Weapon, &[]),
    // 31 shield
    ("deltashield", "Delta Shield", Category::Shield, &["delta"]),
    ("passiveshield", "Passive Shield", Category::Shield, &["passive"]),
    ("omegashield", "Omega Shield", Category::Shield, &["omega"]),
    ("mirrorshield", "Mirror Shield", Category::Shield, &["mirror"]),
    ("blastshield", "Blast Shield", Category::Shield, &["blast"]),
    ("areashield", "Area Shield", Category::Shield, &["area"]),
    // 37 support
    ("emp", "EMP", Category::Support, &[]),
    ("teleport", "Teleport", Category::Support, &["tele", "tp"]),
    ("redstarlifeextender", "Red Star Life Extender", Category::Support, &["rse", "rsle", "rsextender"]),
    ("remoterepair", "Remote Repair", Category::Support, &["rr", "repair"]),
    ("timewarp", "Time Warp", Category::Support, &["tw", "warp"]),
    ("unity", "Unity", Category::Support, &[]),
    ("sanctuary", "Sanctuary", Category::Support, &[]),
    ("stealth", "Stealth", Category::Support, &[]),
    ("fortify", "Fortify", Category::Support, &[]),
    ("impulse", "Impulse", Category::Support, &[]),
    ("alpharocket", "Alpha Rocket", Category::Support, &["ar", "arocket", "rocket"]),
    ("salvage", "Salvage", Category::Support, &[]),
    ("suppress", "Suppress", Category::Support, &["suppres"]),
    ("destiny", "Destiny", Category::Support, &[]),
    ("barrier", "Barrier", Category::Support, &[]),
    ("vengeance", "Vengeance", Category::Support, &[]),
    ("deltarocket", "Delta Rocket", Category::Support, &["dr", "drocket"]),
    ("leap", "Leap", Category::Support, &[]),
    ("bond", "Bond", Category::Support, &[]),
    ("alphadrone", "Alpha Drone", Category::Support, &["ad", "drone"]),
    ("suspend", "Suspend", Category::Support, &[]),
    ("omegarocket", "Omega Rocket", Category::Support, &["or"]),
];

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_standard_layout() {
        let catalog = TechCatalog::standard();
        assert_eq!(catalog.len(), 59);
        assert_eq!(catalog.slot_range(Category::Ships), 1..4);
        assert_eq!(catalog.slot_range(Category::Trade), 4..15);
        assert_eq!(catalog.slot_range(Category::Mining), 15..25);
        assert_eq!(catalog.slot_range(Category::Weapon), 25..31);
        assert_eq!(catalog.slot_range(Category::Shield), 31..37);
        assert_eq!(catalog.slot_range(Category::Support), 37..59);
    }

    #[test]
    fn test_ranges_partition_catalog() {
        let catalog = TechCatalog::standard();
        let mut next = 0;
        for category in Category::all() {
            let range = catalog.slot_range(*category);
            assert_eq!(range.start, next, "{category} starts where the previous ended");
            for id in catalog.range_of(*category) {
                assert_eq!(catalog.category_of(*id), *category);
            }
            next = range.end;
        }
        assert_eq!(next, catalog.len());
    }

    #[test]
    fn test_every_alias_matches_its_key() {
        let catalog = TechCatalog::standard();
        for id in catalog.ids() {
            let def = catalog.definition(*id);
            let by_key = catalog.resolve(&def.key);
            assert_eq!(by_key, Some(TechRef::Slot(*id)));
            for alias in &def.aliases {
                assert_eq!(catalog.resolve(alias), by_key, "alias {alias}");
            }
        }
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let catalog = TechCatalog::standard();
        assert_eq!(catalog.resolve("BaTtLeShIp"), catalog.resolve("bs"));
        assert_eq!(catalog.resolve("nonsense"), None);
    }

    #[test]
    fn test_derived_names() {
        let catalog = TechCatalog::standard();
        let relics = catalog.resolve("Relics").unwrap();
        assert_eq!(relics, TechRef::Derived(DerivedTech::Relics));
        assert_eq!(catalog.name_of(relics), "Relics");
        assert_eq!(catalog.slot("totalcargo"), None);
    }

    #[test]
    fn test_category_change() {
        let catalog = TechCatalog::standard();
        let miner = catalog.resolve("miner").unwrap();
        let bs = catalog.resolve("bs").unwrap();
        let cbe = catalog.resolve("cbe").unwrap();
        assert!(catalog.is_category_change(None, miner));
        assert!(!catalog.is_category_change(Some(miner), bs));
        assert!(catalog.is_category_change(Some(bs), cbe));
    }

    #[test]
    fn test_category_words() {
        assert_eq!(Category::from_word("weapons"), Some(Category::Weapon));
        assert_eq!(Category::from_word("mining"), Some(Category::Mining));
        assert_eq!(Category::from_word("bs"), None);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let defs = vec![
            TechDefinition::new("a", "A", Category::Other),
            TechDefinition::new("a", "A again", Category::Other),
        ];
        assert_eq!(
            TechCatalog::from_definitions(defs).unwrap_err(),
            CatalogError::DuplicateKey("a".to_string())
        );
    }

    #[test]
    fn test_alias_collision_rejected() {
        let defs = vec![
            TechDefinition::new("a", "A", Category::Other).with_aliases(&["x"]),
            TechDefinition::new("b", "B", Category::Other).with_aliases(&["x"]),
        ];
        assert!(matches!(
            TechCatalog::from_definitions(defs),
            Err(CatalogError::AliasCollision { .. })
        ));
    }

    #[test]
    fn test_split_category_rejected() {
        let defs = vec![
            TechDefinition::new("a", "A", Category::Mining),
            TechDefinition::new("b", "B", Category::Weapon),
            TechDefinition::new("c", "C", Category::Mining),
        ];
        assert_eq!(
            TechCatalog::from_definitions(defs).unwrap_err(),
            CatalogError::SplitCategory(Category::Mining)
        );
    }

    #[test]
    fn test_reserved_names_rejected() {
        let defs = vec![TechDefinition::new("relics", "Relics", Category::Other)];
        assert!(matches!(
            TechCatalog::from_definitions(defs),
            Err(CatalogError::Reserved(_))
        ));
    }

    #[test]
    fn test_appended_tech_keeps_existing_slots() {
        let standard = TechCatalog::standard();
        let mut defs: Vec<TechDefinition> = standard
            .ids()
            .iter()
            .map(|id| standard.definition(*id).clone())
            .collect();
        defs.push(TechDefinition::new("newtech", "New Tech", Category::Support));

        let grown = TechCatalog::from_definitions(defs).unwrap();
        assert_eq!(grown.len(), 60);
        assert_eq!(grown.slot("bs"), standard.slot("bs"));
        assert_eq!(grown.range_of(Category::Support).len(), 23);
    }

    proptest! {
        #[test]
        fn prop_resolve_ignores_case(slot in 0usize..59, upper in proptest::collection::vec(any::<bool>(), 32)) {
            let catalog = TechCatalog::standard();
            let key = &catalog.definition(TechId::new(slot)).key;
            let mixed: String = key
                .chars()
                .zip(upper.iter().cycle())
                .map(|(c, up)| if *up { c.to_ascii_uppercase() } else { c })
                .collect();
            prop_assert_eq!(catalog.resolve(&mixed), Some(TechRef::Slot(TechId::new(slot))));
        }
    }
}
