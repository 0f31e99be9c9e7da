//! Weighted scoring of tech levels.
//!
//! The [`ScoringEngine`] turns a player's level vector into a point total
//! using a named [`WeightTable`]. The table name selects the [`Scheme`]:
//!
//! | Table    | Scheme |
//! |----------|--------|
//! | `200302` | [`Scheme::Legacy200302`] |
//! | `201206` | [`Scheme::Capped201206`] |
//! | `210918` | [`Scheme::Capped210918`] |
//! | other    | [`Scheme::Flat`] |
//!
//! # Flat scheme
//!
//! Every weighted tech with a non-zero level adds its points.
//!
//! # Capped schemes
//!
//! Bonus techs add their raw points; mining, support, weapon and shield
//! modules are ranked by points and credited under the rules in [`capped`].
//! The float sum is rounded half up.
//!
//! # Lookup failures
//!
//! A level beyond the length of its points list scores the whole player as 0.
//! This is never an error.

pub mod capped;

use std::sync::Arc;

use crate::catalog::{Category, TechCatalog, TechRef};
use crate::player::{derived_level, Player};
use crate::weights::{WeightSet, WeightTable};

/// Table used when a command names none.
pub const DEFAULT_TABLE: &str = "210918";

/// Bonus keys credited at raw value by the capped schemes.
const BONUS_TECHS: [&str; 5] = ["relics", "entrust", "dispatch", "dart", "relicdrone"];

/// Fixed points for dart under [`Scheme::Capped210918`].
const DART_BONUS: i64 = 50;

// =============================================================================
// Scheme
// =============================================================================

/// Scoring strategy selected by table name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain sum of weighted levels.
    Flat,
    /// Capped categories, no battery/laser pairing, strongest-shield rule.
    Legacy200302,
    /// Capped categories; dart is a bonus and not a weapon.
    Capped201206,
    /// Capped categories; dart is a weapon and its bonus is fixed.
    Capped210918,
}

impl Scheme {
    /// Scheme applied to a table name.
    #[must_use]
    pub fn for_table(name: &str) -> Self {
        match name {
            "200302" => Self::Legacy200302,
            "201206" => Self::Capped201206,
            "210918" => Self::Capped210918,
            _ => Self::Flat,
        }
    }

    fn weapons_include_dart(self) -> bool {
        matches!(self, Self::Capped210918)
    }

    fn pairs_battery_laser(self) -> bool {
        !matches!(self, Self::Legacy200302)
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// One credited tech in a breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownEntry {
    /// Tech key.
    pub tech: String,
    /// Points after the category factor.
    pub points: f64,
}

/// Credited techs per section, in report order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Breakdown {
    /// Bonus techs at raw value.
    pub bonus: Vec<BreakdownEntry>,
    /// Mining modules.
    pub mining: Vec<BreakdownEntry>,
    /// Support modules credited at 100% or 75%.
    pub support: Vec<BreakdownEntry>,
    /// Support modules credited at 25%.
    pub support_overflow: Vec<BreakdownEntry>,
    /// Weapon modules.
    pub weapons: Vec<BreakdownEntry>,
    /// Shield modules.
    pub shields: Vec<BreakdownEntry>,
}

impl Breakdown {
    /// Sections with their short labels, in report order.
    #[must_use]
    pub fn sections(&self) -> [(&'static str, &[BreakdownEntry]); 6] {
        [
            ("", &self.bonus),
            ("mi", &self.mining),
            ("su", &self.support),
            ("su", &self.support_overflow),
            ("we", &self.weapons),
            ("sh", &self.shields),
        ]
    }

    /// Sum over every section.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.sections()
            .iter()
            .flat_map(|(_, entries)| entries.iter())
            .map(|entry| entry.points)
            .sum()
    }
}

/// Result of scoring one player.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    /// Rounded total.
    pub total: i64,
    /// Credited techs, when detail was requested and the lookup succeeded.
    pub breakdown: Option<Breakdown>,
}

/// A level beyond the points list.
struct LevelOutOfTable;

// =============================================================================
// Engine
// =============================================================================

/// Scores players against the loaded weight tables.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    catalog: Arc<TechCatalog>,
    weights: WeightSet,
}

impl ScoringEngine {
    /// Creates an engine over a catalog and a set of tables.
    #[must_use]
    pub fn new(catalog: Arc<TechCatalog>, weights: WeightSet) -> Self {
        tracing::info!(tables = weights.len(), "scoring engine ready");
        Self { catalog, weights }
    }

    /// Loaded tables.
    #[must_use]
    pub fn weights(&self) -> &WeightSet {
        &self.weights
    }

    /// Scores a player. `None` when no table has that name.
    #[must_use]
    pub fn score(&self, player: &Player, table_name: &str, detail: bool) -> Option<ScoreOutcome> {
        let table = self.weights.get(table_name)?;
        let scheme = Scheme::for_table(table_name);

        let outcome = match scheme {
            Scheme::Flat => self.flat(player, table).map(|total| ScoreOutcome {
                total,
                breakdown: None,
            }),
            _ => self.capped(player, table, scheme).map(|breakdown| ScoreOutcome {
                total: round_half_up(breakdown.sum()),
                breakdown: detail.then_some(breakdown),
            }),
        };

        Some(outcome.unwrap_or_else(|LevelOutOfTable| ScoreOutcome {
            total: 0,
            breakdown: None,
        }))
    }

    fn flat(&self, player: &Player, table: &WeightTable) -> Result<i64, LevelOutOfTable> {
        let mut total = 0;
        for id in self.catalog.ids() {
            let key = self.catalog.key_of(TechRef::Slot(*id));
            total += weighted(table, key, player.level(*id))?.unwrap_or(0);
        }
        Ok(total)
    }

    fn capped(
        &self,
        player: &Player,
        table: &WeightTable,
        scheme: Scheme,
    ) -> Result<Breakdown, LevelOutOfTable> {
        let mut breakdown = Breakdown::default();

        for key in BONUS_TECHS {
            let level = self.level_of(player, key);
            if let Some(points) = weighted(table, key, level)? {
                let points = if key == "dart" && scheme == Scheme::Capped210918 {
                    DART_BONUS
                } else {
                    points
                };
                #[allow(clippy::cast_precision_loss)]
                let points = points as f64;
                breakdown.bonus.push(BreakdownEntry {
                    tech: key.to_string(),
                    points,
                });
            }
        }

        let mining = self.ranked(player, table, Category::Mining, &[])?;
        breakdown.mining = capped::mining(&mining, self.level_of(player, "miner"));

        let support = self.ranked(player, table, Category::Support, &[])?;
        let (full, overflow) = capped::support(&support, self.level_of(player, "battleship"));
        breakdown.support = full;
        breakdown.support_overflow = overflow;

        let excluded: &[&str] = if scheme.weapons_include_dart() {
            &[]
        } else {
            &["dart"]
        };
        let weapons = self.ranked(player, table, Category::Weapon, excluded)?;
        breakdown.weapons = capped::weapons(&weapons, scheme.pairs_battery_laser());

        let shields = self.ranked(player, table, Category::Shield, &[])?;
        breakdown.shields = if scheme == Scheme::Legacy200302 {
            capped::shields_legacy(&shields)
        } else {
            capped::shields(&shields)
        };

        Ok(breakdown)
    }

    /// Weighted techs of a category with positive points, sorted descending.
    fn ranked(
        &self,
        player: &Player,
        table: &WeightTable,
        category: Category,
        excluded: &[&str],
    ) -> Result<Vec<(&str, i64)>, LevelOutOfTable> {
        let mut ranked = Vec::new();
        for id in self.catalog.range_of(category) {
            let key = self.catalog.key_of(TechRef::Slot(*id));
            if excluded.contains(&key) {
                continue;
            }
            if let Some(points) = weighted(table, key, player.level(*id))? {
                if points > 0 {
                    ranked.push((key, points));
                }
            }
        }
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(ranked)
    }

    fn level_of(&self, player: &Player, key: &str) -> u32 {
        match self.catalog.resolve(key) {
            Some(TechRef::Slot(id)) => player.level(id),
            Some(TechRef::Derived(derived)) => derived_level(&self.catalog, player, derived),
            None => 0,
        }
    }
}

/// Points of a weighted tech at a level; `None` for level 0 or unweighted techs.
fn weighted(table: &WeightTable, key: &str, level: u32) -> Result<Option<i64>, LevelOutOfTable> {
    if level == 0 || !table.contains(key) {
        return Ok(None);
    }
    table.points(key, level).map(Some).ok_or(LevelOutOfTable)
}

#[allow(clippy::cast_possible_truncation)]
fn round_half_up(sum: f64) -> i64 {
    (sum + 0.5).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerStore;
    use crate::weights::WeightTable;

    fn engine(tables: Vec<WeightTable>) -> ScoringEngine {
        let mut set = WeightSet::new();
        for table in tables {
            set.insert(table);
        }
        ScoringEngine::new(Arc::new(TechCatalog::standard()), set)
    }

    fn player(levels: &[(&str, u32)]) -> Player {
        let mut store = PlayerStore::new(Arc::new(TechCatalog::standard()));
        store.ensure("p");
        for (tech, level) in levels {
            assert!(store.tech_set("p", tech, *level));
        }
        store.get("p").cloned().unwrap()
    }

    #[test]
    fn test_scheme_names() {
        assert_eq!(Scheme::for_table("200302"), Scheme::Legacy200302);
        assert_eq!(Scheme::for_table("201206"), Scheme::Capped201206);
        assert_eq!(Scheme::for_table("210918"), Scheme::Capped210918);
        assert_eq!(Scheme::for_table("base"), Scheme::Flat);
    }

    #[test]
    fn test_unknown_table() {
        let engine = engine(vec![]);
        assert!(engine.score(&player(&[]), "base", false).is_none());
    }

    #[test]
    fn test_flat_levels() {
        let engine = engine(vec![WeightTable::new("base").with("battleship", &[1, 2, 5])]);
        let outcome = engine.score(&player(&[("bs", 3)]), "base", true).unwrap();
        assert_eq!(outcome.total, 5);
        assert!(outcome.breakdown.is_none());

        let overflow = engine.score(&player(&[("bs", 4)]), "base", false).unwrap();
        assert_eq!(overflow.total, 0);
    }

    #[test]
    fn test_flat_ignores_unweighted() {
        let engine = engine(vec![WeightTable::new("base")
            .with("battleship", &[1, 2, 5])
            .with("miner", &[3, 4])]);
        let outcome = engine
            .score(&player(&[("bs", 1), ("miner", 2), ("rs", 9)]), "base", false)
            .unwrap();
        assert_eq!(outcome.total, 5);
    }

    #[test]
    fn test_capped_mining_example() {
        let table = WeightTable::new("201206")
            .with("miningboost", &[10])
            .with("enrich", &[8])
            .with("crunch", &[6])
            .with("genesis", &[4])
            .with("miningdrone", &[2]);
        let engine = engine(vec![table]);
        let p = player(&[
            ("miner", 4),
            ("miningboost", 1),
            ("enrich", 1),
            ("crunch", 1),
            ("genesis", 1),
            ("miningdrone", 1),
        ]);
        let outcome = engine.score(&p, "201206", true).unwrap();
        assert_eq!(outcome.total, 27);
        let breakdown = outcome.breakdown.unwrap();
        assert_eq!(breakdown.mining.len(), 5);
        assert_eq!(breakdown.mining[0].tech, "miningboost");
    }

    #[test]
    fn test_dart_rules() {
        let table = |name: &str| {
            WeightTable::new(name)
                .with("dart", &[7])
                .with("barrage", &[10])
        };
        let engine = engine(vec![table("201206"), table("210918")]);
        let p = player(&[("dart", 1), ("barrage", 1)]);

        // bonus 7, weapons: barrage only
        assert_eq!(engine.score(&p, "201206", false).unwrap().total, 17);
        // bonus 50, weapons: barrage then dart at 75%
        assert_eq!(
            engine.score(&p, "210918", false).unwrap().total,
            50 + 10 + 5
        );
    }

    #[test]
    fn test_relics_bonus() {
        let engine = engine(vec![WeightTable::new("210918").with("relics", &[1, 2, 3])]);
        let p = player(&[("cbe", 6), ("ts", 3)]);
        let outcome = engine.score(&p, "210918", true).unwrap();
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.breakdown.unwrap().bonus[0].tech, "relics");
    }

    #[test]
    fn test_capped_overflow_scores_zero() {
        let engine = engine(vec![WeightTable::new("210918").with("entrust", &[1])]);
        let outcome = engine.score(&player(&[("entrust", 2)]), "210918", true).unwrap();
        assert_eq!(outcome.total, 0);
        assert!(outcome.breakdown.is_none());
    }

    #[test]
    fn test_rounding_half_up() {
        let table = WeightTable::new("210918")
            .with("battleship", &[0, 0])
            .with("emp", &[3])
            .with("teleport", &[2])
            .with("unity", &[1]);
        let engine = engine(vec![table]);
        // bs 2: emp full, teleport 75%, unity 25% -> 3 + 1.5 + 0.25
        let p = player(&[("bs", 2), ("emp", 1), ("tp", 1), ("unity", 1)]);
        let outcome = engine.score(&p, "210918", true).unwrap();
        assert_eq!(outcome.total, 5);
        let breakdown = outcome.breakdown.unwrap();
        assert_eq!(breakdown.support.len(), 2);
        assert_eq!(breakdown.support_overflow.len(), 1);
    }

    #[test]
    fn test_legacy_weapons_unpaired() {
        let table = WeightTable::new("200302")
            .with("battery", &[10])
            .with("laser", &[8]);
        let engine = engine(vec![table]);
        let p = player(&[("battery", 1), ("laser", 1)]);
        assert_eq!(engine.score(&p, "200302", false).unwrap().total, 16);
    }
}
