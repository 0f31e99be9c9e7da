//! Named weight tables.
//!
//! A [`WeightTable`] maps a tech key to its per-level point values, index 0
//! being level 1. Keys are plain strings: besides catalog keys a table may
//! weight derived values (`relics`) or bonus names no catalog defines
//! (`relicdrone`), which simply never score.
//!
//! Tables are loaded once at startup and never change afterwards.
//!
//! # Formats
//!
//! The JSON document is `{"weights": {"<table>": {"<tech>": [points, ...]}}}`.
//!
//! The legacy text format holds line pairs: a comma-separated list of tech
//! keys followed by a comma-separated list of integer points shared by those
//! techs.
//!
//! ```
//! use redstar_tech::WeightTable;
//!
//! let table = WeightTable::from_legacy_text("base", "battery,laser\n1,2,4\nminer\n3,6\n").unwrap();
//! assert_eq!(table.points("laser", 3), Some(4));
//! assert_eq!(table.points("miner", 3), None);
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading weights.
#[derive(Debug, Error)]
pub enum WeightError {
    /// The JSON document is malformed.
    #[error("invalid weights document: {0}")]
    Json(#[from] serde_json::Error),
    /// A legacy tech line has no points line after it.
    #[error("line {line}: tech list without a points line")]
    MissingPoints {
        /// 1-based line number of the tech list
        line: usize,
    },
    /// A legacy points line holds something other than integers.
    #[error("line {line}: {value:?} is not an integer")]
    InvalidPoints {
        /// 1-based line number
        line: usize,
        /// The offending field
        value: String,
    },
}

// =============================================================================
// WeightTable
// =============================================================================

/// Points per level for each weighted tech.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeightTable {
    name: String,
    points: HashMap<String, Vec<i64>>,
}

impl WeightTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: HashMap::new(),
        }
    }

    /// Sets the points of one tech, replacing any previous entry.
    #[must_use]
    pub fn with(mut self, tech: &str, points: &[i64]) -> Self {
        self.points.insert(tech.to_lowercase(), points.to_vec());
        self
    }

    /// Parses the legacy line-pair format.
    ///
    /// # Errors
    ///
    /// Returns [`WeightError`] for a dangling tech line or non-integer points.
    pub fn from_legacy_text(name: impl Into<String>, text: &str) -> Result<Self, WeightError> {
        let mut table = Self::new(name);
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        while let Some((tech_line, techs)) = lines.next() {
            let Some((points_line, points)) = lines.next() else {
                return Err(WeightError::MissingPoints {
                    line: tech_line + 1,
                });
            };

            let points = points
                .split(',')
                .map(|field| {
                    field
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| WeightError::InvalidPoints {
                            line: points_line + 1,
                            value: field.to_string(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            for tech in techs.split(',') {
                table
                    .points
                    .insert(tech.trim().to_lowercase(), points.clone());
            }
        }

        Ok(table)
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when the table weights this tech.
    #[must_use]
    pub fn contains(&self, tech: &str) -> bool {
        self.points.contains_key(tech)
    }

    /// All points of a tech.
    #[must_use]
    pub fn levels(&self, tech: &str) -> Option<&[i64]> {
        self.points.get(tech).map(Vec::as_slice)
    }

    /// Points for a tech at a level (level 1 is the first entry).
    ///
    /// `None` when the tech is unweighted, the level is zero, or the level is
    /// beyond the table.
    #[must_use]
    pub fn points(&self, tech: &str, level: u32) -> Option<i64> {
        let index = usize::try_from(level.checked_sub(1)?).ok()?;
        self.points.get(tech)?.get(index).copied()
    }

    /// Number of weighted techs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if nothing is weighted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// =============================================================================
// WeightSet
// =============================================================================

#[derive(Deserialize)]
struct WeightsDocument {
    #[serde(default)]
    weights: BTreeMap<String, HashMap<String, Vec<i64>>>,
}

/// All weight tables by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeightSet {
    tables: BTreeMap<String, WeightTable>,
}

impl WeightSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`WeightError::Json`] when the document is malformed.
    pub fn from_json_str(json: &str) -> Result<Self, WeightError> {
        let document: WeightsDocument = serde_json::from_str(json)?;
        Ok(Self::from_value_map(document.weights))
    }

    /// Builds the set from an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`WeightError::Json`] when the value has the wrong shape.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, WeightError> {
        let document: WeightsDocument = serde_json::from_value(value)?;
        Ok(Self::from_value_map(document.weights))
    }

    fn from_value_map(weights: BTreeMap<String, HashMap<String, Vec<i64>>>) -> Self {
        let tables = weights
            .into_iter()
            .map(|(name, points)| {
                let points = points
                    .into_iter()
                    .map(|(tech, levels)| (tech.to_lowercase(), levels))
                    .collect();
                (name.clone(), WeightTable { name, points })
            })
            .collect::<BTreeMap<_, _>>();

        tracing::debug!(tables = tables.len(), "weight tables loaded");
        Self { tables }
    }

    /// Adds or replaces a table.
    pub fn insert(&mut self, table: WeightTable) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Table by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&WeightTable> {
        self.tables.get(name)
    }

    /// True when a table with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if no table is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_document() {
        let set = WeightSet::from_json_str(
            r#"{"weights": {"base": {"Battleship": [1, 2, 5]}, "210918": {"dart": [5]}}}"#,
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["210918", "base"]);
        let base = set.get("base").unwrap();
        assert_eq!(base.points("battleship", 3), Some(5));
        assert_eq!(base.points("battleship", 4), None);
        assert_eq!(base.points("battleship", 0), None);
    }

    #[test]
    fn test_json_without_weights_is_empty() {
        let set = WeightSet::from_json_str("{}").unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_json_error() {
        assert!(matches!(
            WeightSet::from_json_str("{\"weights\": 3}"),
            Err(WeightError::Json(_))
        ));
    }

    #[test]
    fn test_legacy_shared_points() {
        let table =
            WeightTable::from_legacy_text("t", "battery,laser\n1,2,4\n\nminer\n3, 6\n").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.levels("battery"), Some(&[1, 2, 4][..]));
        assert_eq!(table.points("miner", 2), Some(6));
    }

    #[test]
    fn test_legacy_dangling_line() {
        assert!(matches!(
            WeightTable::from_legacy_text("t", "a\n1\nb\n"),
            Err(WeightError::MissingPoints { line: 3 })
        ));
    }

    #[test]
    fn test_legacy_bad_points() {
        assert!(matches!(
            WeightTable::from_legacy_text("t", "a\n1,x\n"),
            Err(WeightError::InvalidPoints { line: 2, .. })
        ));
    }

    #[test]
    fn test_insert_replaces() {
        let mut set = WeightSet::new();
        set.insert(WeightTable::new("x").with("bs", &[1]));
        set.insert(WeightTable::new("x").with("bs", &[2]));
        assert_eq!(set.get("x").unwrap().points("bs", 1), Some(2));
    }
}
