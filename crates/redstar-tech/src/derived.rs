//! Values computed from other tech levels.
//!
//! `totalcargo` adds the cargo capacity granted by the Cargo Bay Extension
//! level to the capacity of the transport hull. `relics` is a quarter of it,
//! rounded down.

use std::fmt;

/// Cargo granted per Cargo Bay Extension level (index 0 = level 1).
pub const CARGO_BAY_CAPACITY: [u32; 12] = [1, 2, 3, 5, 7, 9, 12, 15, 19, 25, 31, 52];

/// Cargo granted per transport level (index 0 = level 1).
pub const TRANSPORT_CAPACITY: [u32; 6] = [1, 2, 3, 4, 5, 8];

/// A derived tech: resolvable by name, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedTech {
    /// `floor(totalcargo / 4)`
    Relics,
    /// Cargo bay capacity plus transport capacity
    TotalCargo,
}

impl DerivedTech {
    /// Canonical key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Relics => "relics",
            Self::TotalCargo => "totalcargo",
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Relics => "Relics",
            Self::TotalCargo => "Total Cargo",
        }
    }

    /// Matches a lowercase key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "relics" => Some(Self::Relics),
            "totalcargo" => Some(Self::TotalCargo),
            _ => None,
        }
    }

    /// Computes the value from the cargo bay and transport levels.
    ///
    /// Levels outside the tables contribute nothing.
    #[must_use]
    pub fn compute(self, cargo_bay_level: u32, transport_level: u32) -> u32 {
        let total = capacity(&CARGO_BAY_CAPACITY, cargo_bay_level)
            + capacity(&TRANSPORT_CAPACITY, transport_level);
        match self {
            Self::TotalCargo => total,
            Self::Relics => total / 4,
        }
    }
}

impl fmt::Display for DerivedTech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

fn capacity(table: &[u32], level: u32) -> u32 {
    if level == 0 {
        return 0;
    }
    usize::try_from(level - 1)
        .ok()
        .and_then(|index| table.get(index))
        .copied()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cargo_example() {
        assert_eq!(DerivedTech::TotalCargo.compute(6, 3), 12);
        assert_eq!(DerivedTech::Relics.compute(6, 3), 3);
    }

    #[test]
    fn test_zero_levels() {
        assert_eq!(DerivedTech::TotalCargo.compute(0, 0), 0);
        assert_eq!(DerivedTech::TotalCargo.compute(0, 6), 8);
        assert_eq!(DerivedTech::TotalCargo.compute(12, 0), 52);
    }

    #[test]
    fn test_out_of_table_levels_ignored() {
        assert_eq!(DerivedTech::TotalCargo.compute(13, 7), 0);
    }

    #[test]
    fn test_relics_round_down() {
        // 7 + 4 = 11
        assert_eq!(DerivedTech::Relics.compute(5, 4), 2);
    }

    #[test]
    fn test_keys_round_trip() {
        for derived in [DerivedTech::Relics, DerivedTech::TotalCargo] {
            assert_eq!(DerivedTech::from_key(derived.key()), Some(derived));
        }
    }
}
