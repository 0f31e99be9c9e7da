//! Category capping rules shared by the capped schemes.
//!
//! Each function takes the weighted techs of one category, already sorted by
//! points descending, and returns the credited entries. The category's
//! contribution is the sum of the returned points.

use super::BreakdownEntry;

/// Weighted techs of one category: key and raw points, sorted descending.
pub type Ranked<'a> = [(&'a str, i64)];

const MAIN_SHIELDS: [&str; 3] = ["passiveshield", "omegashield", "mirrorshield"];
const AREA_SHIELDS: [&str; 2] = ["areashield", "deltashield"];
const PAIRED_WEAPONS: [&str; 2] = ["battery", "laser"];
const WEAPON_FACTORS: [f64; 3] = [1.0, 0.75, 0.5];

fn entry(key: &str, points: i64, factor: f64) -> BreakdownEntry {
    #[allow(clippy::cast_precision_loss)]
    let points = points as f64 * factor;
    BreakdownEntry {
        tech: key.to_string(),
        points,
    }
}

/// Number of mining modules credited in full for a miner level.
#[must_use]
pub fn mining_slots(miner_level: u32) -> usize {
    if (2..=6).contains(&miner_level) {
        (miner_level - 1) as usize
    } else {
        0
    }
}

/// Mining: the top `mcount` in full, the next `min(mcount, 2*mcount-2)` at
/// half, the rest nothing.
#[must_use]
pub fn mining(ranked: &Ranked<'_>, miner_level: u32) -> Vec<BreakdownEntry> {
    let full = mining_slots(miner_level);
    let half = full.min((2 * full).saturating_sub(2));

    ranked
        .iter()
        .take(full + half)
        .enumerate()
        .map(|(index, (key, points))| {
            let factor = if index < full { 1.0 } else { 0.5 };
            entry(key, *points, factor)
        })
        .collect()
}

/// Support, split into the full/75% pass and the 25% pass.
///
/// Nothing counts unless the battleship level is in 2..=6.
#[must_use]
pub fn support(
    ranked: &Ranked<'_>,
    battleship_level: u32,
) -> (Vec<BreakdownEntry>, Vec<BreakdownEntry>) {
    if !(2..=6).contains(&battleship_level) {
        return (Vec::new(), Vec::new());
    }
    let slots = (battleship_level - 1) as usize;

    let mut primary = Vec::new();
    let mut overflow = Vec::new();
    for (index, (key, points)) in ranked.iter().enumerate() {
        if index < slots {
            primary.push(entry(key, *points, 1.0));
        } else if index < 2 * slots {
            primary.push(entry(key, *points, 0.75));
        } else {
            overflow.push(entry(key, *points, 0.25));
        }
    }
    (primary, overflow)
}

/// Weapons: the top three at 100/75/50%.
///
/// With `pair_battery_laser` only the first of battery and laser is kept.
#[must_use]
pub fn weapons(ranked: &Ranked<'_>, pair_battery_laser: bool) -> Vec<BreakdownEntry> {
    let mut seen_pair = false;
    ranked
        .iter()
        .filter(|(key, _)| {
            if !pair_battery_laser || !PAIRED_WEAPONS.contains(key) {
                return true;
            }
            !std::mem::replace(&mut seen_pair, true)
        })
        .zip(WEAPON_FACTORS)
        .map(|((key, points), factor)| entry(key, *points, factor))
        .collect()
}

/// Shields: one main shield, the first area/delta in full and later ones at
/// half, blast always. Unclassified shields earn nothing.
#[must_use]
pub fn shields(ranked: &Ranked<'_>) -> Vec<BreakdownEntry> {
    let mut got_main = false;
    let mut got_area = false;
    let mut credited = Vec::new();

    for (key, points) in ranked {
        if MAIN_SHIELDS.contains(key) {
            if !got_main {
                credited.push(entry(key, *points, 1.0));
                got_main = true;
            }
        } else if AREA_SHIELDS.contains(key) {
            let factor = if got_area { 0.5 } else { 1.0 };
            credited.push(entry(key, *points, factor));
            got_area = true;
        } else if *key == "blastshield" {
            credited.push(entry(key, *points, 1.0));
        }
    }
    credited
}

/// Legacy shields: the strongest in full, every other at half.
#[must_use]
pub fn shields_legacy(ranked: &Ranked<'_>) -> Vec<BreakdownEntry> {
    ranked
        .iter()
        .enumerate()
        .map(|(index, (key, points))| entry(key, *points, if index == 0 { 1.0 } else { 0.5 }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(entries: &[BreakdownEntry]) -> f64 {
        entries.iter().map(|e| e.points).sum()
    }

    #[test]
    fn test_mining_half_credit() {
        let ranked = [("a", 10), ("b", 8), ("c", 6), ("d", 4), ("e", 2)];
        let credited = mining(&ranked, 4);
        assert_eq!(credited.len(), 5);
        assert!((sum(&credited) - 27.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mining_without_miner() {
        let ranked = [("a", 10)];
        assert!(mining(&ranked, 1).is_empty());
        assert!(mining(&ranked, 7).is_empty());
    }

    #[test]
    fn test_mining_small_miner_has_no_half_credit() {
        let ranked = [("a", 10), ("b", 8), ("c", 6)];
        // miner 2 and 3: one and two full slots, no half slots
        assert!((sum(&mining(&ranked, 2)) - 10.0).abs() < f64::EPSILON);
        assert!((sum(&mining(&ranked, 3)) - 18.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_support_passes() {
        let ranked = [("a", 8), ("b", 8), ("c", 4), ("d", 4)];
        let (primary, overflow) = support(&ranked, 2);
        // 8 + 0.75 * 8 | 0.25 * (4 + 4)
        assert!((sum(&primary) - 14.0).abs() < f64::EPSILON);
        assert!((sum(&overflow) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_support_needs_battleship() {
        let ranked = [("a", 8)];
        let (primary, overflow) = support(&ranked, 1);
        assert!(primary.is_empty() && overflow.is_empty());
    }

    #[test]
    fn test_weapons_pairing() {
        let ranked = [("laser", 10), ("battery", 9), ("barrage", 8), ("dart", 4)];
        let paired = weapons(&ranked, true);
        let names: Vec<&str> = paired.iter().map(|e| e.tech.as_str()).collect();
        assert_eq!(names, vec!["laser", "barrage", "dart"]);
        assert!((sum(&paired) - 18.0).abs() < f64::EPSILON);

        let unpaired = weapons(&ranked, false);
        assert_eq!(unpaired[1].tech, "battery");
        assert_eq!(unpaired.len(), 3);
    }

    #[test]
    fn test_shields() {
        let ranked = [
            ("omegashield", 10),
            ("passiveshield", 9),
            ("areashield", 8),
            ("deltashield", 6),
            ("blastshield", 2),
        ];
        // 10 + 8 + 3 + 2
        assert!((sum(&shields(&ranked)) - 23.0).abs() < f64::EPSILON);
        // 10 + (9 + 8 + 6 + 2) / 2
        assert!((sum(&shields_legacy(&ranked)) - 22.5).abs() < f64::EPSILON);
    }
}
