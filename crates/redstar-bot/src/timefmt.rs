//! Durations, timestamps and UTC offsets as users type and read them.
//!
//! # Duration words
//!
//! | Word      | Meaning |
//! |-----------|---------|
//! | `3d`      | three days |
//! | `4h`      | four hours |
//! | `20m`     | twenty minutes |
//! | `1d2h30m` | any sequence of the above |
//! | `1:02:30` | days, hours, minutes |
//! | `2:30`    | hours, minutes |
//!
//! Several words add up. Parsing stops at the first word that is none of
//! these, keeping what was read so far. Totals that overflow are `None`.
//!
//! # Offsets
//!
//! Timezones are fixed UTC offsets: `UTC+10`, `GMT-3:30`, `+0530`, `-4`.
//!
//! ```
//! use redstar_bot::timefmt::{compact, parse_duration, parse_offset};
//!
//! let words = ["1d2h".to_string(), "30m".to_string()];
//! assert_eq!(parse_duration(&words), Some(26 * 3600 + 30 * 60));
//! assert_eq!(compact(26 * 3600 + 30 * 60, false), "1d 2h 30m");
//! assert_eq!(parse_offset("UTC+5:30").map(|o| o.local_minus_utc()), Some(19_800));
//! ```

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 3600;
const DAY: i64 = 86_400;

// =============================================================================
// Durations
// =============================================================================

/// Sums duration words, stopping at the first unreadable one.
///
/// `None` when the total does not fit in an `i64`.
#[must_use]
pub fn parse_duration(words: &[String]) -> Option<i64> {
    words
        .iter()
        .map_while(|word| word_seconds(word))
        .try_fold(0_i64, |total, word| total.checked_add(word?))
}

/// Seconds of a word: `None` when unreadable, `Some(None)` on overflow.
fn word_seconds(word: &str) -> Option<Option<i64>> {
    if word.contains(':') {
        return clock_parts(word).map(|parts| clock_seconds(&parts));
    }
    unit_parts(word).map(|parts| unit_seconds(&parts))
}

/// Seconds in one duration word; unreadable or overflowing words are `None`.
#[must_use]
pub fn parse_duration_word(word: &str) -> Option<i64> {
    word_seconds(word).flatten()
}

/// `(digits, unit seconds)` pairs of a `1d2h3m` word.
fn unit_parts(word: &str) -> Option<Vec<(&str, i64)>> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, c) in word.char_indices() {
        if c.is_ascii_digit() {
            continue;
        }
        let unit = match c.to_ascii_lowercase() {
            'd' => DAY,
            'h' => HOUR,
            'm' => MINUTE,
            _ => return None,
        };
        if i == start {
            return None;
        }
        parts.push((&word[start..i], unit));
        start = i + c.len_utf8();
    }
    (start == word.len() && !parts.is_empty()).then_some(parts)
}

fn unit_seconds(parts: &[(&str, i64)]) -> Option<i64> {
    parts.iter().try_fold(0_i64, |total, (digits, unit)| {
        let amount = digits.parse::<i64>().ok()?;
        total.checked_add(amount.checked_mul(*unit)?)
    })
}

/// Fields of an `h:m` or `d:h:m` word, each plain digits.
fn clock_parts(word: &str) -> Option<Vec<&str>> {
    let parts: Vec<&str> = word.split(':').collect();
    let digits = |part: &&str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    ((2..=3).contains(&parts.len()) && parts.iter().all(digits)).then_some(parts)
}

fn clock_seconds(parts: &[&str]) -> Option<i64> {
    let units: &[i64] = if parts.len() == 3 { &[DAY, HOUR, MINUTE] } else { &[HOUR, MINUTE] };
    parts.iter().zip(units).try_fold(0_i64, |total, (digits, unit)| {
        let amount = digits.parse::<i64>().ok()?;
        total.checked_add(amount.checked_mul(*unit)?)
    })
}

/// Splits seconds into whole days and remaining seconds; negatives are zero.
#[must_use]
pub fn days_and_seconds(seconds: i64) -> (i64, i64) {
    if seconds <= 0 {
        return (0, 0);
    }
    (seconds / DAY, seconds % DAY)
}

/// Compact rendering: `2d 3h 5m`, or `3h 5m 7s` with seconds.
///
/// Minutes always follow a non-zero remainder; zero renders as empty.
#[must_use]
pub fn compact(seconds: i64, show_seconds: bool) -> String {
    let (days, mut rest) = days_and_seconds(seconds);
    let mut parts = Vec::new();

    if days >= 1 {
        parts.push(format!("{days}d"));
    }
    if rest >= 1 {
        let hours = rest / HOUR;
        if hours >= 1 {
            parts.push(format!("{hours}h"));
            rest -= hours * HOUR;
        }
        let minutes = rest / MINUTE;
        if show_seconds {
            if minutes >= 1 {
                parts.push(format!("{minutes}m"));
                rest -= minutes * MINUTE;
            }
            parts.push(format!("{rest}s"));
        } else {
            parts.push(format!("{minutes}m"));
        }
    }

    parts.join(" ")
}

/// Clock rendering: `d:hh:mm` with days, ` h:mm` without.
#[must_use]
pub fn clock(seconds: i64) -> String {
    let (days, rest) = days_and_seconds(seconds);
    let hours = rest / HOUR;
    let minutes = (rest % HOUR) / MINUTE;
    if days > 0 {
        format!("{days}:{hours:02}:{minutes:02}")
    } else {
        format!("{hours:2}:{minutes:02}")
    }
}

/// Away rendering: `1d 2h 5m`, hours only when non-zero.
#[must_use]
pub fn away(seconds: i64) -> String {
    let (days, rest) = days_and_seconds(seconds);
    let mut label = String::new();
    if days >= 1 {
        label.push_str(&format!("{days}d "));
    }
    if rest >= HOUR {
        label.push_str(&format!("{}h ", rest / HOUR));
    }
    label.push_str(&format!("{}m", (rest % HOUR) / MINUTE));
    label
}

// =============================================================================
// Timestamps
// =============================================================================

/// Stored form of a timestamp.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Reads a stored timestamp; empty or malformed values are `None`.
#[must_use]
pub fn parse_timestamp(stored: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(stored.trim())
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

// =============================================================================
// Offsets
// =============================================================================

/// Largest accepted offset from UTC.
const MAX_OFFSET: i32 = 14 * 3600;

/// True when a word starts a `UTC`/`GMT` timezone that may continue in the
/// next word (`GMT -3:30`).
#[must_use]
pub fn is_zone_prefix(word: &str) -> bool {
    let lower = word.to_lowercase();
    lower.starts_with("utc") || lower.starts_with("gmt")
}

/// Parses a fixed UTC offset.
#[must_use]
pub fn parse_offset(text: &str) -> Option<FixedOffset> {
    let lower = text.trim().to_lowercase();
    let rest = lower
        .strip_prefix("utc")
        .or_else(|| lower.strip_prefix("gmt"))
        .map_or(lower.as_str(), str::trim);
    let had_prefix = rest.len() != lower.len();

    if rest.is_empty() {
        return had_prefix.then(|| FixedOffset::east_opt(0)).flatten();
    }

    let (sign, digits) = match rest.as_bytes()[0] {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => return None,
    };

    if !digits.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }

    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
        None if digits.len() == 4 => (digits[..2].parse().ok()?, digits[2..].parse().ok()?),
        None if (1..=2).contains(&digits.len()) => (digits.parse().ok()?, 0),
        None => return None,
    };
    if minutes >= 60 {
        return None;
    }

    let seconds = hours
        .checked_mul(3600)?
        .checked_add(minutes * 60)?
        .checked_mul(sign)?;
    if seconds.abs() > MAX_OFFSET {
        return None;
    }
    FixedOffset::east_opt(seconds)
}

/// Local wall time at an offset, as shown in time lists.
#[must_use]
pub fn local_time(now: DateTime<Utc>, offset: FixedOffset) -> String {
    now.with_timezone(&offset).format("%a %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| (*w).to_string()).collect()
    }

    #[test]
    fn test_duration_words() {
        assert_eq!(parse_duration_word("3d"), Some(3 * DAY));
        assert_eq!(parse_duration_word("4H"), Some(4 * HOUR));
        assert_eq!(parse_duration_word("1d2h3m"), Some(DAY + 2 * HOUR + 3 * MINUTE));
        assert_eq!(parse_duration_word("1:02:03"), Some(DAY + 2 * HOUR + 3 * MINUTE));
        assert_eq!(parse_duration_word("2:30"), Some(2 * HOUR + 30 * MINUTE));
        assert_eq!(parse_duration_word("12"), None);
        assert_eq!(parse_duration_word("h"), None);
        assert_eq!(parse_duration_word("soon"), None);
    }

    #[test]
    fn test_duration_stops_at_unknown_word() {
        assert_eq!(parse_duration(&words(&["2h", "soon", "3h"])), Some(2 * HOUR));
        assert_eq!(parse_duration(&words(&[])), Some(0));
    }

    #[test]
    fn test_duration_overflow_is_none() {
        assert_eq!(parse_duration_word("99999999999999999:0"), None);
        assert_eq!(parse_duration_word("1:99999999999999999:0"), None);
        assert_eq!(parse_duration_word("2000000000000000h"), None);
        assert_eq!(parse_duration_word("99999999999999999999d"), None);
        assert_eq!(parse_duration_word("106751991167300d106751991167300d"), None);
        assert_eq!(parse_duration_word("2:-30"), None);

        // An overflowing word spoils the total rather than ending it
        assert_eq!(parse_duration(&words(&["1h", "2000000000000000h"])), None);
        let big = format!("{}m", i64::MAX / MINUTE);
        assert_eq!(parse_duration(&words(&[big.as_str(), big.as_str()])), None);
        assert_eq!(parse_duration(&words(&["1h", "soon", "2000000000000000h"])), Some(HOUR));
    }

    #[test]
    fn test_compact() {
        assert_eq!(compact(0, false), "");
        assert_eq!(compact(HOUR, false), "1h 0m");
        assert_eq!(compact(DAY, false), "1d");
        assert_eq!(compact(HOUR + 2 * MINUTE + 3, true), "1h 2m 3s");
        assert_eq!(compact(-5, false), "");
    }

    #[test]
    fn test_clock() {
        assert_eq!(clock(HOUR + 5 * MINUTE), " 1:05");
        assert_eq!(clock(DAY + HOUR + 5 * MINUTE), "1:01:05");
    }

    #[test]
    fn test_away() {
        assert_eq!(away(DAY + 2 * HOUR + 5 * MINUTE), "1d 2h 5m");
        assert_eq!(away(5 * MINUTE), "5m");
    }

    #[test]
    fn test_timestamps() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let stored = format_timestamp(at);
        assert_eq!(stored, "2024-03-01T12:30:00Z");
        assert_eq!(parse_timestamp(&stored), Some(at));
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_offsets() {
        let secs = |text: &str| parse_offset(text).map(|o| o.local_minus_utc());
        assert_eq!(secs("UTC+10"), Some(36_000));
        assert_eq!(secs("gmt-3:30"), Some(-12_600));
        assert_eq!(secs("GMT -3:30"), Some(-12_600));
        assert_eq!(secs("+0530"), Some(19_800));
        assert_eq!(secs("-4"), Some(-14_400));
        assert_eq!(secs("UTC"), Some(0));
        assert_eq!(secs("+15"), None);
        assert_eq!(secs("+5:75"), None);
        assert_eq!(secs("Europe/Paris"), None);
        assert_eq!(secs(""), None);
    }

    #[test]
    fn test_offsets_out_of_range() {
        let secs = |text: &str| parse_offset(text).map(|o| o.local_minus_utc());
        assert_eq!(secs("UTC+999999:00"), None);
        assert_eq!(secs("UTC-99999999999:00"), None);
        assert_eq!(secs("GMT+25:00"), None);
        assert_eq!(secs("+14:01"), None);
        assert_eq!(secs("-14:00"), Some(-14 * 3600));
        assert_eq!(secs("+5:-30"), None);
        assert_eq!(secs("+a\u{e9}1"), None);
    }

    proptest! {
        #[test]
        fn prop_duration_words_never_panic(digits in "[0-9]{1,30}", unit in "[dhm:]") {
            let word = if unit == ":" { format!("{digits}:{digits}") } else { format!("{digits}{unit}") };
            let seconds = parse_duration(&[word.clone(), word]);
            prop_assert!(seconds.map_or(true, |s| s >= 0));
        }

        #[test]
        fn prop_offsets_stay_in_range(sign in "[+-]", hours in "[0-9]{1,12}", minutes in "[0-9]{1,3}") {
            if let Some(offset) = parse_offset(&format!("UTC{sign}{hours}:{minutes}")) {
                prop_assert!(offset.local_minus_utc().abs() <= MAX_OFFSET);
            }
        }
    }

    #[test]
    fn test_local_time() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap();
        let offset = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(local_time(at, offset), "Sat 00:30");
    }
}
