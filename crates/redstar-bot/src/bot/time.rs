//! Timezones, away notices and check-in requests.
//!
//! Player info fields used here:
//!
//! | Field          | Content |
//! |----------------|---------|
//! | `timezone`     | offset as typed, e.g. `UTC+10` |
//! | `away_from`    | timestamp |
//! | `away_until`   | timestamp |
//! | `away_msg`     | free text |
//! | `checkin_from` | timestamp |
//! | `checkin_by`   | timestamp |

use chrono::Duration;

use super::BotContext;
use crate::command::{Authorize, Tier};
use crate::directory::MemberId;
use crate::error::CommandError;
use crate::resolver::WhoOptions;
use crate::table::{self, Align, Table};
use crate::timefmt;

/// Longest away notice, in hours.
const MAX_AWAY_HOURS: f64 = 36.0;

const NOT_SELF: &str = "Oh crap. Will only work on self.";

// =============================================================================
// Rows shared with WhiteStar status
// =============================================================================

/// One line of a time list.
pub(super) struct TimeRow {
    pub member: MemberId,
    pub name: String,
    pub time: String,
    pub away: String,
    pub reason: String,
    offset: i32,
}

/// Rows for the members, most eastern offset first.
pub(super) fn time_rows(ctx: &BotContext, who: &[MemberId]) -> Vec<TimeRow> {
    let mut rows: Vec<TimeRow> = who
        .iter()
        .map(|member| {
            let key = member.to_string();
            let offset = ctx
                .players
                .info_get(&key, "timezone")
                .and_then(timefmt::parse_offset);
            let (away, reason) = match away_left(ctx, &key) {
                Some(left) => (
                    timefmt::away(left),
                    ctx.players.info_get(&key, "away_msg").unwrap_or_default().to_string(),
                ),
                None => (String::new(), String::new()),
            };

            TimeRow {
                member: *member,
                name: ctx.member_name(*member),
                time: offset.map_or_else(|| "timeless".to_string(), |offset| timefmt::local_time(ctx.now, offset)),
                away,
                reason,
                offset: offset.map_or(0, |offset| offset.local_minus_utc()),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.offset.cmp(&a.offset));
    rows
}

/// Time list table; the away and reason columns appear only when used.
pub(super) fn time_table(rows: &[TimeRow]) -> Table {
    let columns = if rows.iter().any(|row| !row.reason.is_empty()) {
        4
    } else if rows.iter().any(|row| !row.away.is_empty()) {
        3
    } else {
        2
    };

    let header = ["User", "time", "away", "reason"];
    let mut table = Table::new(header.into_iter().take(columns), &Align::columns("llrl"));
    for row in rows {
        let cells = [&row.name, &row.time, &row.away, &row.reason];
        table.push_row(cells.into_iter().take(columns).cloned());
    }
    table
}

/// Seconds of absence left, when away.
fn away_left(ctx: &BotContext, key: &str) -> Option<i64> {
    ctx.players
        .info_get(key, "away_until")
        .and_then(timefmt::parse_timestamp)
        .filter(|until| *until > ctx.now)
        .map(|until| (until - ctx.now).num_seconds())
}

// =============================================================================
// Commands
// =============================================================================

/// Stores a timezone for the first target.
pub(super) async fn set(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, WhoOptions::default());
    let who = ctx.targets(parse.who);

    let Some(first) = parse.other.first() else {
        return Ok(Vec::new());
    };
    let joined = parse
        .other
        .get(1)
        .filter(|_| timefmt::is_zone_prefix(first))
        .map(|next| format!("{first}{next}"));

    let zone = joined
        .into_iter()
        .chain(std::iter::once(first.clone()))
        .find(|zone| timefmt::parse_offset(zone).is_some());

    match (zone, who.first()) {
        (Some(zone), Some(member)) => {
            ctx.players.info_set(&member.to_string(), "timezone", zone);
            Ok(vec!["OK".to_string()])
        }
        _ => Ok(Vec::new()),
    }
}

/// Shows stored timezones.
pub(super) async fn get(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, WhoOptions::default());
    let who = ctx.targets(parse.who);

    let mut table = Table::new(["User", "timezone"], &Align::columns("ll"));
    for member in &who {
        let zone = ctx.players.info_get(&member.to_string(), "timezone").unwrap_or_default();
        table.push_row([ctx.member_name(*member), zone.to_string()]);
    }
    Ok(table::render(&table, false))
}

/// Local time and away state of the targets.
pub(super) async fn list(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, WhoOptions::default());
    let who = ctx.targets(parse.who);
    let rows = time_rows(ctx, &who);
    Ok(table::render(&time_table(&rows), false))
}

/// `time away <hours> [reason]`.
pub(super) async fn away(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, WhoOptions::default());

    let target = match (ctx.has_tier(Tier::Chief), parse.who.as_slice()) {
        (_, []) => ctx.author,
        (true, [member]) => *member,
        (true, _) => return Ok(vec!["Sorry about that chief. Can only do one.".to_string()]),
        (false, _) => return Ok(vec![NOT_SELF.to_string()]),
    };

    let Some(hours) = parse
        .other
        .first()
        .and_then(|word| word.parse::<f64>().ok())
        .filter(|hours| hours.is_finite())
    else {
        return Ok(Vec::new());
    };
    if hours < 0.0 {
        return Ok(vec!["Away hours must not be negative".to_string()]);
    }
    if hours > MAX_AWAY_HOURS {
        return Ok(vec!["Away denied. Engage leaders for therapy.".to_string()]);
    }
    let Some(until) = hours_to_duration(hours).and_then(|away| ctx.now.checked_add_signed(away)) else {
        return Ok(vec!["Away denied. Engage leaders for therapy.".to_string()]);
    };

    let key = target.to_string();
    ctx.players.info_set(&key, "away_from", timefmt::format_timestamp(ctx.now));
    ctx.players.info_set(&key, "away_until", timefmt::format_timestamp(until));
    ctx.players.info_set(&key, "away_msg", parse.other[1..].join(" "));
    Ok(vec!["OK".to_string()])
}

/// Whole seconds of `0..=MAX_AWAY_HOURS` hours; anything else is `None`.
#[allow(clippy::cast_possible_truncation)]
fn hours_to_duration(hours: f64) -> Option<Duration> {
    if !hours.is_finite() || !(0.0..=MAX_AWAY_HOURS).contains(&hours) {
        return None;
    }
    Duration::try_seconds((hours * 3600.0).round() as i64)
}

/// Ends the author's away notice.
pub(super) async fn back(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, WhoOptions::default());
    if !parse.who.is_empty() {
        return Ok(vec![NOT_SELF.to_string()]);
    }

    let key = ctx.author.to_string();
    for field in ["away_from", "away_until", "away_msg"] {
        ctx.players.info_remove(&key, field);
    }
    Ok(vec!["OK".to_string()])
}

/// Asks the targets to check in within the hour.
pub(super) async fn checkin(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, WhoOptions::default());
    if !ctx.has_tier(Tier::Chief) {
        return Ok(vec!["Only for chiefs".to_string()]);
    }
    if parse.who.is_empty() {
        return Ok(Vec::new());
    }

    let from = timefmt::format_timestamp(ctx.now);
    let by = timefmt::format_timestamp(ctx.now + Duration::hours(1));
    let mut text = format!("{} wants you to check in during the next hour", ctx.member_name(ctx.author));
    if !parse.other.is_empty() {
        text.push('\n');
        text.push_str(&parse.other.join(" "));
    }

    let mut away = Vec::new();
    let mut reached = false;
    for member in parse.who {
        let key = member.to_string();
        if away_left(ctx, &key).is_some() {
            away.push(ctx.member_name(member));
            continue;
        }

        reached = true;
        ctx.players.info_set(&key, "checkin_from", from.clone());
        ctx.players.info_set(&key, "checkin_by", by.clone());
        if ctx.directory.member(member).is_some() {
            ctx.queue_direct(member, text.clone());
        }
    }

    let mut replies = Vec::new();
    match away.as_slice() {
        [] => {}
        [single] => replies.push(format!("{single} is away")),
        several => replies.push(format!("{} are all away", several.join(", "))),
    }
    if reached && replies.is_empty() {
        replies.push("OK".to_string());
    }
    Ok(replies)
}

