//! `pilot lastup`.

use std::collections::BTreeSet;

use super::BotContext;
use crate::directory::MemberId;
use crate::error::CommandError;
use crate::resolver::WhoOptions;
use crate::table::{self, Align, Table};
use crate::timefmt;

const DAY: f64 = 86_400.0;

/// Days since each target last updated their techs. `--not` lists every
/// other known player instead.
pub(super) async fn lastup(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, WhoOptions::default());
    let invert = parse.other.iter().any(|word| word == "--not" || word == "+not");

    let mut who = parse.who;
    if who.is_empty() {
        who.push(ctx.author);
    }
    if invert {
        let excluded: BTreeSet<MemberId> = who.into_iter().collect();
        who = ctx
            .players
            .iter()
            .filter_map(|(key, _)| key.parse::<u64>().ok().map(MemberId::new))
            .filter(|member| !excluded.contains(member))
            .collect();
    }
    if !ctx.may_target_others() {
        who = vec![ctx.author];
    }

    let mut rows: Vec<(String, f64)> = who
        .iter()
        .map(|member| (ctx.member_name(*member), days_since_update(ctx, *member)))
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut table = Table::new(["User", "days since update"], &Align::columns("ll"));
    for (name, days) in rows {
        table.push_row([name, format!("{days:.2}")]);
    }
    Ok(table::render(&table, false))
}

#[allow(clippy::cast_precision_loss)]
fn days_since_update(ctx: &BotContext, member: MemberId) -> f64 {
    ctx.players
        .info_get(&member.to_string(), "last_tech_update")
        .and_then(timefmt::parse_timestamp)
        .filter(|at| *at < ctx.now)
        .map_or(0.0, |at| (ctx.now - at).num_seconds() as f64 / DAY)
}
