//! `tech set`, `tech report` and `tech list`.

use redstar_tech::TechRef;

use super::BotContext;
use crate::error::CommandError;
use crate::table::{self, Align, Table};
use crate::timefmt;

/// Sets one value per named tech for each target.
pub(super) async fn set(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who_what_int(&args);
    let mut replies = parse.diagnostics;
    let who = ctx.targets(parse.who);

    if parse.techs.is_empty() {
        return Ok(replies);
    }
    if parse.ints.len() != parse.techs.len() {
        replies.push(format!(
            "Got {} value(s) when I expected {}",
            parse.ints.len(),
            parse.techs.len()
        ));
        return Ok(replies);
    }

    let Ok(values) = parse
        .ints
        .iter()
        .map(|value| u32::try_from(*value))
        .collect::<Result<Vec<u32>, _>>()
    else {
        replies.push("Values must not be negative".to_string());
        return Ok(replies);
    };

    let stamp = timefmt::format_timestamp(ctx.now);
    let mut old_values = Vec::new();
    for member in &who {
        let key = member.to_string();
        let name = ctx.member_name(*member);
        ctx.players.info_set(&key, "last_name", name);
        ctx.players.info_set(&key, "last_tech_update", stamp.clone());

        for (tech, value) in parse.techs.iter().zip(&values) {
            old_values.push(ctx.players.level(&key, *tech));
            if let TechRef::Slot(slot) = tech {
                ctx.players.set_level(&key, *slot, *value);
            }
        }
    }

    if let ([new], [old, ..]) = (values.as_slice(), old_values.as_slice()) {
        replies.push(format!("Value set to {new} (was {old})"));
    } else {
        replies.push(format!("Values set to {values:?} (was {old_values:?})"));
    }

    ctx.save_players()?;
    Ok(replies)
}

/// One row per target, one column per tech.
pub(super) async fn report(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who_what_int(&args);
    let csv = parse.has_flag("csv");
    let mut replies = parse.diagnostics.clone();
    let who = ctx.targets(parse.who);

    if parse.techs.is_empty() {
        return Ok(replies);
    }

    let mut rows: Vec<(String, Vec<u32>)> = who
        .iter()
        .map(|member| {
            let key = member.to_string();
            let levels = parse
                .techs
                .iter()
                .map(|tech| ctx.players.level(&key, *tech))
                .collect();
            (ctx.member_name(*member), levels)
        })
        .collect();
    if !csv {
        rows.sort_by(|a, b| b.1.first().cmp(&a.1.first()));
    }

    let catalog = ctx.players.catalog();
    let header = std::iter::once("User".to_string())
        .chain(parse.techs.iter().map(|tech| catalog.name_of(*tech).to_string()));
    let mut table = Table::new(header, &aligned(parse.techs.len()));
    for (name, levels) in rows {
        table.push_row(std::iter::once(name).chain(levels.iter().map(u32::to_string)));
    }

    replies.extend(table::render(&table, csv));
    Ok(replies)
}

/// One row per tech, one column per target. Sometimes known as `!gt`.
pub(super) async fn list(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who_what_int(&args);
    let csv = parse.has_flag("csv");
    let all = parse.has_flag("all");
    let mut replies = parse.diagnostics.clone();
    let who = ctx.targets(parse.who);

    let catalog = ctx.players.catalog();
    let techs: Vec<TechRef> = if all || parse.techs.is_empty() {
        catalog.ids().iter().map(|id| TechRef::Slot(*id)).collect()
    } else {
        parse.techs.clone()
    };

    let keys: Vec<String> = who.iter().map(ToString::to_string).collect();
    let header = std::iter::once("Tech".to_string()).chain(who.iter().map(|member| ctx.member_name(*member)));
    let mut table = Table::new(header, &aligned(who.len()));

    let mut last_shown = None;
    for tech in techs {
        let levels: Vec<u32> = keys.iter().map(|key| ctx.players.level(key, tech)).collect();
        if !csv && levels.iter().all(|level| *level == 0) {
            continue;
        }

        let prefix = match (csv, catalog.is_category_change(last_shown, tech)) {
            (true, _) => "",
            (false, true) => "- ",
            (false, false) => "  ",
        };
        let label = format!("{prefix}{}", catalog.name_of(tech));
        table.push_row(std::iter::once(label).chain(levels.iter().map(u32::to_string)));
        last_shown = Some(tech);
    }

    replies.extend(table::render(&table, csv));
    Ok(replies)
}

/// A left-aligned label column followed by right-aligned values.
fn aligned(values: usize) -> Vec<Align> {
    std::iter::once(Align::Left)
        .chain(std::iter::repeat(Align::Right).take(values))
        .collect()
}
