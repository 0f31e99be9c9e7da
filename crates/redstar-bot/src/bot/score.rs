//! `score [table] [--detail]`.

use redstar_tech::DEFAULT_TABLE;

use super::BotContext;
use crate::error::CommandError;
use crate::resolver::WhoOptions;
use crate::table::{self, Align, Table};

/// Most players shown with `--detail`.
const DETAIL_LIMIT: usize = 4;

/// Scores the targets against a weight table.
///
/// The first free word names the table; unknown names fall back to the
/// default table. With `--detail` each player gets a breakdown instead of a
/// table row.
pub(super) async fn score(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, WhoOptions::default());
    let mut who = ctx.targets(parse.who);

    let table_name = parse
        .other
        .first()
        .filter(|name| ctx.scoring.weights().contains(name))
        .map_or(DEFAULT_TABLE, String::as_str)
        .to_string();
    let detail = parse.other.iter().any(|word| word == "--detail" || word == "+detail");
    let truncated = detail && who.len() > DETAIL_LIMIT;
    if truncated {
        who.truncate(DETAIL_LIMIT);
    }

    let mut replies = Vec::new();
    let mut rows = Vec::new();
    for member in &who {
        let key = member.to_string();
        let player = ctx.players.ensure(&key).clone();
        let outcome = ctx
            .scoring
            .score(&player, &table_name, detail)
            .ok_or_else(|| CommandError::Internal(format!("no weight table {table_name}")))?;

        let name = ctx.member_name(*member);
        if detail && outcome.total > 0 {
            let mut lines = vec![format!("`| {name}` {}", outcome.total)];
            for (label, entries) in outcome.breakdown.unwrap_or_default().sections() {
                let credited: Vec<String> = entries
                    .iter()
                    .map(|entry| format!("{} {:?}", entry.tech, entry.points))
                    .collect();
                lines.push(format!("`| {label:>4}:` {}", credited.join(", ")));
            }
            replies.push(lines.join("\n"));
        } else if !detail {
            rows.push((name, outcome.total));
        }
    }

    if !detail {
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        let mut table = Table::new(["User", "Score"], &Align::columns("lr"));
        for (name, total) in rows {
            table.push_row([name, total.to_string()]);
        }
        replies.extend(table::render(&table, false));
    }
    if truncated {
        replies.push(format!("Only showing {DETAIL_LIMIT} pilots"));
    }
    Ok(replies)
}
