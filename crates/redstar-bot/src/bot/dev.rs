//! Developer commands.

use super::BotContext;
use crate::error::CommandError;
use crate::input::ControlReply;
use crate::resolver::WhoOptions;
use crate::timefmt;

pub(super) async fn info(ctx: &mut BotContext, _args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let uptime = (ctx.now - ctx.started).num_seconds();
    Ok(vec![format!(
        "RedStar\nversion: {}\nuptime: {}",
        env!("CARGO_PKG_VERSION"),
        timefmt::compact(uptime, true)
    )])
}

pub(super) async fn save(ctx: &mut BotContext, _args: Vec<String>) -> Result<Vec<String>, CommandError> {
    ctx.save_all()?;
    Ok(vec!["App and pilot data saved".to_string()])
}

/// Prints ID, name and members of the mentioned roles.
pub(super) async fn roleprint(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, WhoOptions::explicit());
    if parse.roles.is_empty() {
        return Ok(vec!["Pardon my liege? No config var name".to_string()]);
    }

    let mut lines = Vec::new();
    for role_id in parse.roles {
        lines.push("Role:".to_string());
        lines.push(format!("  id: {role_id}"));
        if let Some(role) = ctx.directory.role(role_id) {
            let members: Vec<String> = ctx
                .directory
                .members_of_role(role_id)
                .into_iter()
                .map(|member| ctx.member_name(member))
                .collect();
            lines.push(format!("  name: {}", role.name));
            lines.push(format!("  members: {}", members.join(", ")));
        }
    }
    Ok(vec![lines.join("\n")])
}

pub(super) async fn techlist(ctx: &mut BotContext, _args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let keys = ctx.players.catalog().key_list();
    Ok(vec![format!("Valid tech names: {}", keys.join(", "))])
}

/// Counts players without any tech. `-y` removes them, `--name` lists them.
pub(super) async fn purge1(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let confirmed = args.iter().any(|arg| arg == "-y");
    let named = args.iter().any(|arg| arg == "--name");

    let empty = ctx.players.players_without_tech();
    let mut reply = format!("Purge1: current {}, remove {}", ctx.players.len(), empty.len());

    if !empty.is_empty() {
        if named {
            let names: Vec<String> = empty
                .iter()
                .map(|key| match key.parse::<u64>() {
                    Ok(id) => ctx.member_name(id.into()),
                    Err(_) => key.clone(),
                })
                .collect();
            reply.push_str("\nThese players have NO tech:-\n  - ");
            reply.push_str(&names.join("\n  - "));
        }
        if confirmed {
            let removed = ctx.players.remove_players(&empty);
            tracing::info!(removed, "players without tech purged");
        }
    }
    Ok(vec![reply])
}

pub(super) async fn quit(ctx: &mut BotContext, _args: Vec<String>) -> Result<Vec<String>, CommandError> {
    ctx.save_all()?;
    tracing::info!("quit requested");
    Ok(vec![ControlReply::Quit.reply()])
}
