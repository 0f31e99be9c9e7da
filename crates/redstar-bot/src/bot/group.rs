//! `group add|remove|list`.

use super::BotContext;
use crate::error::CommandError;
use crate::resolver::{member_mention, role_mention, TokenResolver, WhoOptions};

/// `group add <name> <members/roles...>`.
pub(super) async fn add(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, WhoOptions::explicit());
    let Some(name) = parse.other.first() else {
        return Ok(Vec::new());
    };
    if (parse.members.is_empty() && parse.roles.is_empty()) || ctx.groups.is_protected(name) {
        return Ok(Vec::new());
    }

    let defn = parse
        .members
        .iter()
        .map(|id| member_mention(*id))
        .chain(parse.roles.iter().map(|id| role_mention(*id)))
        .collect::<Vec<_>>()
        .join(" ");

    let mut resolver = TokenResolver::new(ctx.directory.as_ref(), &mut ctx.players);
    ctx.groups.set(name, &defn, &mut resolver);
    Ok(vec![format!("Group {name} added")])
}

/// `group remove <name>`.
pub(super) async fn remove(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let Some(name) = args.first() else {
        return Ok(Vec::new());
    };
    if ctx.groups.is_protected(name) || !ctx.groups.remove(name) {
        return Ok(Vec::new());
    }
    Ok(vec![format!("Group {name} removed")])
}

/// One line per group: member names, then role names.
pub(super) async fn list(ctx: &mut BotContext, _args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let definitions: Vec<(String, Vec<String>)> = ctx
        .groups
        .iter()
        .map(|(name, group)| (name.to_string(), group.defn.split(' ').map(str::to_string).collect()))
        .collect();

    let mut lines = Vec::with_capacity(definitions.len());
    for (name, tokens) in definitions {
        let parse = ctx.resolver().parse_who(&tokens, WhoOptions::explicit());
        let entries: Vec<String> = parse
            .members
            .iter()
            .map(|id| ctx.member_name(*id))
            .chain(parse.roles.iter().map(|id| ctx.role_name(*id)))
            .collect();
        lines.push(format!("{name}: {}", entries.join(", ")));
    }

    if lines.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![lines.join("\n")])
}
