//! `rolemem add|remove|list`: platform role membership.

use super::BotContext;
use crate::directory::RoleId;
use crate::error::CommandError;
use crate::resolver::{member_mention, WhoOptions};

/// Grants the mentioned roles to the mentioned members.
pub(super) async fn add(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, WhoOptions::explicit());
    if parse.members.is_empty() || parse.roles.is_empty() {
        return Ok(vec!["No members and/or roles".to_string()]);
    }

    let mut added = false;
    for member in &parse.members {
        if ctx.directory.member(*member).is_none() {
            continue;
        }
        let held = ctx.directory.member_roles(*member);
        let missing: Vec<RoleId> = known_roles(ctx, &parse.roles)
            .into_iter()
            .filter(|role| !held.contains(role))
            .collect();
        if !missing.is_empty() {
            ctx.directory.add_roles(*member, &missing).await?;
            added = true;
        }
    }

    if !added {
        return Ok(vec!["No adds".to_string()]);
    }

    let mut lines = Vec::new();
    for role in known_roles(ctx, &parse.roles) {
        let mentions: Vec<String> = ctx
            .directory
            .members_of_role(role)
            .into_iter()
            .map(member_mention)
            .collect();
        lines.push(format!("Role: {}", ctx.role_name(role)));
        lines.push(format!("  members: {}", mentions.join(" ")));
    }
    Ok(vec!["Added".to_string(), lines.join("\n")])
}

/// Revokes the mentioned roles from the mentioned members.
pub(super) async fn remove(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, WhoOptions::explicit());
    if parse.members.is_empty() || parse.roles.is_empty() {
        return Ok(vec!["No members or roles".to_string()]);
    }

    let mut removed = false;
    for member in &parse.members {
        if ctx.directory.member(*member).is_none() {
            continue;
        }
        let held = ctx.directory.member_roles(*member);
        let present: Vec<RoleId> = known_roles(ctx, &parse.roles)
            .into_iter()
            .filter(|role| held.contains(role))
            .collect();
        if !present.is_empty() {
            ctx.directory.remove_roles(*member, &present).await?;
            removed = true;
        }
    }

    let reply = if removed { "Removed" } else { "No removals" };
    Ok(vec![reply.to_string()])
}

/// Members of the mentioned roles, names sorted.
pub(super) async fn list(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(
        &args,
        WhoOptions {
            members: false,
            roles: true,
        },
    );
    if parse.roles.is_empty() {
        return Ok(vec!["No roles".to_string()]);
    }

    let mut lines = Vec::new();
    for role in known_roles(ctx, &parse.roles) {
        let mut names: Vec<String> = ctx
            .directory
            .members_of_role(role)
            .into_iter()
            .map(|member| ctx.member_name(member))
            .collect();
        names.sort();
        lines.push(format!("Role: {}", ctx.role_name(role)));
        lines.push(format!("  members: {}", names.join(", ")));
    }
    Ok(vec![lines.join("\n")])
}

fn known_roles(ctx: &BotContext, roles: &[RoleId]) -> Vec<RoleId> {
    roles
        .iter()
        .copied()
        .filter(|role| ctx.directory.role(*role).is_some())
        .collect()
}
