//! WhiteStar commands and the periodic status message.

use chrono::Duration;

use super::{time, BotContext};
use crate::directory::RoleId;
use crate::error::CommandError;
use crate::input::ControlReply;
use crate::resolver::{role_mention, TokenResolver, WhoOptions};
use crate::timefmt;
use crate::whitestar::{
    event_name, ShipCommand, ShipOrder, ShipStatus, WhiteStar, MAX_DURATION_SECS, MIN_DURATION_SECS,
};

const ROLES_ONLY: WhoOptions = WhoOptions {
    members: false,
    roles: true,
};

// =============================================================================
// Status
// =============================================================================

/// Rebuilds the status message of one event and posts or edits it when the
/// content changed. Events that are over, or whose channel is gone, are
/// removed.
pub(super) async fn update_status(ctx: &mut BotContext, name: &str) -> Result<(), CommandError> {
    let Some(mut event) = ctx.whitestars.get(name).cloned() else {
        return Ok(());
    };
    if event.done {
        remove_event(ctx, name);
        return Ok(());
    }

    let now = ctx.now;
    let mut changed = false;
    if event.is_over(now) {
        event.done = true;
        changed = true;
    }

    let content = status_content(ctx, &mut event, &mut changed);

    let mut outcome = Ok(());
    if content != event.last_content {
        event.last_content = content;
        changed = true;
        outcome = publish(ctx, &mut event).await;
    }

    if event.done {
        remove_event(ctx, name);
    } else if changed {
        ctx.whitestars.insert(event);
    }
    outcome
}

fn status_content(ctx: &BotContext, event: &mut WhiteStar, changed: &mut bool) -> String {
    let now = ctx.now;
    let mut content = format!("```\nNova time {}\n", event.nova_label(now));

    let roles: Vec<String> = [("Leaders", event.leader_role), ("pilots", event.pilot_role)]
        .into_iter()
        .filter_map(|(label, role)| role.map(|role| format!("{label}: @{}", ctx.role_name(role))))
        .collect();
    if !roles.is_empty() {
        content.push_str(&roles.join(", "));
        content.push('\n');
    }

    if let Some(pilot_role) = event.pilot_role {
        let who = ctx.directory.members_of_role(pilot_role);
        let mut rows = time::time_rows(ctx, &who);
        for row in &mut rows {
            let leader = event
                .assist_group
                .as_deref()
                .is_some_and(|group| ctx.groups.contains_member(group, row.member));
            let marker = if leader { "+ " } else { "  " };
            row.name = format!("{marker}{}", row.name);
        }
        push_block(&mut content, &time::time_table(&rows).lines(false));

        if event.pilot_order.is_none() {
            event.pilot_order = Some(rows.iter().map(|row| row.member).collect());
            *changed = true;
        }
        *changed |= event.refresh_ships(now);

        if let Some(table) = event.ship_table(now, |id| ctx.member_name(id)) {
            push_block(&mut content, &table.lines(false));
        }
    }

    content.push_str("```");
    content
}

fn push_block(content: &mut String, lines: &[String]) {
    content.push('\n');
    content.push_str(&lines.join("\n"));
    content.push('\n');
}

/// Edits the status message, or posts a new one when there is none.
async fn publish(ctx: &BotContext, event: &mut WhiteStar) -> Result<(), CommandError> {
    if ctx.directory.channel_name(event.channel).is_none() {
        tracing::info!(whitestar = %event.name, channel = %event.channel, "channel gone");
        event.done = true;
        return Ok(());
    }

    let existing = match event.status_message {
        Some(id) => ctx.sink.fetch_message(event.channel, id).await?.map(|_| id),
        None => None,
    };
    match existing {
        Some(id) => ctx.sink.edit_message(event.channel, id, &event.last_content).await?,
        None => {
            let id = ctx.sink.send(event.channel, &event.last_content).await?;
            tracing::debug!(whitestar = %event.name, message = %id, "status message posted");
            event.status_message = Some(id);
        }
    }
    Ok(())
}

fn remove_event(ctx: &mut BotContext, name: &str) -> bool {
    let Some(event) = ctx.whitestars.remove(name) else {
        return false;
    };
    if let Some(group) = event.assist_group {
        ctx.groups.remove(&group);
    }
    tracing::info!(whitestar = name, "whitestar removed");
    true
}

fn set_leaders(ctx: &mut BotContext, event: &mut WhiteStar, leader: RoleId) {
    let group = WhiteStar::assist_group_name(&event.name);
    let mut resolver = TokenResolver::new(ctx.directory.as_ref(), &mut ctx.players);
    ctx.groups.set(&group, &role_mention(leader), &mut resolver);
    event.leader_role = Some(leader);
    event.assist_group = Some(group);
}

/// Event name of the current channel.
fn channel_event(ctx: &BotContext) -> Option<String> {
    ctx.directory
        .channel_name(ctx.channel)
        .as_deref()
        .and_then(event_name)
}

// =============================================================================
// Commands
// =============================================================================

/// `ws add <duration> [@leaders [@pilots]]`, in the event's channel.
pub(super) async fn add(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, ROLES_ONLY);
    let Some(name) = channel_event(ctx) else {
        return Ok(Vec::new());
    };
    if parse.other.is_empty() {
        return Ok(Vec::new());
    }

    let deadline = timefmt::parse_duration(&parse.other)
        .filter(|secs| (MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(secs))
        .and_then(Duration::try_seconds)
        .and_then(|delay| ctx.now.checked_add_signed(delay));
    let Some(deadline) = deadline else {
        return Ok(vec!["Error: Nova time out of good range".to_string()]);
    };

    let mut event = WhiteStar::new(&name, deadline, ctx.channel);
    if let Some(leader) = parse.roles.first() {
        set_leaders(ctx, &mut event, *leader);
    }
    event.pilot_role = parse.roles.get(1).copied();

    let reply = format!("{event} added");
    tracing::info!(whitestar = %name, deadline = %event.deadline, "whitestar added");
    ctx.whitestars.insert(event);
    Ok(vec![reply])
}

/// Removes the event of the current channel.
pub(super) async fn remove(ctx: &mut BotContext, _args: Vec<String>) -> Result<Vec<String>, CommandError> {
    match channel_event(ctx) {
        Some(name) if remove_event(ctx, &name) => Ok(vec![format!("WhiteStar {name} removed")]),
        _ => Ok(Vec::new()),
    }
}

pub(super) async fn list(ctx: &mut BotContext, _args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let now = ctx.now;
    let mut lines: Vec<String> = ctx
        .whitestars
        .iter()
        .map(|event| {
            let mut parts = vec![format!("\t{:3}, Nova time: {}", event.name, event.nova_label(now))];
            if let Some(role) = event.leader_role {
                parts.push(format!("leaders: @{}", ctx.role_name(role)));
            }
            if let Some(role) = event.pilot_role {
                parts.push(format!("pilots: @{}", ctx.role_name(role)));
            }
            format!("{} in <#{}>", parts.join(", "), event.channel)
        })
        .collect();

    if lines.is_empty() {
        lines.push("\tempty".to_string());
    }
    Ok(vec![format!("WhiteStar list:\n{}", lines.join("\n"))])
}

/// `ws roles @leaders @pilots` for an existing event.
pub(super) async fn roles(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, ROLES_ONLY);
    let Some(name) = channel_event(ctx) else {
        return Ok(Vec::new());
    };
    let [leader, pilots, ..] = parse.roles[..] else {
        return Ok(Vec::new());
    };
    let Some(mut event) = ctx.whitestars.get(&name).cloned() else {
        return Ok(Vec::new());
    };

    set_leaders(ctx, &mut event, leader);
    event.pilot_role = Some(pilots);
    ctx.whitestars.insert(event);
    Ok(vec![format!("WhiteStar roles added to {name}")])
}

/// `ws ship <command> [ship] [time] [@pilot | !enemy]`.
///
/// Replies only with problems; on success the command message is deleted
/// and the status message shows the change.
pub(super) async fn ship(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, WhoOptions::default());
    let now = ctx.now;
    let author = ctx.author;

    let mut replies = Vec::new();
    let Some(name) = channel_event(ctx) else {
        return Ok(vec![ControlReply::DeleteOriginal.reply()]);
    };
    let Some(event) = ctx.whitestars.get_mut(&name) else {
        return Ok(vec![ControlReply::DeleteOriginal.reply()]);
    };

    let order = ShipOrder::parse(&parse.other);
    let friend = match (parse.who.first(), &order.enemy) {
        (Some(member), _) => Some(*member),
        (None, None) => Some(author),
        (None, Some(_)) => None,
    };

    match (order.command, friend, &order.enemy) {
        (_, Some(_), Some(_)) => {
            replies.push("Crap: Can not work on friend and enemy at same time".to_string());
        }
        (None, _, _) => {
            replies.push(format!("Crap: Need command, one of: [{}]", ShipCommand::WORDS.join(", ")));
        }
        (Some(ShipCommand::Add | ShipCommand::Remove), _, None) => {
            replies.push("Crap: Need enemy name with !, like: !Ralph".to_string());
        }
        (Some(ShipCommand::Add), _, Some(enemy)) => {
            if !event.enemies.contains_key(enemy) {
                event.enemies.insert(enemy.clone(), ShipStatus::default());
                ctx.whitestars.mark_dirty();
            }
        }
        (Some(ShipCommand::Remove), _, Some(enemy)) => {
            if event.enemies.remove(enemy).is_some() {
                ctx.whitestars.mark_dirty();
            }
        }
        (Some(command), friend, enemy) => {
            if let Some(kind) = order.ship {
                let Some(ready_at) = order.ready_at(command, now, event.deadline) else {
                    return Ok(vec!["Crap: Time out of good range".to_string()]);
                };
                let status = match (friend, enemy) {
                    (Some(member), _) => event.friends.entry(member).or_default(),
                    (None, Some(enemy)) => event.enemies.entry(enemy.clone()).or_default(),
                    (None, None) => return Ok(vec![ControlReply::DeleteOriginal.reply()]),
                };

                let (ship, ready) = if kind.is_main() {
                    (&mut status.main_ship, &mut status.main_ready_at)
                } else {
                    (&mut status.support_ship, &mut status.support_ready_at)
                };
                match command {
                    ShipCommand::In => *ship = Some(kind),
                    ShipCommand::Timer => {}
                    _ => *ship = None,
                }
                *ready = Some(ready_at);

                tracing::debug!(whitestar = %name, ?command, ?kind, %ready_at, "ship updated");
                ctx.whitestars.mark_dirty();
            }
        }
    }

    if replies.is_empty() {
        replies.push(ControlReply::DeleteOriginal.reply());
    }
    Ok(replies)
}
