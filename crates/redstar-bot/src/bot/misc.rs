//! `msgme` and `clear`.

use super::BotContext;
use crate::error::CommandError;
use crate::input::ControlReply;
use crate::resolver::WhoOptions;

/// Most messages `clear +keep` protects.
const MAX_KEEP: i64 = 10;

/// Sends the author a direct message.
pub(super) async fn msgme(ctx: &mut BotContext, _args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let author = ctx.author;
    ctx.queue_direct(author, "You rang?".to_string());
    Ok(vec!["OK".to_string()])
}

/// `clear [n] [+keep [k]]`: deletes the command and the `n` messages before
/// it, never touching the `k` oldest messages of the channel.
pub(super) async fn clear(ctx: &mut BotContext, args: Vec<String>) -> Result<Vec<String>, CommandError> {
    let parse = ctx.resolver().parse_who(&args, WhoOptions::default());
    let mut replies = Vec::new();

    let mut count: i64 = 1;
    let mut keep: i64 = 2;
    let mut words = parse.other.iter().peekable();
    while let Some(word) = words.next() {
        if word == "+keep" {
            keep = 1;
            if let Some(value) = words.peek().and_then(|next| next.parse::<i64>().ok()) {
                words.next();
                keep = value.max(0);
                if value > MAX_KEEP {
                    replies.push(format!("Error: wont keep more than {value}"));
                    count = 0;
                    keep = 0;
                }
            }
        } else if let Ok(value) = word.parse::<i64>() {
            count = value;
        }
    }

    let mut after = None;
    if keep > 0 {
        let keep = usize::try_from(keep).unwrap_or_default();
        let oldest = ctx.sink.history(ctx.channel, keep + 1).await?;
        if keep >= oldest.len() {
            count = 0;
        } else {
            after = Some(oldest[keep - 1]);
        }
    }

    if count > 0 {
        let limit = usize::try_from(count).unwrap_or_default() + 1;
        let removed = ctx.sink.purge(ctx.channel, limit, after).await?;
        tracing::debug!(channel = %ctx.channel, removed, "channel cleared");
    }

    if replies.is_empty() {
        replies.push(ControlReply::NoReply.reply());
    }
    Ok(replies)
}
