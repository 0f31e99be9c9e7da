//! Inbound line recognition and control replies.
//!
//! A chat line is for the bot when it starts with one of the root aliases
//! below. The alias is replaced by its command words and the rest of the line
//! is split with shell quoting rules, so `"two words"` stays one token.
//!
//! | Alias        | Expands to     |
//! |--------------|----------------|
//! | `!sme`       | (nothing)      |
//! | `!gt`        | `tech list`    |
//! | `!away`      | `time away`    |
//! | `!back`      | `time back`    |
//! | `!checkin`   | `time checkin` |
//! | `!dead`      | `ws ship dead` |
//! | `!ship`      | `ws ship`      |
//! | `!st`        | `tech set`     |
//! | `!tr`        | `tech report`  |
//! | `!time set`  | `time set`     |
//! | `!time`      | `time list`    |
//!
//! `!sme dev ping` and `!sme dev echo` are recognised before any alias.

use std::fmt;

/// Prefix marking a reply as a transport instruction.
pub const CONTROL_PREFIX: &str = "dented-control-message:";

/// Root aliases, first match wins. Only the first word of the line is
/// replaced, so `!time set` keeps its `set`.
const ALIASES: &[(&[&str], &[&str])] = &[
    (&["!sme"], &[]),
    (&["!gt"], &["tech", "list"]),
    (&["!away"], &["time", "away"]),
    (&["!back"], &["time", "back"]),
    (&["!checkin"], &["time", "checkin"]),
    (&["!dead"], &["ws", "ship", "dead"]),
    (&["!ship"], &["ws", "ship"]),
    (&["!st"], &["tech", "set"]),
    (&["!tr"], &["tech", "report"]),
    (&["!time", "set"], &["time"]),
    (&["!time"], &["time", "list"]),
];

/// Instruction to the transport carried by a single reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlReply {
    /// Send nothing, not even the fallback.
    NoReply,
    /// Delete the message that triggered the command.
    DeleteOriginal,
    /// Shut down.
    Quit,
}

impl ControlReply {
    const fn suffix(self) -> &'static str {
        match self {
            Self::NoReply => "no-reply",
            Self::DeleteOriginal => "delete-original-message",
            Self::Quit => "quit",
        }
    }

    /// Reply string carrying this instruction.
    #[must_use]
    pub fn reply(self) -> String {
        format!("{CONTROL_PREFIX}{}", self.suffix())
    }

    /// Recognises a control reply.
    #[must_use]
    pub fn parse(reply: &str) -> Option<Self> {
        let suffix = reply.strip_prefix(CONTROL_PREFIX)?;
        [Self::NoReply, Self::DeleteOriginal, Self::Quit]
            .into_iter()
            .find(|control| control.suffix() == suffix)
    }
}

impl fmt::Display for ControlReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// What an inbound line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// `!sme dev ping`.
    Ping,
    /// `!sme dev echo`.
    Echo,
    /// A command, aliases expanded.
    Command(Vec<String>),
    /// An alias followed by unbalanced quotes.
    Malformed,
    /// Not addressed to the bot.
    Ignored,
}

/// Classifies a raw chat line.
#[must_use]
pub fn parse_line(raw: &str) -> Line {
    if starts_with_words(raw, &["!sme", "dev", "ping"]) {
        return Line::Ping;
    }
    if starts_with_words(raw, &["!sme", "dev", "echo"]) {
        return Line::Echo;
    }

    let Some((_, expansion)) = ALIASES
        .iter()
        .find(|(words, _)| starts_with_words(raw, words))
    else {
        return Line::Ignored;
    };

    let Some(words) = shlex::split(raw) else {
        return Line::Malformed;
    };

    Line::Command(
        expansion
            .iter()
            .map(|word| (*word).to_string())
            .chain(words.into_iter().skip(1))
            .collect(),
    )
}

/// True when the line's leading whitespace-separated words equal `words`,
/// ignoring case, with the last one ending at a word boundary.
fn starts_with_words(raw: &str, words: &[&str]) -> bool {
    let mut rest = raw;
    for (index, word) in words.iter().enumerate() {
        let trimmed = rest.trim_start();
        if index > 0 && trimmed.len() == rest.len() {
            return false;
        }
        let Some(head) = trimmed.get(..word.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(word) {
            return false;
        }
        rest = &trimmed[word.len()..];
    }
    !rest
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(words: &[&str]) -> Line {
        Line::Command(words.iter().map(|w| (*w).to_string()).collect())
    }

    #[test]
    fn test_aliases_expand() {
        assert_eq!(parse_line("!gt rs"), command(&["tech", "list", "rs"]));
        assert_eq!(parse_line("  !SME tech set 5"), command(&["tech", "set", "5"]));
        assert_eq!(parse_line("!dead bs"), command(&["ws", "ship", "dead", "bs"]));
        assert_eq!(parse_line("!time"), command(&["time", "list"]));
        assert_eq!(parse_line("!time  set UTC+2"), command(&["time", "set", "UTC+2"]));
        assert_eq!(parse_line("!time settle"), command(&["time", "list", "settle"]));
    }

    #[test]
    fn test_word_boundary() {
        assert_eq!(parse_line("!stuff"), Line::Ignored);
        assert_eq!(parse_line("hello !st"), Line::Ignored);
        assert_eq!(parse_line("!st, 5"), command(&["tech", "set", "5"]));
    }

    #[test]
    fn test_quotes() {
        assert_eq!(
            parse_line(r#"!away 2 "at the dentist""#),
            command(&["time", "away", "2", "at the dentist"])
        );
        assert_eq!(parse_line(r#"!away 2 "oops"#), Line::Malformed);
    }

    #[test]
    fn test_dev_lines() {
        assert_eq!(parse_line("!sme dev ping"), Line::Ping);
        assert_eq!(parse_line("!sme  DEV echo hi"), Line::Echo);
        assert_eq!(parse_line("!sme dev pingpong"), command(&["dev", "pingpong"]));
    }

    #[test]
    fn test_control_replies() {
        assert_eq!(ControlReply::Quit.reply(), "dented-control-message:quit");
        assert_eq!(
            ControlReply::parse("dented-control-message:delete-original-message"),
            Some(ControlReply::DeleteOriginal)
        );
        assert_eq!(ControlReply::parse("dented-control-message:dance"), None);
        assert_eq!(ControlReply::parse("no-reply"), None);
    }
}
