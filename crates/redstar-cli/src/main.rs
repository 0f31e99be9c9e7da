//! # RedStar console
//!
//! Runs the bot against stdin/stdout. Every input line is one chat message:
//!
//! ```text
//! <author-id> <channel-id> <text>
//! ```
//!
//! Replies are printed as they come. WhiteStar status messages are refreshed
//! every five seconds while any event is live.
//!
//! ## Environment
//!
//! `var/env.sh` and `.env` are loaded first when present. Besides the bot
//! variables (`REDSTAR_DEV_AUTHORS`, `REDSTAR_OK_CHANNELS`,
//! `REDSTAR_DATA_DIR`), `REDSTAR_DIRECTORY` names the JSON roster of members,
//! roles and channels, `<data_dir>/directory.json` by default. `RUST_LOG`
//! sets the log filter.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod console;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use redstar_bot::{
    Bot, BotConfig, ChannelId, ControlReply, FileStore, MemberId, MemoryDirectory, Services,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::console::ConsoleSink;

/// Interval of the WhiteStar status tick.
const TICK_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Both files are optional; read before the subscriber so RUST_LOG applies
    let env_files = [
        ("var/env.sh", dotenvy::from_path("var/env.sh")),
        (".env", dotenvy::dotenv().map(drop)),
    ];

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    for (file, loaded) in env_files {
        report_env_file(file, loaded);
    }

    let config = BotConfig::from_env().context("reading bot configuration")?;
    let roster = std::env::var("REDSTAR_DIRECTORY")
        .map_or_else(|_| config.data_dir.join("directory.json"), PathBuf::from);
    let directory = load_roster(&roster)?;

    let sink = Rc::new(ConsoleSink::new());
    let services = Services {
        directory: Rc::new(directory),
        sink: sink.clone(),
        store: Rc::new(FileStore::new(&config.data_dir)),
    };
    tracing::info!(data_dir = %config.data_dir.display(), roster = %roster.display(), "starting");
    let mut bot = Bot::new(config, services, Utc::now());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(TICK_INTERVAL);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                if handle_line(&mut bot, &sink, &line).await == Some(ControlReply::Quit) {
                    tracing::info!("quit");
                    return Ok(());
                }
            }
            _ = ticker.tick(), if bot.needs_tick() => {
                if let Err(err) = bot.tick(Utc::now()).await {
                    tracing::error!(error = %err, "tick save failed");
                }
            }
        }
    }

    bot.save().context("saving on exit")?;
    Ok(())
}

/// Logs an env file that exists but could not be read.
fn report_env_file(file: &str, loaded: Result<(), dotenvy::Error>) {
    match loaded {
        Ok(()) => tracing::debug!(file, "env file loaded"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(file, error = %err, "env file ignored"),
    }
}

/// Runs one input line and prints the outcome.
async fn handle_line(bot: &mut Bot, sink: &ConsoleSink, line: &str) -> Option<ControlReply> {
    let Some((author, channel, text)) = split_message(line) else {
        if !line.trim().is_empty() {
            tracing::warn!(line, "expected <author-id> <channel-id> <text>");
        }
        return None;
    };
    sink.record(channel, text);

    match bot.on_line(author, channel, text, Utc::now()).await {
        Ok(response) => {
            for reply in &response.replies {
                println!("{reply}");
            }
            if let Some(control) = response.control {
                tracing::debug!(%control, "control reply");
            }
            response.control
        }
        Err(err) => {
            tracing::error!(error = %err, "saving failed");
            None
        }
    }
}

fn split_message(line: &str) -> Option<(MemberId, ChannelId, &str)> {
    let mut parts = line.trim().splitn(3, char::is_whitespace);
    let author = parts.next()?.parse::<u64>().ok()?;
    let channel = parts.next()?.parse::<u64>().ok()?;
    let text = parts.next()?.trim_start();
    Some((MemberId::new(author), ChannelId::new(channel), text))
}

/// Reads the roster. A missing file gives an empty roster.
fn load_roster(path: &Path) -> anyhow::Result<MemoryDirectory> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "no roster, starting with an empty one");
            return Ok(MemoryDirectory::new());
        }
        Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
    };
    let directory = MemoryDirectory::from_json_str(&json)
        .with_context(|| format!("parsing {}", path.display()))?;
    tracing::info!(members = directory.member_count(), "roster loaded");
    Ok(directory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_message() {
        let (author, channel, text) = split_message("12 34 !sme tech list").unwrap();
        assert_eq!(author, MemberId::new(12));
        assert_eq!(channel, ChannelId::new(34));
        assert_eq!(text, "!sme tech list");

        assert!(split_message("12 !sme").is_none());
        assert!(split_message("ada 34 hi").is_none());
        assert!(split_message("").is_none());
    }

    #[test]
    fn test_malformed_env_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("redstar-env-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("env.sh");
        std::fs::write(&path, "REDSTAR_ENV_CHECK='unterminated\n").unwrap();

        let err = dotenvy::from_path(&path).unwrap_err();
        assert!(!err.not_found());
        report_env_file("env.sh", Err(err));

        let missing = dotenvy::from_path(dir.join("absent.env")).unwrap_err();
        assert!(missing.not_found());
        report_env_file("absent.env", Err(missing));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
