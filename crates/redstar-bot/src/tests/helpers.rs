//! Test harness and the standard roster.
//!
//! | Member | ID | Roles             | Tier      |
//! |--------|----|-------------------|-----------|
//! | ada    | 1  |                   | developer |
//! | bob    | 2  | chiefs, leaders   | chief     |
//! | cyd    | 3  | watchers, pilots  | watcher   |
//! | dan    | 4  | pilots            | none      |
//!
//! Channels: `bot-spam` (100, an ok channel), `ws-alpha` (200) and
//! `general` (300).

use std::rc::Rc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

use crate::bot::{Bot, Response, Services};
use crate::config::BotConfig;
use crate::directory::{ChannelId, MemberId, MemoryDirectory, RecordingSink};
use crate::persist::{Document, MemoryStore};

pub const ADA: MemberId = MemberId::new(1);
pub const BOB: MemberId = MemberId::new(2);
pub const CYD: MemberId = MemberId::new(3);
pub const DAN: MemberId = MemberId::new(4);

pub const BOT_SPAM: ChannelId = ChannelId::new(100);
pub const WS_ALPHA: ChannelId = ChannelId::new(200);
pub const GENERAL: ChannelId = ChannelId::new(300);

/// Fixed instant plus an offset in seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
}

/// The standard roster.
pub fn roster() -> MemoryDirectory {
    MemoryDirectory::new()
        .with_role(10, "chiefs")
        .with_role(11, "watchers")
        .with_role(12, "leaders")
        .with_role(13, "pilots")
        .with_member(1, "ada", &[])
        .with_member(2, "bob", &[10, 12])
        .with_member(3, "cyd", &[11, 13])
        .with_member(4, "dan", &[13])
        .with_channel(100, "bot-spam")
        .with_channel(200, "ws-alpha")
        .with_channel(300, "general")
}

/// Saved config document with the two tier groups bound to roles.
pub fn tier_groups() -> Value {
    json!({
        "groups": {
            "auth_chief": {"defn": "<@&10>", "members": [2]},
            "auth_watcher": {"defn": "<@&11>", "members": [3]}
        }
    })
}

/// A bot over the standard roster with handles on its collaborators.
pub struct Harness {
    pub bot: Bot,
    pub directory: Rc<MemoryDirectory>,
    pub sink: Rc<RecordingSink>,
    pub store: MemoryStore,
}

impl Harness {
    /// Fresh bot with only the tier groups saved.
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new().with(Document::Config, tier_groups()))
    }

    /// Bot loading from an existing store.
    pub fn with_store(store: MemoryStore) -> Self {
        let directory = Rc::new(roster());
        let sink = Rc::new(RecordingSink::new());
        let services = Services {
            directory: directory.clone(),
            sink: sink.clone(),
            store: Rc::new(store.clone()),
        };
        let config = BotConfig::new(vec![ADA], vec!["bot-spam".to_string()]);
        Self {
            bot: Bot::new(config, services, at(0)),
            directory,
            sink,
            store,
        }
    }

    /// Sends a raw line at `at(secs)`.
    pub async fn say_at(&mut self, author: MemberId, channel: ChannelId, line: &str, secs: i64) -> Response {
        self.bot.on_line(author, channel, line, at(secs)).await.unwrap()
    }

    /// Sends a raw line at the start instant and returns the replies.
    pub async fn say(&mut self, author: MemberId, channel: ChannelId, line: &str) -> Vec<String> {
        self.say_at(author, channel, line, 0).await.replies
    }
}
