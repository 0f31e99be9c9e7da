//! The bot: state, command surface and the message loop.
//!
//! # Architecture
//!
//! A [`Bot`] pairs the static [`CommandTree`] with a [`BotContext`] holding
//! every piece of mutable state plus the current actor. The transport calls
//! [`Bot::on_line`] (or [`Bot::on_message`] with pre-split tokens) for each
//! inbound message and [`Bot::tick`] every few seconds while
//! [`Bot::needs_tick`] says so.
//!
//! Each message runs through the same steps:
//!
//! 1. Group membership is refreshed when due.
//! 2. The tokens are dispatched; handlers reply with text lines.
//! 3. Errors become user-facing warnings or a tiered apology.
//! 4. Queued direct messages are sent.
//! 5. Dirty documents are saved.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//!
//! use chrono::Utc;
//! use redstar_bot::{
//!     Bot, BotConfig, ChannelId, MemberId, MemoryDirectory, MemoryStore, RecordingSink, Services,
//! };
//!
//! let directory = MemoryDirectory::new()
//!     .with_member(1, "ada", &[])
//!     .with_channel(100, "bot-spam");
//! let services = Services {
//!     directory: Rc::new(directory),
//!     sink: Rc::new(RecordingSink::new()),
//!     store: Rc::new(MemoryStore::new()),
//! };
//! let config = BotConfig::new(vec![MemberId::new(1)], Vec::new());
//! let mut bot = Bot::new(config, services, Utc::now());
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let response = rt
//!     .block_on(bot.on_line(MemberId::new(1), ChannelId::new(100), "!sme dev ping", Utc::now()))
//!     .unwrap();
//! assert_eq!(response.replies, ["Pong"]);
//! ```

mod dev;
mod group;
mod misc;
mod pilot;
mod rolemem;
mod score;
mod tech;
mod time;
mod ws;

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redstar_tech::{PlayerSnapshot, PlayerStore, ScoringEngine, TechCatalog, WeightSet};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::{Authorize, CommandTree, Handler, HandlerFuture, Tier};
use crate::config::BotConfig;
use crate::directory::{ChannelId, EntityDirectory, MemberId, MessageSink, RoleId};
use crate::error::{CommandError, StoreError};
use crate::groups::{Group, GroupRegistry, CHIEF_GROUP, DEV_GROUP, WATCHER_GROUP};
use crate::input::{self, ControlReply, Line};
use crate::persist::{Document, Store};
use crate::resolver::TokenResolver;
use crate::whitestar::{WhiteStar, WhiteStarBoard};

/// Wraps an `async fn(&mut BotContext, Vec<String>)` as a tree handler.
macro_rules! handler {
    ($f:path) => {{
        fn boxed(ctx: &mut BotContext, args: Vec<String>) -> HandlerFuture<'_> {
            Box::pin($f(ctx, args))
        }
        boxed as Handler<BotContext>
    }};
}

// =============================================================================
// Collaborators
// =============================================================================

/// External collaborators injected into the bot.
#[derive(Clone)]
pub struct Services {
    /// Members, roles and channels.
    pub directory: Rc<dyn EntityDirectory>,
    /// Outbound messages.
    pub sink: Rc<dyn MessageSink>,
    /// Document persistence.
    pub store: Rc<dyn Store>,
}

/// Transport-level outcome of one inbound line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Messages to post in the channel.
    pub replies: Vec<String>,
    /// Instruction for the transport, if the command gave one.
    pub control: Option<ControlReply>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    groups: BTreeMap<String, Group>,
    #[serde(default)]
    ws: BTreeMap<String, WhiteStar>,
}

#[derive(Serialize)]
struct ConfigDocumentRef<'a> {
    groups: &'a BTreeMap<String, Group>,
    ws: &'a BTreeMap<String, WhiteStar>,
}

// =============================================================================
// Context
// =============================================================================

/// Mutable bot state and the actor of the current command.
pub struct BotContext {
    config: BotConfig,
    directory: Rc<dyn EntityDirectory>,
    sink: Rc<dyn MessageSink>,
    store: Rc<dyn Store>,
    scoring: ScoringEngine,
    players: PlayerStore,
    groups: GroupRegistry,
    whitestars: WhiteStarBoard,
    author: MemberId,
    channel: ChannelId,
    now: DateTime<Utc>,
    started: DateTime<Utc>,
    outbox: Vec<(MemberId, String)>,
}

impl BotContext {
    fn load(config: BotConfig, services: Services, now: DateTime<Utc>) -> Self {
        let Services {
            directory,
            sink,
            store,
        } = services;
        let catalog = Arc::new(TechCatalog::standard());

        let saved: ConfigDocument = load_document(store.as_ref(), Document::Config).unwrap_or_default();
        let saved_groups = saved
            .groups
            .into_iter()
            .filter(|(name, _)| name != DEV_GROUP)
            .collect();
        let groups = GroupRegistry::from_saved(saved_groups, config.dev_authors.clone());
        let whitestars = WhiteStarBoard::from_saved(saved.ws);

        let mut players = PlayerStore::new(Arc::clone(&catalog));
        if let Some(snapshot) = load_document::<PlayerSnapshot>(store.as_ref(), Document::Players) {
            match players.load(snapshot) {
                Ok(report) => tracing::debug!(
                    players = report.players,
                    remapped = report.remapped,
                    orphans = ?report.orphans,
                    "players loaded"
                ),
                Err(err) => tracing::warn!(error = %err, "player snapshot rejected"),
            }
        }

        let weights = store
            .load(Document::Weights)
            .map_err(|err| tracing::warn!(error = %err, "weights unavailable"))
            .ok()
            .flatten()
            .and_then(|value| {
                WeightSet::from_json_value(value)
                    .map_err(|err| tracing::warn!(error = %err, "weights rejected"))
                    .ok()
            })
            .unwrap_or_default();
        let scoring = ScoringEngine::new(catalog, weights);

        tracing::info!(
            players = players.len(),
            groups = groups.iter().count(),
            whitestars = whitestars.len(),
            "bot state loaded"
        );

        Self {
            config,
            directory,
            sink,
            store,
            scoring,
            players,
            groups,
            whitestars,
            author: MemberId::default(),
            channel: ChannelId::default(),
            now,
            started: now,
            outbox: Vec::new(),
        }
    }

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Player store.
    #[must_use]
    pub fn players(&self) -> &PlayerStore {
        &self.players
    }

    /// Groups.
    #[must_use]
    pub fn groups(&self) -> &GroupRegistry {
        &self.groups
    }

    /// WhiteStar events.
    #[must_use]
    pub fn whitestars(&self) -> &WhiteStarBoard {
        &self.whitestars
    }

    /// Scoring engine.
    #[must_use]
    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    /// Author of the current command.
    #[must_use]
    pub fn author(&self) -> MemberId {
        self.author
    }

    /// Time of the current command.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Highest tier of the current author.
    #[must_use]
    pub fn tier(&self) -> Option<Tier> {
        [Tier::Developer, Tier::Chief, Tier::Watcher]
            .into_iter()
            .find(|tier| self.has_tier(*tier))
    }

    fn resolver(&mut self) -> TokenResolver<'_> {
        TokenResolver::new(self.directory.as_ref(), &mut self.players)
    }

    fn is_chief(&self) -> bool {
        self.has_tier(Tier::Chief)
    }

    /// True when the author may look at or change other players here.
    fn may_target_others(&self) -> bool {
        self.is_chief()
            || self
                .directory
                .channel_name(self.channel)
                .is_some_and(|name| self.config.is_ok_channel(&name))
    }

    /// Targets of a command: `who`, the author when empty, and only the author
    /// when they may not target others here.
    fn targets(&self, who: Vec<MemberId>) -> Vec<MemberId> {
        if who.is_empty() || !self.may_target_others() {
            vec![self.author]
        } else {
            who
        }
    }

    fn member_name(&self, id: MemberId) -> String {
        self.directory
            .member(id)
            .map_or_else(|| id.to_string(), |member| member.display_name().to_string())
    }

    fn role_name(&self, id: RoleId) -> String {
        self.directory
            .role(id)
            .map_or_else(|| id.to_string(), |role| role.name)
    }

    fn queue_direct(&mut self, member: MemberId, text: String) {
        self.outbox.push((member, text));
    }

    fn refresh_groups(&mut self) {
        let now = self.now;
        let mut resolver = TokenResolver::new(self.directory.as_ref(), &mut self.players);
        self.groups.refresh_all(now, &mut resolver);
    }

    async fn flush_outbox(&mut self) {
        for (member, text) in std::mem::take(&mut self.outbox) {
            if let Err(err) = self.sink.send_direct(member, &text).await {
                tracing::warn!(%member, error = %err, "direct message not delivered");
            }
        }
    }

    /// Saves every document that changed.
    fn save_dirty(&mut self) -> Result<(), StoreError> {
        if self.groups.is_dirty() || self.whitestars.is_dirty() {
            self.save_config()?;
        }
        if self.players.is_dirty() {
            self.save_players()?;
        }
        Ok(())
    }

    /// Saves both writable documents.
    fn save_all(&mut self) -> Result<(), StoreError> {
        self.save_config()?;
        self.save_players()
    }

    fn save_config(&mut self) -> Result<(), StoreError> {
        let document = ConfigDocumentRef {
            groups: self.groups.saved(),
            ws: self.whitestars.saved(),
        };
        save_document(self.store.as_ref(), Document::Config, &document)?;
        self.groups.mark_clean();
        self.whitestars.mark_clean();
        Ok(())
    }

    fn save_players(&mut self) -> Result<(), StoreError> {
        save_document(self.store.as_ref(), Document::Players, &self.players.snapshot())?;
        self.players.mark_clean();
        Ok(())
    }
}

impl Authorize for BotContext {
    fn has_tier(&self, tier: Tier) -> bool {
        let member_of = |group| self.groups.contains_member(group, self.author);
        let developer = member_of(DEV_GROUP);
        match tier {
            Tier::Developer => developer,
            Tier::Chief => developer || member_of(CHIEF_GROUP),
            Tier::Watcher => developer || member_of(CHIEF_GROUP) || member_of(WATCHER_GROUP),
        }
    }
}

fn load_document<T: DeserializeOwned>(store: &dyn Store, document: Document) -> Option<T> {
    let value = match store.load(document) {
        Ok(Some(value)) => value,
        Ok(None) => {
            tracing::debug!(%document, "document not saved yet");
            return None;
        }
        Err(err) => {
            tracing::warn!(error = %err, "document load failed");
            return None;
        }
    };
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(source) => {
            let err = StoreError::Json { document, source };
            tracing::warn!(error = %err, "document rejected");
            None
        }
    }
}

fn save_document<T: Serialize>(store: &dyn Store, document: Document, value: &T) -> Result<(), StoreError> {
    let value: Value = serde_json::to_value(value).map_err(|source| StoreError::Json { document, source })?;
    store.save(document, &value)
}

// =============================================================================
// Bot
// =============================================================================

/// Command processor owning all bot state.
pub struct Bot {
    tree: CommandTree<BotContext>,
    ctx: BotContext,
}

impl Bot {
    /// Builds the bot, loading saved documents.
    ///
    /// Missing or unreadable documents start empty; the failure is logged.
    #[must_use]
    pub fn new(config: BotConfig, services: Services, now: DateTime<Utc>) -> Self {
        Self {
            tree: command_tree(),
            ctx: BotContext::load(config, services, now),
        }
    }

    /// Current state.
    #[must_use]
    pub fn context(&self) -> &BotContext {
        &self.ctx
    }

    /// Runs one tokenised command and returns its replies.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving changed documents fails. Handler
    /// failures never escape; they become replies.
    pub async fn on_message(
        &mut self,
        author: MemberId,
        channel: ChannelId,
        tokens: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        self.ctx.author = author;
        self.ctx.channel = channel;
        self.ctx.now = now;

        if self.ctx.groups.refresh_due(now) {
            self.ctx.refresh_groups();
        }

        let tier = self.ctx.tier();
        let mut replies = match self.tree.dispatch(&mut self.ctx, tokens).await {
            Ok(replies) => replies,
            Err(CommandError::Argument(warning)) => vec![warning],
            Err(err) => {
                tracing::error!(%author, error = %err, "command failed");
                vec![apology(tier).to_string()]
            }
        };
        if replies.is_empty() {
            replies.push(fallback(tier).to_string());
        }

        self.ctx.flush_outbox().await;
        self.ctx.save_dirty()?;
        Ok(replies)
    }

    /// Handles a raw chat line: aliases, developer ping and echo, and control
    /// replies.
    ///
    /// # Errors
    ///
    /// See [`Bot::on_message`].
    pub async fn on_line(
        &mut self,
        author: MemberId,
        channel: ChannelId,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<Response, StoreError> {
        let tokens = match input::parse_line(raw) {
            Line::Ping | Line::Echo if !self.is_developer(author) => return Ok(Response::default()),
            Line::Ping => {
                return Ok(Response {
                    replies: vec!["Pong".to_string()],
                    control: None,
                })
            }
            Line::Echo => {
                return Ok(Response {
                    replies: vec![format!("```\n{raw}\n```")],
                    control: None,
                })
            }
            Line::Command(tokens) => tokens,
            Line::Malformed => {
                tracing::warn!(%author, line = raw, "unbalanced quotes");
                return Ok(Response::default());
            }
            Line::Ignored => return Ok(Response::default()),
        };

        let replies = self.on_message(author, channel, tokens, now).await?;
        if let [single] = replies.as_slice() {
            if let Some(control) = ControlReply::parse(single) {
                return Ok(Response {
                    replies: Vec::new(),
                    control: Some(control),
                });
            }
        }
        Ok(Response {
            replies,
            control: None,
        })
    }

    /// True while periodic status updates have work to do.
    #[must_use]
    pub fn needs_tick(&self) -> bool {
        !self.ctx.whitestars.is_empty()
    }

    /// Updates every WhiteStar status message and retires finished events.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving the changes fails. Failures of one
    /// event are logged and do not stop the others.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.ctx.now = now;
        for name in self.ctx.whitestars.names() {
            if let Err(err) = ws::update_status(&mut self.ctx, &name).await {
                tracing::error!(whitestar = %name, error = %err, "status update failed");
            }
        }
        self.ctx.save_dirty()
    }

    /// Saves every document regardless of changes.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`].
    pub fn save(&mut self) -> Result<(), StoreError> {
        self.ctx.save_all()
    }

    fn is_developer(&self, author: MemberId) -> bool {
        self.ctx.groups.contains_member(DEV_GROUP, author)
    }
}

fn fallback(tier: Option<Tier>) -> &'static str {
    match tier {
        Some(Tier::Developer) => "Pardon, my liege?",
        Some(Tier::Chief) => "Excuse me chief?",
        _ => "Say what?",
    }
}

fn apology(tier: Option<Tier>) -> &'static str {
    match tier {
        Some(Tier::Developer) => "The sky fell, my liege",
        Some(Tier::Chief) => "Sorry about that chief",
        _ => "Oh crap",
    }
}

// =============================================================================
// Command surface
// =============================================================================

fn command_tree() -> CommandTree<BotContext> {
    let dev = CommandTree::new()
        .leaf("info", None, handler!(dev::info))
        .leaf("save", None, handler!(dev::save))
        .leaf("roleprint", None, handler!(dev::roleprint))
        .leaf("techlist", None, handler!(dev::techlist))
        .leaf("purge1", None, handler!(dev::purge1))
        .leaf("quit", None, handler!(dev::quit));

    let group = CommandTree::new()
        .leaf("add", None, handler!(group::add))
        .leaf("remove", None, handler!(group::remove))
        .leaf("list", None, handler!(group::list));

    let rolemem = CommandTree::new()
        .leaf("add", None, handler!(rolemem::add))
        .leaf("remove", None, handler!(rolemem::remove))
        .leaf("list", None, handler!(rolemem::list));

    let ws = CommandTree::new()
        .leaf("add", Some(Tier::Chief), handler!(ws::add))
        .leaf("remove", Some(Tier::Chief), handler!(ws::remove))
        .leaf("list", Some(Tier::Chief), handler!(ws::list))
        .leaf("roles", Some(Tier::Chief), handler!(ws::roles))
        .leaf("ship", Some(Tier::Watcher), handler!(ws::ship));

    let tech = CommandTree::new()
        .leaf("set", None, handler!(tech::set))
        .leaf("report", None, handler!(tech::report))
        .leaf("list", None, handler!(tech::list));

    let time = CommandTree::new()
        .leaf("set", None, handler!(time::set))
        .leaf("get", None, handler!(time::get))
        .leaf("list", None, handler!(time::list))
        .leaf("away", None, handler!(time::away))
        .leaf("back", None, handler!(time::back))
        .leaf("checkin", None, handler!(time::checkin));

    let pilot = CommandTree::new().leaf("lastup", None, handler!(pilot::lastup));

    CommandTree::new()
        .fork("dev", Some(Tier::Developer), dev)
        .fork("group", Some(Tier::Chief), group)
        .fork("rolemem", Some(Tier::Chief), rolemem)
        .fork("ws", None, ws)
        .fork("tech", Some(Tier::Watcher), tech)
        .fork("time", Some(Tier::Watcher), time)
        .fork("pilot", Some(Tier::Chief), pilot)
        .leaf("score", Some(Tier::Watcher), handler!(score::score))
        .leaf("msgme", Some(Tier::Watcher), handler!(misc::msgme))
        .leaf("clear", Some(Tier::Chief), handler!(misc::clear))
}
