//! # RedStar Bot
//!
//! Command processor for a strategy-game community chat bot.
//!
//! The bot receives command lines from a chat transport, resolves the
//! players, roles and techs they mention, dispatches them through a tiered
//! command tree and answers with text replies, mostly rendered tables.
//!
//! ## Architecture
//!
//! - **Collaborators**: [`EntityDirectory`], [`MessageSink`] and [`Store`] are
//!   injected; in-memory versions back the console transport and the tests
//! - **Resolver**: [`TokenResolver`] turns raw tokens into members, roles,
//!   techs, integers, flags and diagnostics
//! - **Dispatch**: [`CommandTree`] routes a token list to an async handler,
//!   hiding nodes the actor's [`Tier`] does not reach
//! - **State**: [`GroupRegistry`], the [`WhiteStarBoard`] and the player store
//!   from `redstar-tech`, all owned by the [`Bot`]
//!
//! ## Flow
//!
//! ```text
//! raw line ─► alias expansion + shell split ─► CommandTree ─► handler
//!                                                 │             │
//!                                           tier guard     resolver, stores,
//!                                                          scoring, tables
//! ```
//!
//! A single task owns the [`Bot`]; handlers and the periodic tick never
//! overlap.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bot;
pub mod command;
pub mod config;
pub mod directory;
pub mod error;
pub mod groups;
pub mod input;
pub mod persist;
pub mod resolver;
pub mod table;
pub mod timefmt;
pub mod whitestar;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use bot::{Bot, BotContext, Response, Services};
pub use command::{Authorize, CommandNode, CommandTree, HandlerFuture, Tier};
pub use config::{BotConfig, ConfigError};
pub use directory::{
    ChannelId, EntityDirectory, Member, MemberId, MemoryDirectory, MessageId, MessageSink,
    RecordingSink, Role, RoleId,
};
pub use error::{CommandError, DirectoryError, StoreError};
pub use groups::{Group, GroupRegistry};
pub use input::ControlReply;
pub use persist::{Document, FileStore, MemoryStore, Store};
pub use resolver::{TokenResolver, WhatParse, WhoOptions, WhoParse};
pub use whitestar::{ShipKind, ShipStatus, WhiteStar, WhiteStarBoard};
