//! Token resolution.
//!
//! Command handlers share one resolver instead of re-parsing their tokens.
//! Resolution runs in two stages:
//!
//! 1. [`TokenResolver::parse_who`] picks out member and role references
//!    (platform mentions or `?!name` / `?&name` lookups) and passes every
//!    other token through.
//! 2. [`TokenResolver::parse_who_what_int`] classifies the pass-through
//!    tokens into integers, flags and techs.
//!
//! # Misses
//!
//! A mention that names nobody is dropped. A token that is not a tech becomes
//! a `Tech <x> not found` diagnostic next to the partial result; resolution
//! never fails.
//!
//! # Players
//!
//! Every member landing in the generic "who" list gets a player record.

use redstar_tech::{PlayerStore, TechRef};

use crate::directory::{EntityDirectory, MemberId, RoleId};

/// Separator token users put between targets and values.
const SEPARATOR: &str = "|";

// =============================================================================
// Mentions
// =============================================================================

/// A reference to a member or role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mention<'a> {
    /// `<@!ID>` or `<@ID>`.
    Member(MemberId),
    /// `<@&ID>`.
    Role(RoleId),
    /// `?!name`.
    MemberNamed(&'a str),
    /// `?&name`.
    RoleNamed(&'a str),
}

impl<'a> Mention<'a> {
    /// Recognises a reference token.
    #[must_use]
    pub fn parse(token: &'a str) -> Option<Self> {
        if let Some(name) = token.strip_prefix("?!") {
            return Some(Self::MemberNamed(name));
        }
        if let Some(name) = token.strip_prefix("?&") {
            return Some(Self::RoleNamed(name));
        }

        let inner = token.strip_prefix("<@")?.strip_suffix('>')?;
        if let Some(id) = inner.strip_prefix('&') {
            return parse_id(id).map(|id| Self::Role(RoleId::new(id)));
        }
        let id = inner.strip_prefix('!').unwrap_or(inner);
        parse_id(id).map(|id| Self::Member(MemberId::new(id)))
    }
}

fn parse_id(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Mention token for a member.
#[must_use]
pub fn member_mention(id: MemberId) -> String {
    format!("<@!{id}>")
}

/// Mention token for a role.
#[must_use]
pub fn role_mention(id: RoleId) -> String {
    format!("<@&{id}>")
}

// =============================================================================
// Results
// =============================================================================

/// Which explicit buckets [`TokenResolver::parse_who`] fills.
///
/// A requested bucket receives the references of its kind instead of the
/// generic "who" list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhoOptions {
    /// Collect member references into [`WhoParse::members`].
    pub members: bool,
    /// Collect role references into [`WhoParse::roles`].
    pub roles: bool,
}

impl WhoOptions {
    /// Members and roles both go to their explicit buckets.
    #[must_use]
    pub const fn explicit() -> Self {
        Self {
            members: true,
            roles: true,
        }
    }
}

/// Result of the first stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhoParse {
    /// Referenced members, role mentions expanded, deduplicated.
    pub who: Vec<MemberId>,
    /// Explicit member references, deduplicated.
    pub members: Vec<MemberId>,
    /// Explicit role references, deduplicated.
    pub roles: Vec<RoleId>,
    /// Tokens that are not references, verbatim.
    pub other: Vec<String>,
}

/// Result of the second stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhatParse {
    /// Referenced members, role mentions expanded, deduplicated.
    pub who: Vec<MemberId>,
    /// Techs in mention order, deduplicated.
    pub techs: Vec<TechRef>,
    /// Integer tokens.
    pub ints: Vec<i64>,
    /// Lowercased `--flag` and `+flag` tokens.
    pub flags: Vec<String>,
    /// `Tech <x> not found` lines.
    pub diagnostics: Vec<String>,
}

impl WhatParse {
    /// True when `--name` or `+name` was given.
    #[must_use]
    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.iter().any(|flag| {
            flag.strip_prefix("--")
                .or_else(|| flag.strip_prefix('+'))
                .is_some_and(|flag| flag == name)
        })
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Turns raw tokens into typed references.
pub struct TokenResolver<'a> {
    directory: &'a dyn EntityDirectory,
    players: &'a mut PlayerStore,
}

impl<'a> TokenResolver<'a> {
    /// Creates a resolver over a directory and the player store.
    pub fn new(directory: &'a dyn EntityDirectory, players: &'a mut PlayerStore) -> Self {
        Self { directory, players }
    }

    /// First stage: member and role references.
    pub fn parse_who(&mut self, tokens: &[String], options: WhoOptions) -> WhoParse {
        let mut parse = WhoParse::default();

        for token in tokens {
            match Mention::parse(token) {
                Some(Mention::Member(id)) => {
                    if let Some(member) = self.directory.member(id) {
                        take_member(&mut parse, options, member.id);
                    }
                }
                Some(Mention::MemberNamed(name)) => {
                    if let Some(member) = self.directory.member_named(name) {
                        take_member(&mut parse, options, member.id);
                    }
                }
                Some(Mention::Role(id)) => {
                    if let Some(role) = self.directory.role(id) {
                        self.take_role(&mut parse, options, role.id);
                    }
                }
                Some(Mention::RoleNamed(name)) => {
                    if let Some(role) = self.directory.role_named(name) {
                        self.take_role(&mut parse, options, role.id);
                    }
                }
                None => parse.other.push(token.clone()),
            }
        }

        for id in &parse.who {
            self.players.ensure(&id.to_string());
        }
        parse
    }

    fn take_role(&self, parse: &mut WhoParse, options: WhoOptions, id: RoleId) {
        if options.roles {
            push_unique(&mut parse.roles, id);
        } else {
            for member in self.directory.members_of_role(id) {
                push_unique(&mut parse.who, member);
            }
        }
    }

    /// Second stage: references, then integers, flags and techs.
    pub fn parse_who_what_int(&mut self, tokens: &[String]) -> WhatParse {
        let who = self.parse_who(tokens, WhoOptions::default());
        let catalog = self.players.catalog();

        let mut parse = WhatParse {
            who: who.who,
            ..WhatParse::default()
        };
        let mut unknown: Vec<String> = Vec::new();

        for token in who.other {
            if let Ok(value) = token.parse::<i64>() {
                parse.ints.push(value);
                continue;
            }
            if token == SEPARATOR {
                continue;
            }

            let word = token.to_lowercase();
            if let Some(category) = catalog.category_named(&word) {
                for id in catalog.range_of(category) {
                    push_unique(&mut parse.techs, TechRef::Slot(*id));
                }
            } else if word.starts_with("--") || word.starts_with('+') {
                parse.flags.push(word);
            } else if let Some(tech) = catalog.resolve(&word) {
                push_unique(&mut parse.techs, tech);
            } else if !unknown.contains(&word) {
                unknown.push(word);
            }
        }

        parse.diagnostics = unknown
            .into_iter()
            .map(|word| format!("Tech {word} not found"))
            .collect();
        parse
    }
}

fn take_member(parse: &mut WhoParse, options: WhoOptions, id: MemberId) {
    let bucket = if options.members {
        &mut parse.members
    } else {
        &mut parse.who
    };
    push_unique(bucket, id);
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use redstar_tech::{Category, TechCatalog};

    use super::*;
    use crate::directory::MemoryDirectory;

    fn directory() -> MemoryDirectory {
        MemoryDirectory::new()
            .with_member(1, "ada", &[10])
            .with_member(2, "bob", &[10, 11])
            .with_member(3, "cy", &[])
            .with_role(10, "pilots")
            .with_role(11, "leaders")
    }

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| (*t).to_string()).collect()
    }

    fn store() -> PlayerStore {
        PlayerStore::new(Arc::new(TechCatalog::standard()))
    }

    #[test]
    fn test_mention_forms() {
        assert_eq!(Mention::parse("<@!12>"), Some(Mention::Member(MemberId::new(12))));
        assert_eq!(Mention::parse("<@12>"), Some(Mention::Member(MemberId::new(12))));
        assert_eq!(Mention::parse("<@&7>"), Some(Mention::Role(RoleId::new(7))));
        assert_eq!(Mention::parse("?!ada"), Some(Mention::MemberNamed("ada")));
        assert_eq!(Mention::parse("?&pilots"), Some(Mention::RoleNamed("pilots")));
        assert_eq!(Mention::parse("<@x>"), None);
        assert_eq!(Mention::parse("<@>"), None);
        assert_eq!(Mention::parse("rs"), None);
    }

    #[test]
    fn test_role_expands_into_who() {
        let dir = directory();
        let mut players = store();
        let parse = TokenResolver::new(&dir, &mut players)
            .parse_who(&tokens(&["<@&10>", "<@!2>", "rest"]), WhoOptions::default());

        assert_eq!(parse.who, vec![MemberId::new(1), MemberId::new(2)]);
        assert_eq!(parse.other, tokens(&["rest"]));
        assert!(players.contains("1"));
        assert!(players.contains("2"));
    }

    #[test]
    fn test_explicit_buckets() {
        let dir = directory();
        let mut players = store();
        let parse = TokenResolver::new(&dir, &mut players)
            .parse_who(&tokens(&["?!cy", "?&leaders", "<@!99>"]), WhoOptions::explicit());

        assert!(parse.who.is_empty());
        assert_eq!(parse.members, vec![MemberId::new(3)]);
        assert_eq!(parse.roles, vec![RoleId::new(11)]);
        assert!(parse.other.is_empty());
        assert!(players.is_empty());
    }

    #[test]
    fn test_what_classification() {
        let dir = directory();
        let mut players = store();
        let parse = TokenResolver::new(&dir, &mut players).parse_who_what_int(&tokens(&[
            "<@1>", "RS", "|", "5", "--CSV", "+all", "warp", "bogus", "relics",
        ]));

        let catalog = TechCatalog::standard();
        assert_eq!(parse.who, vec![MemberId::new(1)]);
        assert_eq!(parse.ints, vec![5]);
        assert_eq!(parse.flags, tokens(&["--csv", "+all"]));
        assert!(parse.has_flag("csv"));
        assert!(parse.has_flag("all"));
        assert!(!parse.has_flag("detail"));
        assert_eq!(
            parse.techs,
            vec![
                catalog.resolve("redstarscanner").unwrap(),
                catalog.resolve("warp").unwrap(),
                catalog.resolve("relics").unwrap(),
            ]
        );
        assert_eq!(parse.diagnostics, tokens(&["Tech bogus not found"]));
    }

    #[test]
    fn test_category_word_expands_once() {
        let dir = directory();
        let mut players = store();
        let parse = TokenResolver::new(&dir, &mut players)
            .parse_who_what_int(&tokens(&["weapons", "Weapon", "battery"]));

        let catalog = TechCatalog::standard();
        let weapons: Vec<TechRef> = catalog
            .range_of(Category::Weapon)
            .iter()
            .map(|id| TechRef::Slot(*id))
            .collect();
        assert_eq!(parse.techs, weapons);
        assert!(parse.diagnostics.is_empty());
    }
}
