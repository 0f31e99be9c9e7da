//! Hierarchical command dispatch.
//!
//! A [`CommandTree`] maps lowercase command words to [`CommandNode`]s. A leaf
//! runs an async handler with the remaining tokens; a fork strips its word and
//! continues in a sub-tree.
//!
//! # Authorization
//!
//! Any node may require a [`Tier`]. A node the actor does not reach is treated
//! exactly like a missing one: the reply lists only the words the actor can
//! see, and the denial is logged.
//!
//! # Example
//!
//! ```
//! use redstar_bot::command::{Authorize, CommandTree, HandlerFuture, Tier};
//!
//! struct Actor {
//!     tier: Option<Tier>,
//! }
//!
//! impl Authorize for Actor {
//!     fn has_tier(&self, tier: Tier) -> bool {
//!         self.tier.is_some_and(|own| own >= tier)
//!     }
//! }
//!
//! fn ping(_: &mut Actor, _: Vec<String>) -> HandlerFuture<'_> {
//!     Box::pin(async { Ok(vec!["Pong".to_string()]) })
//! }
//!
//! let tree: CommandTree<Actor> = CommandTree::new()
//!     .leaf("ping", Some(Tier::Chief), ping);
//!
//! let mut chief = Actor { tier: Some(Tier::Chief) };
//! let mut guest = Actor { tier: None };
//! let words = vec!["PING".to_string()];
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! assert_eq!(rt.block_on(tree.dispatch(&mut chief, words.clone())).unwrap(), ["Pong"]);
//! assert_eq!(
//!     rt.block_on(tree.dispatch(&mut guest, words)).unwrap(),
//!     ["Unknown command ping. Expected one of []"]
//! );
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::CommandError;

/// Future returned by a command handler.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<String>, CommandError>> + 'a>>;

/// Command handler: context and the tokens after the command word.
pub type Handler<C> = for<'a> fn(&'a mut C, Vec<String>) -> HandlerFuture<'a>;

/// Authorization tier. Each tier includes the ones below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Member of `auth_watcher`, or any chief.
    Watcher,
    /// Member of `auth_chief`, or any developer.
    Chief,
    /// Member of `dev`.
    Developer,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Watcher => "watcher",
            Self::Chief => "chief",
            Self::Developer => "developer",
        })
    }
}

/// Answers tier checks for the current actor.
pub trait Authorize {
    /// True when the current actor holds `tier` or a higher one.
    fn has_tier(&self, tier: Tier) -> bool;
}

/// Node of a [`CommandTree`].
pub enum CommandNode<C> {
    /// Runs a handler.
    Leaf {
        /// Handler to run.
        handler: Handler<C>,
        /// Required tier, if any.
        tier: Option<Tier>,
    },
    /// Continues in a sub-tree.
    Fork {
        /// Sub-commands.
        tree: CommandTree<C>,
        /// Required tier, if any.
        tier: Option<Tier>,
    },
}

impl<C> CommandNode<C> {
    /// Required tier, if any.
    #[must_use]
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Self::Leaf { tier, .. } | Self::Fork { tier, .. } => *tier,
        }
    }
}

impl<C> fmt::Debug for CommandNode<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf { tier, .. } => f.debug_struct("Leaf").field("tier", tier).finish(),
            Self::Fork { tree, tier } => f
                .debug_struct("Fork")
                .field("tree", tree)
                .field("tier", tier)
                .finish(),
        }
    }
}

/// Ordered command words and their nodes.
pub struct CommandTree<C> {
    entries: Vec<(String, CommandNode<C>)>,
}

impl<C> Default for CommandTree<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C> fmt::Debug for CommandTree<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(word, node)| (word, node)))
            .finish()
    }
}

impl<C: Authorize> CommandTree<C> {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a leaf command.
    #[must_use]
    pub fn leaf(self, word: &str, tier: Option<Tier>, handler: Handler<C>) -> Self {
        self.with(word, CommandNode::Leaf { handler, tier })
    }

    /// Adds a sub-tree.
    #[must_use]
    pub fn fork(self, word: &str, tier: Option<Tier>, tree: CommandTree<C>) -> Self {
        self.with(word, CommandNode::Fork { tree, tier })
    }

    fn with(mut self, word: &str, node: CommandNode<C>) -> Self {
        let word = word.to_lowercase();
        self.entries.retain(|(existing, _)| *existing != word);
        self.entries.push((word, node));
        self
    }

    /// All command words, in registration order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(word, _)| word.as_str())
    }

    /// Command words the actor may use.
    pub fn visible_words(&self, actor: &C) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, node)| node.tier().map_or(true, |tier| actor.has_tier(tier)))
            .map(|(word, _)| word.as_str())
            .collect()
    }

    /// Routes tokens to a handler.
    ///
    /// An empty token list runs nothing and yields no replies. Unknown and
    /// denied words yield the same diagnostic.
    ///
    /// # Errors
    ///
    /// Propagates the handler's error.
    pub async fn dispatch(&self, ctx: &mut C, tokens: Vec<String>) -> Result<Vec<String>, CommandError> {
        let mut tree = self;
        let mut tokens = tokens.into_iter();

        loop {
            let Some(word) = tokens.next() else {
                return Ok(Vec::new());
            };
            let word = word.to_lowercase();

            let Some((_, node)) = tree.entries.iter().find(|(name, _)| *name == word) else {
                return Ok(vec![tree.unknown(ctx, &word)]);
            };

            if let Some(tier) = node.tier() {
                if !ctx.has_tier(tier) {
                    tracing::warn!(command = %word, %tier, "command denied");
                    return Ok(vec![tree.unknown(ctx, &word)]);
                }
            }

            match node {
                CommandNode::Leaf { handler, .. } => {
                    return handler(ctx, tokens.collect()).await;
                }
                CommandNode::Fork { tree: sub, .. } => tree = sub,
            }
        }
    }

    fn unknown(&self, actor: &C, word: &str) -> String {
        format!(
            "Unknown command {word}. Expected one of [{}]",
            self.visible_words(actor).join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Caller {
        tier: Option<Tier>,
        calls: Vec<Vec<String>>,
    }

    impl Authorize for Caller {
        fn has_tier(&self, tier: Tier) -> bool {
            self.tier.is_some_and(|own| own >= tier)
        }
    }

    fn record(caller: &mut Caller, args: Vec<String>) -> HandlerFuture<'_> {
        Box::pin(async move {
            caller.calls.push(args);
            Ok(vec!["done".to_string()])
        })
    }

    fn fail(_: &mut Caller, _: Vec<String>) -> HandlerFuture<'_> {
        Box::pin(async { Err(CommandError::argument("nope")) })
    }

    fn tree() -> CommandTree<Caller> {
        CommandTree::new()
            .fork(
                "tech",
                Some(Tier::Watcher),
                CommandTree::new()
                    .leaf("set", None, record)
                    .leaf("purge", Some(Tier::Developer), record),
            )
            .leaf("clear", Some(Tier::Chief), record)
            .leaf("fail", None, fail)
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| (*w).to_string()).collect()
    }

    #[tokio::test]
    async fn test_fork_passes_remainder() {
        let mut caller = Caller {
            tier: Some(Tier::Chief),
            ..Caller::default()
        };
        let replies = tree()
            .dispatch(&mut caller, words(&["TECH", "Set", "rs", "5"]))
            .await
            .unwrap();
        assert_eq!(replies, ["done"]);
        assert_eq!(caller.calls, vec![words(&["rs", "5"])]);
    }

    #[tokio::test]
    async fn test_denied_looks_unknown() {
        let mut caller = Caller {
            tier: Some(Tier::Watcher),
            ..Caller::default()
        };
        let tree = tree();

        let denied = tree.dispatch(&mut caller, words(&["clear"])).await.unwrap();
        let missing = tree.dispatch(&mut caller, words(&["nosuch"])).await.unwrap();
        assert_eq!(denied, ["Unknown command clear. Expected one of [tech, fail]"]);
        assert_eq!(missing, ["Unknown command nosuch. Expected one of [tech, fail]"]);

        let nested = tree.dispatch(&mut caller, words(&["tech", "purge"])).await.unwrap();
        assert_eq!(nested, ["Unknown command purge. Expected one of [set]"]);
        assert!(caller.calls.is_empty());
    }

    #[tokio::test]
    async fn test_empty_tokens() {
        let mut caller = Caller::default();
        let tree = tree();
        assert!(tree.dispatch(&mut caller, Vec::new()).await.unwrap().is_empty());
        assert!(tree.dispatch(&mut caller, words(&["fail"])).await.is_err());
    }

    #[test]
    fn test_tier_order() {
        assert!(Tier::Developer > Tier::Chief);
        assert!(Tier::Chief > Tier::Watcher);
    }

    #[test]
    fn test_reregistering_replaces() {
        let tree: CommandTree<Caller> = CommandTree::new()
            .leaf("a", None, record)
            .leaf("A", Some(Tier::Chief), record);
        assert_eq!(tree.words().collect::<Vec<_>>(), ["a"]);
    }
}
