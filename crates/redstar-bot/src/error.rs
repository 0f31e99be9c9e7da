//! Error types of the bot crate.
//!
//! Expected misses (unknown mention, unknown tech) are not errors; they come
//! back as diagnostics next to partial results. The types here cover argument
//! warnings shown verbatim to the user and internal failures.

use thiserror::Error;

use crate::persist::Document;

/// Failure of a chat platform operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The channel does not exist (anymore).
    #[error("unknown channel {0}")]
    UnknownChannel(u64),
    /// The member does not exist (anymore).
    #[error("unknown member {0}")]
    UnknownMember(u64),
    /// The message does not exist (anymore).
    #[error("unknown message {0}")]
    UnknownMessage(u64),
    /// The platform refused the operation.
    #[error("platform refused: {0}")]
    Refused(String),
}

/// Failure to load or save a document.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("{document} document: {source}")]
    Io {
        /// Document being accessed
        document: Document,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid JSON of the expected shape.
    #[error("{document} document: {source}")]
    Json {
        /// Document being accessed
        document: Document,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

/// Failure inside a command handler.
#[derive(Debug, Error)]
pub enum CommandError {
    /// User-facing warning, appended to the reply verbatim.
    #[error("{0}")]
    Argument(String),
    /// Chat platform failure.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    /// Persistence failure during an explicit save.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Broken internal invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CommandError {
    /// Shorthand for [`CommandError::Argument`].
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }
}
