//! Bot configuration from the environment.
//!
//! | Variable              | Required | Meaning |
//! |-----------------------|----------|---------|
//! | `REDSTAR_DEV_AUTHORS` | yes      | comma-separated developer member IDs |
//! | `REDSTAR_OK_CHANNELS` | no       | channels where anyone may query others |
//! | `REDSTAR_DATA_DIR`    | no       | document directory, default `var` |

use std::path::PathBuf;

use thiserror::Error;

use crate::directory::MemberId;

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// A variable holds an unusable value.
    #[error("Invalid value for environment variable {var}: {reason}")]
    InvalidEnvValue {
        /// Variable name
        var: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Static bot configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    /// Members of the protected `dev` group.
    pub dev_authors: Vec<MemberId>,
    /// Channel names where non-chiefs may look at or change other players.
    pub ok_channels: Vec<String>,
    /// Directory of the persisted documents.
    pub data_dir: PathBuf,
}

impl BotConfig {
    /// Creates a configuration with the default data directory.
    #[must_use]
    pub fn new(dev_authors: Vec<MemberId>, ok_channels: Vec<String>) -> Self {
        Self {
            dev_authors,
            ok_channels,
            data_dir: PathBuf::from("var"),
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `REDSTAR_DEV_AUTHORS` is missing, empty or
    /// holds something other than member IDs.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`BotConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        const DEV_AUTHORS: &str = "REDSTAR_DEV_AUTHORS";

        let raw = lookup(DEV_AUTHORS).ok_or_else(|| ConfigError::MissingEnvVar(DEV_AUTHORS.into()))?;
        let dev_authors = split_list(&raw)
            .map(|id| {
                id.parse::<u64>()
                    .map(MemberId::new)
                    .map_err(|_| ConfigError::InvalidEnvValue {
                        var: DEV_AUTHORS.into(),
                        reason: format!("{id:?} is not a member id"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if dev_authors.is_empty() {
            return Err(ConfigError::InvalidEnvValue {
                var: DEV_AUTHORS.into(),
                reason: "no developer listed".into(),
            });
        }

        let ok_channels = lookup("REDSTAR_OK_CHANNELS")
            .map(|raw| split_list(&raw).map(str::to_string).collect())
            .unwrap_or_default();

        let data_dir = lookup("REDSTAR_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map_or_else(|| PathBuf::from("var"), PathBuf::from);

        Ok(Self {
            dev_authors,
            ok_channels,
            data_dir,
        })
    }

    /// True when the channel lets anyone target other players.
    #[must_use]
    pub fn is_ok_channel(&self, channel_name: &str) -> bool {
        self.ok_channels.iter().any(|name| name == channel_name)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn test_full_environment() {
        let config = BotConfig::from_lookup(lookup(&[
            ("REDSTAR_DEV_AUTHORS", "1, 2"),
            ("REDSTAR_OK_CHANNELS", "bot-spam,ws-chat"),
            ("REDSTAR_DATA_DIR", "/tmp/redstar"),
        ]))
        .unwrap();
        assert_eq!(config.dev_authors, vec![MemberId::new(1), MemberId::new(2)]);
        assert!(config.is_ok_channel("ws-chat"));
        assert!(!config.is_ok_channel("general"));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/redstar"));
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::from_lookup(lookup(&[("REDSTAR_DEV_AUTHORS", "7")])).unwrap();
        assert!(config.ok_channels.is_empty());
        assert_eq!(config.data_dir, PathBuf::from("var"));
    }

    #[test]
    fn test_missing_devs() {
        assert_eq!(
            BotConfig::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::MissingEnvVar("REDSTAR_DEV_AUTHORS".into())
        );
    }

    #[test]
    fn test_bad_dev_id() {
        assert!(matches!(
            BotConfig::from_lookup(lookup(&[("REDSTAR_DEV_AUTHORS", "1,bob")])),
            Err(ConfigError::InvalidEnvValue { .. })
        ));
        assert!(matches!(
            BotConfig::from_lookup(lookup(&[("REDSTAR_DEV_AUTHORS", " , ")])),
            Err(ConfigError::InvalidEnvValue { .. })
        ));
    }
}
