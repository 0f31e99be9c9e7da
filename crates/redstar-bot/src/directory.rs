//! Chat platform collaborators.
//!
//! The bot never talks to a chat platform directly. It sees members, roles
//! and channels through an [`EntityDirectory`] and sends or edits messages
//! through a [`MessageSink`]. Lookups are synchronous against the platform's
//! cached roster; operations that reach the platform are async.
//!
//! [`MemoryDirectory`] and [`RecordingSink`] keep everything in memory. The
//! console transport loads the directory from a JSON roster; tests build it
//! in code.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! platform_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw platform ID.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the raw platform ID.
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

platform_id!(
    /// Platform user ID. Its decimal form keys the player store.
    MemberId
);
platform_id!(
    /// Platform role ID.
    RoleId
);
platform_id!(
    /// Platform channel ID.
    ChannelId
);
platform_id!(
    /// Platform message ID.
    MessageId
);

/// A guild member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member ID.
    pub id: MemberId,
    /// Account name.
    pub name: String,
    /// Guild nickname, shown instead of the name when set.
    #[serde(default)]
    pub nick: Option<String>,
}

impl Member {
    /// Name shown in replies.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or(&self.name)
    }
}

/// A guild role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role ID.
    pub id: RoleId,
    /// Role name.
    pub name: String,
}

// =============================================================================
// Traits
// =============================================================================

/// Members, roles and channels of the guild.
#[async_trait(?Send)]
pub trait EntityDirectory {
    /// Member by ID.
    fn member(&self, id: MemberId) -> Option<Member>;

    /// Member by account name, falling back to nickname.
    fn member_named(&self, name: &str) -> Option<Member>;

    /// Role by ID.
    fn role(&self, id: RoleId) -> Option<Role>;

    /// Role by exact name.
    fn role_named(&self, name: &str) -> Option<Role>;

    /// Members holding a role, in directory order.
    fn members_of_role(&self, id: RoleId) -> Vec<MemberId>;

    /// Roles held by a member.
    fn member_roles(&self, id: MemberId) -> Vec<RoleId>;

    /// Channel name, `None` once the channel is gone.
    fn channel_name(&self, id: ChannelId) -> Option<String>;

    /// Grants roles to a member.
    async fn add_roles(&self, member: MemberId, roles: &[RoleId]) -> Result<(), DirectoryError>;

    /// Revokes roles from a member.
    async fn remove_roles(&self, member: MemberId, roles: &[RoleId])
        -> Result<(), DirectoryError>;
}

/// Outbound messaging.
#[async_trait(?Send)]
pub trait MessageSink {
    /// Posts to a channel and returns the new message's ID.
    async fn send(&self, channel: ChannelId, content: &str) -> Result<MessageId, DirectoryError>;

    /// Sends a direct message to a member.
    async fn send_direct(&self, member: MemberId, content: &str) -> Result<(), DirectoryError>;

    /// Content of a message, `None` when it no longer exists.
    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<Option<String>, DirectoryError>;

    /// Replaces a message's content.
    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: &str,
    ) -> Result<(), DirectoryError>;

    /// Deletes a message.
    async fn delete_message(&self, channel: ChannelId, message: MessageId)
        -> Result<(), DirectoryError>;

    /// IDs of the `limit` oldest messages of a channel, oldest first.
    async fn history(&self, channel: ChannelId, limit: usize)
        -> Result<Vec<MessageId>, DirectoryError>;

    /// Deletes up to `limit` of the newest messages posted after `after`
    /// (or anywhere when `None`). Returns how many were deleted.
    async fn purge(
        &self,
        channel: ChannelId,
        limit: usize,
        after: Option<MessageId>,
    ) -> Result<usize, DirectoryError>;
}

// =============================================================================
// In-memory directory
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RosterMember {
    #[serde(flatten)]
    member: Member,
    #[serde(default)]
    roles: Vec<RoleId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RosterChannel {
    id: ChannelId,
    name: String,
}

/// Roster held in memory, loadable from JSON.
///
/// ```
/// use redstar_bot::{EntityDirectory, MemberId, MemoryDirectory};
///
/// let directory = MemoryDirectory::from_json_str(r#"{
///     "members": [{"id": 1, "name": "ada", "roles": [10]}],
///     "roles": [{"id": 10, "name": "pilots"}],
///     "channels": [{"id": 100, "name": "ws-alpha"}]
/// }"#).unwrap();
/// assert_eq!(directory.member_named("ada").map(|m| m.id), Some(MemberId::new(1)));
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MemoryDirectory {
    #[serde(default)]
    members: RefCell<Vec<RosterMember>>,
    #[serde(default)]
    roles: Vec<Role>,
    #[serde(default)]
    channels: RefCell<Vec<RosterChannel>>,
}

impl MemoryDirectory {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON roster.
    ///
    /// # Errors
    ///
    /// Returns the parse error for malformed rosters.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Adds a member holding some roles.
    #[must_use]
    pub fn with_member(self, id: u64, name: &str, roles: &[u64]) -> Self {
        self.members.borrow_mut().push(RosterMember {
            member: Member {
                id: MemberId::new(id),
                name: name.to_string(),
                nick: None,
            },
            roles: roles.iter().copied().map(RoleId::new).collect(),
        });
        self
    }

    /// Adds a role.
    #[must_use]
    pub fn with_role(mut self, id: u64, name: &str) -> Self {
        self.roles.push(Role {
            id: RoleId::new(id),
            name: name.to_string(),
        });
        self
    }

    /// Adds a channel.
    #[must_use]
    pub fn with_channel(self, id: u64, name: &str) -> Self {
        self.channels.borrow_mut().push(RosterChannel {
            id: ChannelId::new(id),
            name: name.to_string(),
        });
        self
    }

    /// Removes a channel, as if it had been deleted on the platform.
    pub fn remove_channel(&self, id: ChannelId) {
        self.channels.borrow_mut().retain(|channel| channel.id != id);
    }

    /// Number of members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.borrow().len()
    }
}

#[async_trait(?Send)]
impl EntityDirectory for MemoryDirectory {
    fn member(&self, id: MemberId) -> Option<Member> {
        self.members
            .borrow()
            .iter()
            .find(|entry| entry.member.id == id)
            .map(|entry| entry.member.clone())
    }

    fn member_named(&self, name: &str) -> Option<Member> {
        let members = self.members.borrow();
        members
            .iter()
            .find(|entry| entry.member.name == name)
            .or_else(|| {
                members
                    .iter()
                    .find(|entry| entry.member.nick.as_deref() == Some(name))
            })
            .map(|entry| entry.member.clone())
    }

    fn role(&self, id: RoleId) -> Option<Role> {
        self.roles.iter().find(|role| role.id == id).cloned()
    }

    fn role_named(&self, name: &str) -> Option<Role> {
        self.roles.iter().find(|role| role.name == name).cloned()
    }

    fn members_of_role(&self, id: RoleId) -> Vec<MemberId> {
        self.members
            .borrow()
            .iter()
            .filter(|entry| entry.roles.contains(&id))
            .map(|entry| entry.member.id)
            .collect()
    }

    fn member_roles(&self, id: MemberId) -> Vec<RoleId> {
        self.members
            .borrow()
            .iter()
            .find(|entry| entry.member.id == id)
            .map(|entry| entry.roles.clone())
            .unwrap_or_default()
    }

    fn channel_name(&self, id: ChannelId) -> Option<String> {
        self.channels
            .borrow()
            .iter()
            .find(|channel| channel.id == id)
            .map(|channel| channel.name.clone())
    }

    async fn add_roles(&self, member: MemberId, roles: &[RoleId]) -> Result<(), DirectoryError> {
        let mut members = self.members.borrow_mut();
        let entry = members
            .iter_mut()
            .find(|entry| entry.member.id == member)
            .ok_or(DirectoryError::UnknownMember(member.as_u64()))?;
        for role in roles {
            if !entry.roles.contains(role) {
                entry.roles.push(*role);
            }
        }
        Ok(())
    }

    async fn remove_roles(
        &self,
        member: MemberId,
        roles: &[RoleId],
    ) -> Result<(), DirectoryError> {
        let mut members = self.members.borrow_mut();
        let entry = members
            .iter_mut()
            .find(|entry| entry.member.id == member)
            .ok_or(DirectoryError::UnknownMember(member.as_u64()))?;
        entry.roles.retain(|role| !roles.contains(role));
        Ok(())
    }
}

// =============================================================================
// In-memory sink
// =============================================================================

/// Message sink that keeps every channel's messages in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    channels: RefCell<BTreeMap<ChannelId, Vec<(MessageId, String)>>>,
    direct: RefCell<Vec<(MemberId, String)>>,
    next_id: Cell<u64>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current messages of a channel, oldest first.
    #[must_use]
    pub fn messages(&self, channel: ChannelId) -> Vec<String> {
        self.channels
            .borrow()
            .get(&channel)
            .map(|messages| messages.iter().map(|(_, text)| text.clone()).collect())
            .unwrap_or_default()
    }

    /// Direct messages sent so far.
    #[must_use]
    pub fn direct_messages(&self) -> Vec<(MemberId, String)> {
        self.direct.borrow().clone()
    }

    /// Records an inbound message, as if a member had posted it.
    pub fn post(&self, channel: ChannelId, content: &str) -> MessageId {
        let id = MessageId::new(self.next_id.get() + 1);
        self.next_id.set(id.as_u64());
        self.channels
            .borrow_mut()
            .entry(channel)
            .or_default()
            .push((id, content.to_string()));
        id
    }
}

#[async_trait(?Send)]
impl MessageSink for RecordingSink {
    async fn send(&self, channel: ChannelId, content: &str) -> Result<MessageId, DirectoryError> {
        Ok(self.post(channel, content))
    }

    async fn send_direct(&self, member: MemberId, content: &str) -> Result<(), DirectoryError> {
        self.direct.borrow_mut().push((member, content.to_string()));
        Ok(())
    }

    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<Option<String>, DirectoryError> {
        Ok(self.channels.borrow().get(&channel).and_then(|messages| {
            messages
                .iter()
                .find(|(id, _)| *id == message)
                .map(|(_, text)| text.clone())
        }))
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: &str,
    ) -> Result<(), DirectoryError> {
        let mut channels = self.channels.borrow_mut();
        let slot = channels
            .get_mut(&channel)
            .and_then(|messages| messages.iter_mut().find(|(id, _)| *id == message))
            .ok_or(DirectoryError::UnknownMessage(message.as_u64()))?;
        slot.1 = content.to_string();
        Ok(())
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), DirectoryError> {
        let mut channels = self.channels.borrow_mut();
        let messages = channels
            .get_mut(&channel)
            .ok_or(DirectoryError::UnknownChannel(channel.as_u64()))?;
        let before = messages.len();
        messages.retain(|(id, _)| *id != message);
        if messages.len() == before {
            return Err(DirectoryError::UnknownMessage(message.as_u64()));
        }
        Ok(())
    }

    async fn history(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<MessageId>, DirectoryError> {
        Ok(self
            .channels
            .borrow()
            .get(&channel)
            .map(|messages| messages.iter().take(limit).map(|(id, _)| *id).collect())
            .unwrap_or_default())
    }

    async fn purge(
        &self,
        channel: ChannelId,
        limit: usize,
        after: Option<MessageId>,
    ) -> Result<usize, DirectoryError> {
        let mut channels = self.channels.borrow_mut();
        let Some(messages) = channels.get_mut(&channel) else {
            return Ok(0);
        };
        let floor = after
            .and_then(|after| messages.iter().position(|(id, _)| *id == after))
            .map_or(0, |index| index + 1);
        let eligible = messages.len() - floor;
        let count = eligible.min(limit);
        messages.truncate(messages.len() - count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> MemoryDirectory {
        MemoryDirectory::new()
            .with_member(1, "ada", &[10])
            .with_member(2, "bob", &[10, 11])
            .with_role(10, "pilots")
            .with_role(11, "leaders")
            .with_channel(100, "ws-alpha")
    }

    #[test]
    fn test_lookups() {
        let dir = directory();
        assert_eq!(dir.member(MemberId::new(2)).unwrap().name, "bob");
        assert_eq!(dir.role_named("leaders").unwrap().id, RoleId::new(11));
        assert_eq!(
            dir.members_of_role(RoleId::new(10)),
            vec![MemberId::new(1), MemberId::new(2)]
        );
        assert_eq!(dir.channel_name(ChannelId::new(100)).as_deref(), Some("ws-alpha"));
        assert!(dir.member(MemberId::new(3)).is_none());
    }

    #[test]
    fn test_display_name_prefers_nick() {
        let member = Member {
            id: MemberId::new(1),
            name: "ada".into(),
            nick: Some("Countess".into()),
        };
        assert_eq!(member.display_name(), "Countess");
    }

    #[test]
    fn test_roster_json() {
        let dir = MemoryDirectory::from_json_str(
            r#"{"members": [{"id": 5, "name": "eve", "nick": "E", "roles": [1]}],
                "roles": [{"id": 1, "name": "chiefs"}]}"#,
        )
        .unwrap();
        assert_eq!(dir.member_named("E").unwrap().id, MemberId::new(5));
        assert_eq!(dir.member_roles(MemberId::new(5)), vec![RoleId::new(1)]);
    }

    #[tokio::test]
    async fn test_role_changes() {
        let dir = directory();
        dir.add_roles(MemberId::new(1), &[RoleId::new(11)]).await.unwrap();
        assert_eq!(dir.members_of_role(RoleId::new(11)).len(), 2);
        dir.remove_roles(MemberId::new(2), &[RoleId::new(10), RoleId::new(11)])
            .await
            .unwrap();
        assert!(dir.member_roles(MemberId::new(2)).is_empty());
        assert!(dir.add_roles(MemberId::new(9), &[RoleId::new(10)]).await.is_err());
    }

    #[tokio::test]
    async fn test_sink_edit_and_purge() {
        let sink = RecordingSink::new();
        let channel = ChannelId::new(1);
        let first = sink.post(channel, "one");
        sink.post(channel, "two");
        let status = sink.send(channel, "three").await.unwrap();
        sink.edit_message(channel, status, "three!").await.unwrap();
        assert_eq!(sink.fetch_message(channel, status).await.unwrap().as_deref(), Some("three!"));

        assert_eq!(sink.history(channel, 2).await.unwrap().len(), 2);
        assert_eq!(sink.purge(channel, 5, Some(first)).await.unwrap(), 2);
        assert_eq!(sink.messages(channel), vec!["one".to_string()]);
    }
}
