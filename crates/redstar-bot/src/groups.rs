//! Named member sets.
//!
//! A group stores a definition (space-separated member and role mentions) and
//! the member IDs it last resolved to. Membership is re-resolved when the
//! group is set, and for every group at most once per
//! [`REFRESH_INTERVAL_SECS`], checked before each command.
//!
//! The `dev` group is special: it always holds exactly the configured
//! developers, is never taken from saved state and cannot be changed by
//! commands. `auth_chief` and `auth_watcher` back the authorization tiers.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::MemberId;
use crate::resolver::{member_mention, TokenResolver, WhoOptions};

/// Developer group.
pub const DEV_GROUP: &str = "dev";
/// Chief tier group.
pub const CHIEF_GROUP: &str = "auth_chief";
/// Watcher tier group.
pub const WATCHER_GROUP: &str = "auth_watcher";

/// Minimum time between two bulk refreshes.
pub const REFRESH_INTERVAL_SECS: i64 = 20;

const PROTECTED: &[&str] = &[DEV_GROUP];

/// One named group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Space-separated mention tokens.
    pub defn: String,
    /// Members the definition last resolved to.
    #[serde(default)]
    pub members: Vec<MemberId>,
}

/// All groups plus refresh bookkeeping.
#[derive(Debug, Clone)]
pub struct GroupRegistry {
    groups: BTreeMap<String, Group>,
    admins: Vec<MemberId>,
    next_refresh: Option<DateTime<Utc>>,
    dirty: bool,
}

impl GroupRegistry {
    /// Creates a registry holding only the `dev` group.
    #[must_use]
    pub fn new(admins: Vec<MemberId>) -> Self {
        Self::from_saved(BTreeMap::new(), admins)
    }

    /// Restores saved groups. A saved `dev` group is replaced.
    #[must_use]
    pub fn from_saved(mut groups: BTreeMap<String, Group>, admins: Vec<MemberId>) -> Self {
        let dev = Group {
            defn: admins
                .iter()
                .map(|id| member_mention(*id))
                .collect::<Vec<_>>()
                .join(" "),
            members: admins.clone(),
        };
        groups.insert(DEV_GROUP.to_string(), dev);

        Self {
            groups,
            admins,
            next_refresh: None,
            dirty: false,
        }
    }

    /// Stores a definition and resolves it at once.
    pub fn set(&mut self, name: &str, defn: &str, resolver: &mut TokenResolver<'_>) {
        self.groups.insert(
            name.to_string(),
            Group {
                defn: defn.to_string(),
                members: Vec::new(),
            },
        );
        self.refresh(name, resolver);
        self.dirty = true;
    }

    /// Removes a group. The next check refreshes every group.
    pub fn remove(&mut self, name: &str) -> bool {
        let removed = self.groups.remove(name).is_some();
        if removed {
            self.next_refresh = None;
            self.dirty = true;
        }
        removed
    }

    /// Re-resolves one group.
    pub fn refresh(&mut self, name: &str, resolver: &mut TokenResolver<'_>) {
        let Some(group) = self.groups.get_mut(name) else {
            return;
        };

        let members = if name == DEV_GROUP {
            self.admins.clone()
        } else {
            let tokens: Vec<String> = group.defn.split(' ').map(str::to_string).collect();
            resolver.parse_who(&tokens, WhoOptions::default()).who
        };

        if group.members != members {
            group.members = members;
            self.dirty = true;
        }
    }

    /// Re-resolves every group and schedules the next bulk refresh.
    pub fn refresh_all(&mut self, now: DateTime<Utc>, resolver: &mut TokenResolver<'_>) {
        let names: Vec<String> = self.groups.keys().cloned().collect();
        for name in &names {
            self.refresh(name, resolver);
        }
        self.next_refresh = Some(now + Duration::seconds(REFRESH_INTERVAL_SECS));
        tracing::debug!(groups = names.len(), "groups refreshed");
    }

    /// True when a bulk refresh is due.
    #[must_use]
    pub fn refresh_due(&self, now: DateTime<Utc>) -> bool {
        self.next_refresh.map_or(true, |next| next < now)
    }

    /// True when the member belongs to the group.
    #[must_use]
    pub fn contains_member(&self, name: &str, id: MemberId) -> bool {
        self.groups
            .get(name)
            .is_some_and(|group| group.members.contains(&id))
    }

    /// True for groups commands may not touch.
    #[must_use]
    pub fn is_protected(&self, name: &str) -> bool {
        PROTECTED.contains(&name)
    }

    /// True when the group exists.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Group by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Groups in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Group)> {
        self.groups.iter().map(|(name, group)| (name.as_str(), group))
    }

    /// Persisted form.
    #[must_use]
    pub fn saved(&self) -> &BTreeMap<String, Group> {
        &self.groups
    }

    /// True when groups changed since the last save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag after a save.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use redstar_tech::{PlayerStore, TechCatalog};

    use super::*;
    use crate::directory::MemoryDirectory;

    fn directory() -> MemoryDirectory {
        MemoryDirectory::new()
            .with_member(1, "ada", &[10])
            .with_member(2, "bob", &[10])
            .with_member(3, "cy", &[])
            .with_role(10, "chiefs")
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_set_resolves_members() {
        let dir = directory();
        let mut players = PlayerStore::new(Arc::new(TechCatalog::standard()));
        let mut groups = GroupRegistry::new(vec![MemberId::new(3)]);

        let mut resolver = TokenResolver::new(&dir, &mut players);
        groups.set(CHIEF_GROUP, "<@&10> <@!3>", &mut resolver);

        assert!(groups.contains_member(CHIEF_GROUP, MemberId::new(1)));
        assert!(groups.contains_member(CHIEF_GROUP, MemberId::new(3)));
        assert!(!groups.contains_member(WATCHER_GROUP, MemberId::new(1)));
        assert!(groups.is_dirty());
    }

    #[test]
    fn test_dev_is_always_the_admins() {
        let dir = directory();
        let mut players = PlayerStore::new(Arc::new(TechCatalog::standard()));
        let mut saved = BTreeMap::new();
        saved.insert(
            DEV_GROUP.to_string(),
            Group {
                defn: "<@!1> <@!2>".into(),
                members: vec![MemberId::new(1), MemberId::new(2)],
            },
        );

        let mut groups = GroupRegistry::from_saved(saved, vec![MemberId::new(3)]);
        assert_eq!(groups.get(DEV_GROUP).unwrap().members, vec![MemberId::new(3)]);

        groups.refresh_all(at(0), &mut TokenResolver::new(&dir, &mut players));
        assert_eq!(groups.get(DEV_GROUP).unwrap().members, vec![MemberId::new(3)]);
        assert!(groups.is_protected(DEV_GROUP));
        assert!(!groups.is_protected(CHIEF_GROUP));
    }

    #[test]
    fn test_refresh_schedule() {
        let dir = directory();
        let mut players = PlayerStore::new(Arc::new(TechCatalog::standard()));
        let mut groups = GroupRegistry::new(Vec::new());
        assert!(groups.refresh_due(at(0)));

        groups.refresh_all(at(0), &mut TokenResolver::new(&dir, &mut players));
        assert!(!groups.refresh_due(at(REFRESH_INTERVAL_SECS)));
        assert!(groups.refresh_due(at(REFRESH_INTERVAL_SECS + 1)));

        groups.refresh_all(at(30), &mut TokenResolver::new(&dir, &mut players));
        groups.set("crew", "<@!1>", &mut TokenResolver::new(&dir, &mut players));
        assert!(groups.remove("crew"));
        assert!(groups.refresh_due(at(31)));
        assert!(!groups.remove("crew"));
    }
}
