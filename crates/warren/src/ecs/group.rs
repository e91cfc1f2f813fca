//! # Groups — Named Sets of Entities
//!
//! A group is a key naming a set of entities (`"goblins"`, `"party"`). Each
//! entity belongs to at most one group: assigning a new group silently evicts
//! the entity from its previous one.
//!
//! Groups persist once created, even when they become empty, so asking for the
//! members of an emptied group yields an empty set rather than an error.

use std::collections::{BTreeSet, HashMap};

use super::identity::Identity;
use crate::error::{EcsError, EcsResult};

#[derive(Debug, Default)]
pub struct GroupManager {
    members: HashMap<String, BTreeSet<Identity>>,
    group_of: HashMap<Identity, String>,
}

impl GroupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `id` into `group`, leaving its previous group first. Returns the
    /// previous group, if it was a different one.
    pub fn set(&mut self, group: &str, id: Identity) -> Option<String> {
        if self.try_group_of(id) == Some(group) {
            return None;
        }
        let previous = self.remove(id);
        self.members.entry(group.to_string()).or_default().insert(id);
        self.group_of.insert(id, group.to_string());
        previous
    }

    /// Take `id` out of its group. Returns the group it left.
    pub fn remove(&mut self, id: Identity) -> Option<String> {
        let group = self.group_of.remove(&id)?;
        if let Some(set) = self.members.get_mut(&group) {
            set.remove(&id);
        }
        Some(group)
    }

    /// The group `id` belongs to.
    pub fn group_of(&self, id: Identity) -> EcsResult<&str> {
        self.try_group_of(id).ok_or(EcsError::Ungrouped(id))
    }

    pub fn try_group_of(&self, id: Identity) -> Option<&str> {
        self.group_of.get(&id).map(String::as_str)
    }

    /// Members of `group`, in identity order.
    pub fn members(&self, group: &str) -> EcsResult<&BTreeSet<Identity>> {
        self.members
            .get(group)
            .ok_or_else(|| EcsError::UnknownGroup(group.to_string()))
    }

    pub fn contains_group(&self, group: &str) -> bool {
        self.members.contains_key(group)
    }

    /// Every group key, in no particular order.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.group_of.clear();
    }
}
