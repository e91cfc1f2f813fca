//! # Tags — Unique Names for Single Entities
//!
//! A tag is a unique key pointing at exactly one entity: `"player"`,
//! `"stairs_down"`, `"boss"`. Registering a tag that is already in use
//! repoints it; an entity may carry any number of tags.
//!
//! ```text
//! by_tag:    "player" → #4      "camera_target" → #4
//! by_entity: #4 → ["player", "camera_target"]
//! ```
//!
//! The [`EntityManager`](super::manager::EntityManager) owns one of these and
//! purges an entity's tags when it is removed.

use std::collections::HashMap;

use super::identity::Identity;
use crate::error::{EcsError, EcsResult};

#[derive(Debug, Default)]
pub struct TagManager {
    by_tag: HashMap<String, Identity>,
    by_entity: HashMap<Identity, Vec<String>>,
}

impl TagManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `tag` at `id`, overwriting any previous mapping. Returns the
    /// entity the tag pointed at before, if any.
    pub fn register(&mut self, id: Identity, tag: &str) -> Option<Identity> {
        let previous = self.by_tag.insert(tag.to_string(), id);
        match previous {
            Some(old) if old == id => return previous,
            Some(old) => {
                log::warn!("tag \"{tag}\" repointed from {old} to {id}");
                self.forget(old, tag);
            }
            None => {}
        }
        self.by_entity.entry(id).or_default().push(tag.to_string());
        previous
    }

    /// Remove `tag` in both directions. Returns the entity it pointed at.
    pub fn unregister(&mut self, tag: &str) -> Option<Identity> {
        let id = self.by_tag.remove(tag)?;
        self.forget(id, tag);
        Some(id)
    }

    fn forget(&mut self, id: Identity, tag: &str) {
        if let Some(tags) = self.by_entity.get_mut(&id) {
            tags.retain(|t| t != tag);
            if tags.is_empty() {
                self.by_entity.remove(&id);
            }
        }
    }

    /// The entity tagged `tag`.
    pub fn get(&self, tag: &str) -> EcsResult<Identity> {
        self.try_get(tag)
            .ok_or_else(|| EcsError::UnknownTag(tag.to_string()))
    }

    /// The entity tagged `tag`, or `None`.
    pub fn try_get(&self, tag: &str) -> Option<Identity> {
        self.by_tag.get(tag).copied()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.by_tag.contains_key(tag)
    }

    /// Tags carried by `id`, in registration order.
    pub fn tags_of(&self, id: Identity) -> &[String] {
        self.by_entity.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Drop every tag of `id`. Returns how many were dropped.
    pub fn purge(&mut self, id: Identity) -> usize {
        let Some(tags) = self.by_entity.remove(&id) else {
            return 0;
        };
        for tag in &tags {
            self.by_tag.remove(tag);
        }
        tags.len()
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_tag.clear();
        self.by_entity.clear();
    }
}
