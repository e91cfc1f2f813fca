//! # Identity — Names for Game Objects
//!
//! An [`Identity`] is just a number. It doesn't "contain" anything: the
//! [`EntityManager`](super::manager::EntityManager) maps identities to their
//! components, collections, tags and groups.
//!
//! ## Design: Monotonic, Never Reused
//!
//! Engines that recycle slots pair each index with a generation counter so a
//! stale handle can be detected. A turn-based game creates and destroys far
//! fewer objects per second, so we take the simpler route: a `u64` counter
//! that only ever goes up.
//!
//! ```text
//! allocate() → #0, #1, #2
//! release(#1)
//! allocate() → #3          ← #1 is gone for good
//! ```
//!
//! A removed identity can never come back, so any lookup through it fails
//! with [`EcsError::UnknownEntity`](crate::error::EcsError::UnknownEntity)
//! instead of silently pointing at a newer object. Ordering by value is the
//! same as ordering by creation time.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Opaque, process-unique identifier of one entity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Identity(pub(crate) u64);

impl Identity {
    /// Returns the raw value. Useful for diagnostics, not for general use.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out identities and tracks which of them are alive.
///
/// ```text
/// next: 4
/// live: {#0, #2, #3}      ← #1 was released
/// ```
#[derive(Default)]
pub(crate) struct IdentityAllocator {
    /// Next fresh value. Never decreases.
    next: u64,
    /// Identities handed out and not yet released, in creation order.
    live: BTreeSet<Identity>,
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh [`Identity`] and mark it alive.
    pub fn allocate(&mut self) -> Identity {
        let id = Identity(self.next);
        self.next += 1;
        self.live.insert(id);
        id
    }

    /// Release an identity. Returns `false` if it wasn't alive.
    pub fn release(&mut self, id: Identity) -> bool {
        self.live.remove(&id)
    }

    pub fn is_alive(&self, id: Identity) -> bool {
        self.live.contains(&id)
    }

    pub fn alive_count(&self) -> usize {
        self.live.len()
    }

    /// Live identities in ascending (creation) order.
    pub fn iter(&self) -> impl Iterator<Item = Identity> + '_ {
        self.live.iter().copied()
    }

    /// Total number of identities ever handed out.
    #[cfg(any(feature = "diagnostics", test))]
    pub fn total_allocated(&self) -> u64 {
        self.next
    }
}
