//! # Filtered Collection — Live Views Over Component Sets
//!
//! A [`FilteredCollection`] is a materialized view: at every observable moment
//! its members are exactly the live entities that carry all of its required
//! component types. It is a query result that keeps itself up to date, not a
//! snapshot.
//!
//! ## Protocol
//!
//! ```text
//! 1. Construction:   manager scans every live entity once (back-fill)
//! 2. Steady state:   manager announces every structural change
//!      create / add component        → add(entity)     re-tests the filter
//!      remove component / entity     → remove(entity)  fires Removed first
//! ```
//!
//! `add` is idempotent: after any component add, the manager re-announces the
//! entity to every collection, since a collection can't know in advance
//! whether the new component is the one it was missing.
//!
//! ## Memoization
//!
//! Collections are keyed by the sorted, de-duplicated list of their component
//! type ids plus the name of their comparator. `(A, B)`, `(B, A)` and
//! `(A, B, A)` all name the same collection, so the manager hands out the
//! same [`CollectionId`].
//!
//! ## Order
//!
//! Members are kept sorted, by identity (creation order) or by a caller
//! supplied [`SortBy`] with identity as tie-breaker, so iteration is
//! repeatable from run to run.

use std::any::TypeId;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use super::component::{Component, ComponentTypeId};
use super::entity::EntityRef;
use super::identity::Identity;
use super::store::ComponentStore;

/// Handle to a collection owned by an [`EntityManager`](super::manager::EntityManager).
///
/// Two equal ids name the same collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionId(pub(crate) usize);

/// Membership change delivered to collection observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionEvent {
    /// The entity now matches the filter.
    Added(Identity),
    /// The entity is about to stop matching. Its components are still readable.
    Removed(Identity),
}

impl CollectionEvent {
    pub fn entity(self) -> Identity {
        match self {
            CollectionEvent::Added(id) | CollectionEvent::Removed(id) => id,
        }
    }
}

/// Compares two entities for a sorted collection.
pub type CompareFn = fn(EntityRef<'_>, EntityRef<'_>) -> Ordering;

/// A named comparator. The name is the comparator's identity for memoization:
/// two `SortBy` values with the same name request the same collection.
///
/// ```ignore
/// fn by_speed(a: EntityRef, b: EntityRef) -> Ordering {
///     let speed = |e: EntityRef| e.get::<Speed>().map_or(0, |s| s.0);
///     speed(b).cmp(&speed(a))
/// }
/// let actors = em.query_sorted::<(ActionPoints, Speed)>(SortBy::new("speed", by_speed))?;
/// ```
#[derive(Clone, Copy)]
pub struct SortBy {
    name: &'static str,
    compare: CompareFn,
}

impl SortBy {
    pub const fn new(name: &'static str, compare: CompareFn) -> Self {
        Self { name, compare }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SortBy").field(&self.name).finish()
    }
}

/// Memoization key of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CollectionKey {
    pub types: Vec<ComponentTypeId>,
    pub order: Option<&'static str>,
}

/// Normalize a requested type list into a key (sorted, de-duplicated), so
/// request order never produces two collections for the same query.
pub(crate) fn collection_key(
    mut types: Vec<ComponentTypeId>,
    sort: Option<SortBy>,
) -> CollectionKey {
    types.sort();
    types.dedup();
    CollectionKey {
        types,
        order: sort.map(|s| s.name),
    }
}

// ── ComponentSet (tuple support) ─────────────────────────────────────────

/// A set of component types named by a tuple, used to request collections.
///
/// Implemented for tuples of components up to 8 elements.
pub trait ComponentSet {
    /// `TypeId` and type name of every member type.
    fn type_ids() -> Vec<(TypeId, &'static str)>;
}

macro_rules! impl_component_set {
    ($($T:ident),+) => {
        impl<$($T: Component),+> ComponentSet for ($($T,)+) {
            fn type_ids() -> Vec<(TypeId, &'static str)> {
                vec![$((TypeId::of::<$T>(), std::any::type_name::<$T>())),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

// ── FilteredCollection ───────────────────────────────────────────────────

type Observer = Box<dyn FnMut(CollectionEvent, EntityRef<'_>)>;

/// Live, ordered set of the entities that carry every required component type.
pub struct FilteredCollection {
    id: CollectionId,
    /// Required types, sorted and de-duplicated.
    types: Vec<ComponentTypeId>,
    sort: Option<SortBy>,
    /// Members in iteration order.
    members: Vec<Identity>,
    /// Same members, for O(1) membership tests.
    index: HashSet<Identity>,
    observers: Vec<Observer>,
}

impl FilteredCollection {
    pub(crate) fn new(id: CollectionId, key: CollectionKey, sort: Option<SortBy>) -> Self {
        Self {
            id,
            types: key.types,
            sort,
            members: Vec::new(),
            index: HashSet::new(),
            observers: Vec::new(),
        }
    }

    pub fn id(&self) -> CollectionId {
        self.id
    }

    /// Required component types, sorted.
    pub fn types(&self) -> &[ComponentTypeId] {
        &self.types
    }

    /// Is `type_id` one of the required types?
    pub fn contains_type(&self, type_id: ComponentTypeId) -> bool {
        self.types.binary_search(&type_id).is_ok()
    }

    /// Name of the comparator, if the collection is sorted by one.
    pub fn sort_name(&self) -> Option<&'static str> {
        self.sort.map(|s| s.name)
    }

    /// Does `id` currently satisfy the filter?
    pub fn matches(&self, id: Identity, store: &ComponentStore) -> bool {
        store.contains_all(id, &self.types)
    }

    /// Offer `id` to the collection. Inserts it and fires
    /// [`CollectionEvent::Added`] if it matches and isn't a member yet.
    ///
    /// Returns whether it was inserted.
    pub(crate) fn add(&mut self, id: Identity, store: &ComponentStore) -> bool {
        if self.index.contains(&id) || !self.matches(id, store) {
            return false;
        }
        let position = self.insertion_point(id, store);
        self.members.insert(position, id);
        self.index.insert(id);
        log::trace!("{:?}: + {id}", self.id);
        self.notify(CollectionEvent::Added(id), store);
        true
    }

    /// Withdraw `id` from the collection. If it is a member, fires
    /// [`CollectionEvent::Removed`] while its components are still readable,
    /// then removes it.
    ///
    /// Returns whether it was removed.
    pub(crate) fn remove(&mut self, id: Identity, store: &ComponentStore) -> bool {
        if !self.index.contains(&id) {
            return false;
        }
        self.notify(CollectionEvent::Removed(id), store);
        self.index.remove(&id);
        // Sort keys may have changed since insertion, so search linearly.
        if let Some(position) = self.members.iter().position(|&m| m == id) {
            self.members.remove(position);
        }
        log::trace!("{:?}: - {id}", self.id);
        true
    }

    fn insertion_point(&self, id: Identity, store: &ComponentStore) -> usize {
        match self.sort {
            Some(sort) => {
                let new = EntityRef::new(id, store);
                self.members.partition_point(|&m| {
                    let existing = EntityRef::new(m, store);
                    (sort.compare)(existing, new).then(m.cmp(&id)) == Ordering::Less
                })
            }
            None => self.members.partition_point(|&m| m < id),
        }
    }

    /// Re-sort the members after their sort keys changed.
    pub(crate) fn resort(&mut self, store: &ComponentStore) {
        if let Some(sort) = self.sort {
            self.members.sort_by(|&a, &b| {
                (sort.compare)(EntityRef::new(a, store), EntityRef::new(b, store)).then(a.cmp(&b))
            });
        }
    }

    /// Observers see members through [`EntityRef`] and cannot change them.
    pub(crate) fn observe<F>(&mut self, observer: F)
    where
        F: FnMut(CollectionEvent, EntityRef<'_>) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    fn notify(&mut self, event: CollectionEvent, store: &ComponentStore) {
        let entity = EntityRef::new(event.entity(), store);
        for observer in &mut self.observers {
            observer(event, entity);
        }
    }

    /// Members in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = Identity> + '_ {
        self.members.iter().copied()
    }

    /// Members as a slice, in iteration order.
    pub fn as_slice(&self) -> &[Identity] {
        &self.members
    }

    /// Owned copy of the members. Iterate this when the loop body mutates
    /// the manager.
    pub fn snapshot(&self) -> Vec<Identity> {
        self.members.clone()
    }

    pub fn first(&self) -> Option<Identity> {
        self.members.first().copied()
    }

    pub fn contains(&self, id: Identity) -> bool {
        self.index.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl fmt::Debug for FilteredCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredCollection")
            .field("id", &self.id)
            .field("types", &self.types)
            .field("sort", &self.sort)
            .field("members", &self.members)
            .finish()
    }
}
