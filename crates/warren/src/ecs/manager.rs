//! # Entity Manager — The Central Container
//!
//! The [`EntityManager`] owns the identity space, the component store, the
//! registry of filtered collections and the tag/group indices. It is the
//! single entry point for creating and removing entities and for obtaining
//! views over them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ EntityManager                                        │
//! │                                                      │
//! │  identities: monotonic allocator + live set          │
//! │                                                      │
//! │  store: ComponentStore                               │
//! │    columns[ComponentTypeId] = { Identity → component }│
//! │                                                      │
//! │  collections: Vec<FilteredCollection>                │
//! │  collection_index: CollectionKey → CollectionId      │
//! │                                                      │
//! │  tags: "player" → #4                                 │
//! │  groups: "goblins" → {#7, #9}                        │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//!
//! Every structural change is reflected in every collection before the call
//! returns; there is no deferred index update.
//!
//! - `create`: components are attached first, then the entity is offered to
//!   every collection.
//! - `add_component`: the entity is re-offered to every collection.
//! - `remove_component::<T>`: collections that require `T` are told first
//!   (observers can still read `T`), then `T` is dropped.
//! - `remove`: teardown runs in reverse creation order: collection
//!   membership, component storage, tags and groups, identity.
//!
//! Collection observers only get read access. To mutate while walking a
//! collection, iterate a [`snapshot`](FilteredCollection::snapshot) or use
//! [`EntityManager::for_each`], which does exactly that.

use std::any::TypeId;
use std::collections::{BTreeSet, HashMap};

use super::collection::{
    CollectionEvent, CollectionId, CollectionKey, ComponentSet, FilteredCollection, SortBy,
    collection_key,
};
use super::component::{Component, ComponentRegistry, ComponentTypeId, short_type_name};
use super::entity::{EntityMut, EntityRef};
use super::group::GroupManager;
use super::identity::{Identity, IdentityAllocator};
use super::store::ComponentStore;
use super::tag::TagManager;
use crate::error::{EcsError, EcsResult};

/// Owner of every entity, component, collection, tag and group.
pub struct EntityManager {
    identities: IdentityAllocator,
    store: ComponentStore,
    collections: Vec<FilteredCollection>,
    collection_index: HashMap<CollectionKey, CollectionId>,
    tags: TagManager,
    groups: GroupManager,
}

impl EntityManager {
    pub fn new() -> Self {
        Self {
            identities: IdentityAllocator::new(),
            store: ComponentStore::new(),
            collections: Vec::new(),
            collection_index: HashMap::new(),
            tags: TagManager::new(),
            groups: GroupManager::new(),
        }
    }

    // ── Component Types ──────────────────────────────────────────────

    /// Register a component type. Do this once per type at startup;
    /// registering again returns the same id.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        self.store.register::<T>()
    }

    pub fn registry(&self) -> &ComponentRegistry {
        self.store.registry()
    }

    /// Dense id of `T`, if registered.
    pub fn type_id_of<T: Component>(&self) -> Option<ComponentTypeId> {
        self.store.registry().id_of::<T>()
    }

    pub fn store(&self) -> &ComponentStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut ComponentStore {
        &mut self.store
    }

    // ── Create / Remove ──────────────────────────────────────────────

    /// Create an entity with a bundle of components and offer it to every
    /// collection.
    ///
    /// On error (unregistered type, two components of one type) nothing is
    /// left behind; the identity that was tried is burned, never reused.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let goblin = em.create((Position { x: 3, y: 4 }, Sprite::new("g")))?;
    /// ```
    pub fn create(&mut self, components: impl IntoComponents) -> EcsResult<Identity> {
        let components = components.into_components();
        let id = self.identities.allocate();
        for component in components {
            if let Err(err) = self.store.add(id, component) {
                self.store.purge(id);
                self.identities.release(id);
                return Err(err);
            }
        }
        log::debug!("created {id}");
        self.announce(id);
        Ok(id)
    }

    /// Create an entity holding a copy of every component of `source`.
    /// Tags and groups are not copied.
    pub fn clone_entity(&mut self, source: Identity) -> EcsResult<Identity> {
        self.ensure_alive(source)?;
        let copies: Vec<Box<dyn Component>> = self
            .store
            .all_of(source)
            .into_iter()
            .map(|component| component.boxed_clone())
            .collect();
        self.create(copies)
    }

    /// Remove an entity: collection membership, components, tags and
    /// groups, then the identity itself.
    pub fn remove(&mut self, id: Identity) -> EcsResult<()> {
        self.ensure_alive(id)?;
        self.teardown(id);
        Ok(())
    }

    /// Remove every entity. Collections stay registered, empty.
    pub fn remove_all(&mut self) {
        let all: Vec<Identity> = self.identities.iter().collect();
        for id in all {
            self.teardown(id);
        }
        self.tags.clear();
        self.groups.clear();
    }

    /// Tear down a live entity in reverse creation order.
    fn teardown(&mut self, id: Identity) {
        let store = &self.store;
        for collection in &mut self.collections {
            collection.remove(id, store);
        }
        let dropped = self.store.purge(id);
        self.tags.purge(id);
        self.groups.remove(id);
        self.identities.release(id);
        log::debug!("removed {id} ({dropped} components)");
    }

    /// Offer `id` to every collection. Idempotent.
    fn announce(&mut self, id: Identity) {
        let store = &self.store;
        for collection in &mut self.collections {
            collection.add(id, store);
        }
    }

    fn ensure_alive(&self, id: Identity) -> EcsResult<()> {
        if self.identities.is_alive(id) {
            Ok(())
        } else {
            Err(EcsError::UnknownEntity(id))
        }
    }

    // ── Entity Handles ───────────────────────────────────────────────

    /// Read-only handle to a live entity.
    pub fn entity(&self, id: Identity) -> EcsResult<EntityRef<'_>> {
        self.ensure_alive(id)?;
        Ok(EntityRef::new(id, &self.store))
    }

    /// Mutable handle to a live entity.
    pub fn entity_mut(&mut self, id: Identity) -> EcsResult<EntityMut<'_>> {
        self.ensure_alive(id)?;
        Ok(EntityMut::new(id, self))
    }

    pub fn is_alive(&self, id: Identity) -> bool {
        self.identities.is_alive(id)
    }

    pub fn entity_count(&self) -> usize {
        self.identities.alive_count()
    }

    /// Live identities in creation order.
    pub fn identities(&self) -> impl Iterator<Item = Identity> + '_ {
        self.identities.iter()
    }

    // ── Per-Entity Component Access ──────────────────────────────────

    /// The `T` component of `id`. `None` if the entity is dead or has no `T`.
    pub fn get<T: Component>(&self, id: Identity) -> Option<&T> {
        self.store.get::<T>(id)
    }

    /// Mutable access to the `T` component of `id`. Non-structural: no
    /// collection is notified.
    pub fn get_mut<T: Component>(&mut self, id: Identity) -> Option<&mut T> {
        self.store.get_mut::<T>(id)
    }

    /// Attach a component to a live entity and re-offer it to every collection.
    pub fn add_component<C: Component>(&mut self, id: Identity, component: C) -> EcsResult<()> {
        self.attach(id, Box::new(component))
    }

    /// Detach the `T` component of a live entity. Returns whether one was
    /// removed.
    pub fn remove_component<T: Component>(&mut self, id: Identity) -> EcsResult<bool> {
        self.ensure_alive(id)?;
        Ok(self.detach::<T>(id))
    }

    /// Detach the `T` component of a live entity and hand it back.
    pub fn take_component<T: Component>(&mut self, id: Identity) -> EcsResult<Option<T>> {
        self.ensure_alive(id)?;
        if self.withdraw_for_type::<T>(id).is_none() {
            return Ok(None);
        }
        let taken = self
            .store
            .take_raw(id, TypeId::of::<T>())
            .and_then(|boxed| boxed.into_any().downcast::<T>().ok())
            .map(|boxed| *boxed);
        Ok(taken)
    }

    /// Attach a boxed component to a live entity. Used by [`EntityMut`].
    pub(crate) fn attach(&mut self, id: Identity, component: Box<dyn Component>) -> EcsResult<()> {
        self.ensure_alive(id)?;
        self.store.add(id, component)?;
        self.announce(id);
        Ok(())
    }

    /// Detach the `T` component of `id`. A dead entity has nothing to detach.
    pub(crate) fn detach<T: Component>(&mut self, id: Identity) -> bool {
        if self.withdraw_for_type::<T>(id).is_none() {
            return false;
        }
        self.store.remove::<T>(id)
    }

    /// If `id` has a `T`, withdraw it from every collection requiring `T`
    /// and return the type's id. The component itself is left in place.
    fn withdraw_for_type<T: Component>(&mut self, id: Identity) -> Option<ComponentTypeId> {
        let type_id = self.store.registry().id_of::<T>()?;
        if !self.store.contains(id, type_id) {
            return None;
        }
        let store = &self.store;
        for collection in self
            .collections
            .iter_mut()
            .filter(|c| c.contains_type(type_id))
        {
            collection.remove(id, store);
        }
        Some(type_id)
    }

    // ── Filtered Collections ─────────────────────────────────────────

    /// The collection of entities carrying every type of `S`, ordered by
    /// identity. Built and back-filled on first request, memoized after.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let drawable = em.query::<(Sprite, Position)>()?;
    /// for id in em.collection(drawable)?.iter() { /* draw */ }
    /// ```
    pub fn query<S: ComponentSet>(&mut self) -> EcsResult<CollectionId> {
        let types = self.resolve_set::<S>()?;
        Ok(self.collection_for(types, None))
    }

    /// Like [`query`](Self::query), ordered by `sort`.
    pub fn query_sorted<S: ComponentSet>(&mut self, sort: SortBy) -> EcsResult<CollectionId> {
        let types = self.resolve_set::<S>()?;
        Ok(self.collection_for(types, Some(sort)))
    }

    /// Collection over a list of component types chosen at runtime.
    pub fn query_types(
        &mut self,
        types: &[TypeId],
        sort: Option<SortBy>,
    ) -> EcsResult<CollectionId> {
        let registry = self.store.registry();
        let ids = types
            .iter()
            .map(|&t| registry.id_of_type(t).ok_or(EcsError::UnregisteredType(t)))
            .collect::<EcsResult<Vec<_>>>()?;
        Ok(self.collection_for(ids, sort))
    }

    /// The memoized collection for resolved type ids, built on first use.
    fn collection_for(
        &mut self,
        types: Vec<ComponentTypeId>,
        sort: Option<SortBy>,
    ) -> CollectionId {
        let key = collection_key(types, sort);
        if let Some(&id) = self.collection_index.get(&key) {
            return id;
        }

        let id = CollectionId(self.collections.len());
        let mut collection = FilteredCollection::new(id, key.clone(), sort);
        for entity in self.identities.iter() {
            collection.add(entity, &self.store);
        }
        log::debug!(
            "{id:?}: new collection over [{}] ({} members)",
            self.type_names(&key.types).join(", "),
            collection.len()
        );
        self.collections.push(collection);
        self.collection_index.insert(key, id);
        id
    }

    fn resolve_set<S: ComponentSet>(&self) -> EcsResult<Vec<ComponentTypeId>> {
        S::type_ids()
            .into_iter()
            .map(|(type_id, name)| self.store.registry().resolve(type_id, name))
            .collect()
    }

    pub(crate) fn type_names(&self, types: &[ComponentTypeId]) -> Vec<String> {
        types
            .iter()
            .map(|&t| {
                self.store
                    .registry()
                    .name(t)
                    .map_or_else(|| format!("{t:?}"), short_type_name)
            })
            .collect()
    }

    pub fn collection(&self, id: CollectionId) -> EcsResult<&FilteredCollection> {
        self.collections
            .get(id.0)
            .ok_or(EcsError::UnknownCollection(id))
    }

    /// Members of a collection, in iteration order.
    pub fn members(&self, id: CollectionId) -> EcsResult<&[Identity]> {
        Ok(self.collection(id)?.as_slice())
    }

    /// Number of registered collections.
    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    /// Register a synchronous observer of membership changes.
    ///
    /// The observer runs on the caller's stack, inside the structural change
    /// that caused it. [`CollectionEvent::Removed`] is delivered while the
    /// entity's components are still readable.
    ///
    /// Observers get an [`EntityRef`], so they can read the world but not
    /// change it. Structural changes in reaction to an event belong after
    /// the call that caused it, or in a [`for_each`](Self::for_each) pass.
    pub fn observe<F>(&mut self, id: CollectionId, observer: F) -> EcsResult<()>
    where
        F: FnMut(CollectionEvent, EntityRef<'_>) + 'static,
    {
        self.collections
            .get_mut(id.0)
            .ok_or(EcsError::UnknownCollection(id))?
            .observe(observer);
        Ok(())
    }

    /// Re-sort a sorted collection after its sort keys changed.
    pub fn resort(&mut self, id: CollectionId) -> EcsResult<()> {
        let collection = self
            .collections
            .get_mut(id.0)
            .ok_or(EcsError::UnknownCollection(id))?;
        collection.resort(&self.store);
        Ok(())
    }

    /// Visit every member of a collection with a mutable handle.
    ///
    /// Iterates a snapshot taken up front, so the body may add or remove
    /// components and entities, including entities other than the one it
    /// was handed (through [`EntityMut::manager`]). Members that left the
    /// collection before their turn are skipped.
    ///
    /// ```ignore
    /// em.for_each(actors, |mut actor| {
    ///     if let Some(target) = actor.manager().try_tagged("target") {
    ///         let _ = actor.manager().remove(target);
    ///     }
    /// })?;
    /// ```
    pub fn for_each<F>(&mut self, id: CollectionId, mut f: F) -> EcsResult<()>
    where
        F: FnMut(EntityMut<'_>),
    {
        let snapshot = self.collection(id)?.snapshot();
        for entity in snapshot {
            if self.collections[id.0].contains(entity) {
                f(EntityMut::new(entity, self));
            }
        }
        Ok(())
    }

    // ── Tags ─────────────────────────────────────────────────────────

    pub fn tags(&self) -> &TagManager {
        &self.tags
    }

    /// Point `tag` at a live entity. Returns the entity it pointed at before.
    pub fn tag(&mut self, id: Identity, tag: &str) -> EcsResult<Option<Identity>> {
        self.ensure_alive(id)?;
        Ok(self.tags.register(id, tag))
    }

    pub fn untag(&mut self, tag: &str) -> Option<Identity> {
        self.tags.unregister(tag)
    }

    /// The entity tagged `tag`. An unknown tag is an error.
    pub fn tagged(&self, tag: &str) -> EcsResult<Identity> {
        self.tags.get(tag)
    }

    pub fn try_tagged(&self, tag: &str) -> Option<Identity> {
        self.tags.try_get(tag)
    }

    // ── Groups ───────────────────────────────────────────────────────

    pub fn groups(&self) -> &GroupManager {
        &self.groups
    }

    /// Put a live entity into `group`. Returns the group it left, if any.
    pub fn set_group(&mut self, group: &str, id: Identity) -> EcsResult<Option<String>> {
        self.ensure_alive(id)?;
        Ok(self.groups.set(group, id))
    }

    /// Take a live entity out of its group.
    pub fn ungroup(&mut self, id: Identity) -> EcsResult<Option<String>> {
        self.ensure_alive(id)?;
        Ok(self.groups.remove(id))
    }

    /// The group of `id`. An ungrouped entity is an error.
    pub fn group_of(&self, id: Identity) -> EcsResult<&str> {
        self.groups.group_of(id)
    }

    pub fn group_members(&self, group: &str) -> EcsResult<&BTreeSet<Identity>> {
        self.groups.members(group)
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn collections(&self) -> &[FilteredCollection] {
        &self.collections
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn total_allocated(&self) -> u64 {
        self.identities.total_allocated()
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

// ── IntoComponents (tuple support) ───────────────────────────────────────

/// Anything that can become the initial component set of a new entity.
///
/// Implemented for `()`, tuples of components up to 8 elements and
/// `Vec<Box<dyn Component>>` (what templates produce).
pub trait IntoComponents {
    fn into_components(self) -> Vec<Box<dyn Component>>;
}

impl IntoComponents for () {
    fn into_components(self) -> Vec<Box<dyn Component>> {
        Vec::new()
    }
}

impl IntoComponents for Vec<Box<dyn Component>> {
    fn into_components(self) -> Vec<Box<dyn Component>> {
        self
    }
}

macro_rules! impl_into_components {
    ($($T:ident),+) => {
        impl<$($T: Component),+> IntoComponents for ($($T,)+) {
            #[allow(non_snake_case)]
            fn into_components(self) -> Vec<Box<dyn Component>> {
                let ($($T,)+) = self;
                vec![$(Box::new($T) as Box<dyn Component>),+]
            }
        }
    };
}

impl_into_components!(A);
impl_into_components!(A, B);
impl_into_components!(A, B, C);
impl_into_components!(A, B, C, D);
impl_into_components!(A, B, C, D, E);
impl_into_components!(A, B, C, D, E, F);
impl_into_components!(A, B, C, D, E, F, G);
impl_into_components!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::cmp::Ordering;
    use std::rc::Rc;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }
    #[derive(Clone, Debug, PartialEq)]
    struct Sprite(String);
    #[derive(Clone, Debug, PartialEq)]
    struct ActionPoints(i32);
    #[derive(Clone)]
    struct Marker;
    #[derive(Clone)]
    struct Unregistered;

    fn manager() -> EntityManager {
        let mut em = EntityManager::new();
        em.register::<Position>();
        em.register::<Sprite>();
        em.register::<ActionPoints>();
        em.register::<Marker>();
        em
    }

    fn pos(x: i32, y: i32) -> Position {
        Position { x, y }
    }

    fn most_points_first(a: EntityRef<'_>, b: EntityRef<'_>) -> Ordering {
        let points = |e: EntityRef<'_>| e.get::<ActionPoints>().map_or(0, |p| p.0);
        points(b).cmp(&points(a))
    }

    #[test]
    fn create_and_get() {
        let mut em = manager();
        let e = em.create((pos(1, 2), Sprite("@".into()))).unwrap();

        assert!(em.is_alive(e));
        assert_eq!(em.entity_count(), 1);
        assert_eq!(em.get::<Position>(e), Some(&pos(1, 2)));
        assert!(em.get::<ActionPoints>(e).is_none());

        let handle = em.entity(e).unwrap();
        assert_eq!(handle.id(), e);
        assert!(handle.has::<Sprite>());
        assert_eq!(handle.components().len(), 2);
    }

    #[test]
    fn identities_are_distinct_and_never_reused() {
        let mut em = manager();
        let a = em.create(()).unwrap();
        em.remove(a).unwrap();
        let b = em.create(()).unwrap();
        assert_ne!(a, b);
        assert!(a < b);
        assert!(matches!(em.entity(a), Err(EcsError::UnknownEntity(id)) if id == a));
    }

    #[test]
    fn create_rejects_duplicate_types_and_leaves_nothing() {
        let mut em = manager();
        let marked = em.query::<(Marker,)>().unwrap();
        let err = em.create((Marker, pos(0, 0), Marker)).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
        assert_eq!(em.entity_count(), 0);
        assert!(em.collection(marked).unwrap().is_empty());
        assert_eq!(em.store().count(em.type_id_of::<Position>().unwrap()), 0);
    }

    #[test]
    fn unregistered_types_are_configuration_errors() {
        let mut em = manager();
        assert!(matches!(
            em.create((Unregistered,)),
            Err(EcsError::UnregisteredComponent { .. })
        ));
        assert!(matches!(
            em.query::<(Position, Unregistered)>(),
            Err(EcsError::UnregisteredComponent { .. })
        ));
        let e = em.create(()).unwrap();
        assert!(matches!(
            em.add_component(e, Unregistered),
            Err(EcsError::UnregisteredComponent { .. })
        ));
    }

    #[test]
    fn live_duplicate_add_is_an_error() {
        let mut em = manager();
        let e = em.create((pos(0, 0),)).unwrap();
        let err = em.add_component(e, pos(5, 5)).unwrap_err();
        assert_eq!(
            err,
            EcsError::DuplicateComponent {
                entity: e,
                name: std::any::type_name::<Position>(),
            }
        );
        assert_eq!(em.get::<Position>(e), Some(&pos(0, 0)));
    }

    #[test]
    fn query_is_memoized_across_permutations() {
        let mut em = manager();
        let a = em.query::<(Position, Sprite)>().unwrap();
        let b = em.query::<(Sprite, Position)>().unwrap();
        let c = em.query::<(Sprite, Position, Sprite)>().unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, em.query::<(Position,)>().unwrap());
        assert_eq!(em.collection_count(), 2);

        let sort = SortBy::new("points", most_points_first);
        let sorted = em.query_sorted::<(Position, Sprite)>(sort).unwrap();
        assert_ne!(a, sorted);
        assert_eq!(em.query_sorted::<(Sprite, Position)>(sort).unwrap(), sorted);
    }

    #[test]
    fn query_back_fills_existing_entities() {
        let mut em = manager();
        let e1 = em.create((pos(0, 0),)).unwrap();
        let _e2 = em.create((Sprite("s".into()),)).unwrap();
        let e3 = em.create((pos(1, 1), Sprite("t".into()))).unwrap();

        let positioned = em.query::<(Position,)>().unwrap();
        assert_eq!(em.members(positioned).unwrap(), &[e1, e3]);
    }

    #[test]
    fn creation_is_visible_in_preexisting_collections() {
        let mut em = manager();
        let a = em.query::<(Position,)>().unwrap();
        let b = em.query::<(Sprite,)>().unwrap();
        let ab = em.query::<(Position, Sprite)>().unwrap();
        let abc = em.query::<(Position, Sprite, ActionPoints)>().unwrap();

        let e = em.create((pos(0, 0), Sprite("@".into()))).unwrap();

        assert!(em.collection(a).unwrap().contains(e));
        assert!(em.collection(b).unwrap().contains(e));
        assert!(em.collection(ab).unwrap().contains(e));
        assert!(!em.collection(abc).unwrap().contains(e));
    }

    #[test]
    fn removing_a_component_updates_only_affected_collections() {
        let mut em = manager();
        let a = em.query::<(Position,)>().unwrap();
        let b = em.query::<(Sprite,)>().unwrap();
        let ab = em.query::<(Position, Sprite)>().unwrap();
        let e = em.create((pos(0, 0), Sprite("@".into()))).unwrap();

        assert!(em.remove_component::<Sprite>(e).unwrap());
        assert!(em.collection(a).unwrap().contains(e));
        assert!(!em.collection(b).unwrap().contains(e));
        assert!(!em.collection(ab).unwrap().contains(e));

        assert!(!em.remove_component::<Sprite>(e).unwrap());
    }

    #[test]
    fn adding_a_component_joins_collections() {
        let mut em = manager();
        let ab = em.query::<(Position, Sprite)>().unwrap();
        let e = em.create((pos(0, 0),)).unwrap();
        assert!(!em.collection(ab).unwrap().contains(e));

        em.add_component(e, Sprite("@".into())).unwrap();
        assert!(em.collection(ab).unwrap().contains(e));
    }

    #[test]
    fn membership_always_matches_has_all() {
        let mut em = manager();
        let ab = em.query::<(Position, ActionPoints)>().unwrap();
        let types = em.collection(ab).unwrap().types().to_vec();

        let mut ids = Vec::new();
        for i in 0..12 {
            let id = match i % 3 {
                0 => em.create((pos(i, 0),)).unwrap(),
                1 => em.create((pos(i, 0), ActionPoints(i))).unwrap(),
                _ => em.create((ActionPoints(i),)).unwrap(),
            };
            ids.push(id);
        }
        em.add_component(ids[0], ActionPoints(1)).unwrap();
        em.remove_component::<Position>(ids[4]).unwrap();
        em.remove(ids[7]).unwrap();
        em.add_component(ids[2], pos(9, 9)).unwrap();

        for id in em.identities().collect::<Vec<_>>() {
            let has_all = em.entity(id).unwrap().has_all(&types);
            assert_eq!(em.collection(ab).unwrap().contains(id), has_all, "mismatch for {id}");
        }
        assert!(!em.collection(ab).unwrap().contains(ids[7]));
    }

    #[test]
    fn remove_purges_collections_tags_and_groups() {
        let mut em = manager();
        let positioned = em.query::<(Position,)>().unwrap();
        let e = em.create((pos(0, 0),)).unwrap();
        em.tag(e, "player").unwrap();
        em.set_group("party", e).unwrap();

        em.remove(e).unwrap();
        assert!(!em.collection(positioned).unwrap().contains(e));
        assert!(em.try_tagged("player").is_none());
        assert!(matches!(em.tagged("player"), Err(EcsError::UnknownTag(_))));
        assert!(em.groups().try_group_of(e).is_none());
        assert!(em.group_members("party").unwrap().is_empty());

        assert_eq!(em.remove(e), Err(EcsError::UnknownEntity(e)));
    }

    #[test]
    fn observers_see_removal_before_components_go() {
        let mut em = manager();
        let drawable = em.query::<(Position, Sprite)>().unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        em.observe(drawable, move |event, entity| {
            let sprite = entity.get::<Sprite>().map(|s| s.0.clone());
            log.borrow_mut().push((event, sprite));
        })
        .unwrap();

        let e = em.create((pos(0, 0), Sprite("@".into()))).unwrap();
        em.remove_component::<Sprite>(e).unwrap();
        em.add_component(e, Sprite("#".into())).unwrap();
        em.remove(e).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                (CollectionEvent::Added(e), Some("@".to_string())),
                (CollectionEvent::Removed(e), Some("@".to_string())),
                (CollectionEvent::Added(e), Some("#".to_string())),
                (CollectionEvent::Removed(e), Some("#".to_string())),
            ]
        );
    }

    #[test]
    fn unrelated_component_removal_fires_nothing() {
        let mut em = manager();
        let positioned = em.query::<(Position,)>().unwrap();
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        em.observe(positioned, move |_, _| *counter.borrow_mut() += 1).unwrap();

        let e = em.create((pos(0, 0), Marker)).unwrap();
        em.remove_component::<Marker>(e).unwrap();
        em.add_component(e, Marker).unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn sorted_collection_orders_by_comparator() {
        let mut em = manager();
        let sort = SortBy::new("points", most_points_first);
        let turn_order = em.query_sorted::<(ActionPoints,)>(sort).unwrap();

        let slow = em.create((ActionPoints(2),)).unwrap();
        let fast = em.create((ActionPoints(9),)).unwrap();
        let tied = em.create((ActionPoints(2),)).unwrap();
        assert_eq!(em.members(turn_order).unwrap(), &[fast, slow, tied]);

        em.get_mut::<ActionPoints>(tied).unwrap().0 = 20;
        em.resort(turn_order).unwrap();
        assert_eq!(em.members(turn_order).unwrap(), &[tied, fast, slow]);
    }

    #[test]
    fn for_each_allows_structural_changes() {
        let mut em = manager();
        let actors = em.query::<(ActionPoints,)>().unwrap();
        for points in [3, 0, 5, 0] {
            em.create((ActionPoints(points),)).unwrap();
        }

        em.for_each(actors, |entity| {
            if entity.get::<ActionPoints>().is_some_and(|p| p.0 == 0) {
                entity.destroy().unwrap();
            }
        })
        .unwrap();

        assert_eq!(em.collection(actors).unwrap().len(), 2);
        assert_eq!(em.entity_count(), 2);
    }

    #[test]
    fn for_each_skips_members_removed_earlier() {
        let mut em = manager();
        let actors = em.query::<(ActionPoints,)>().unwrap();
        let a = em.create((ActionPoints(1),)).unwrap();
        let b = em.create((ActionPoints(2),)).unwrap();
        let c = em.create((ActionPoints(3),)).unwrap();

        let mut visited = Vec::new();
        em.for_each(actors, |mut actor| {
            visited.push(actor.id());
            if actor.id() == a {
                actor.manager().remove(c).unwrap();
            }
        })
        .unwrap();

        assert_eq!(visited, vec![a, b]);
        assert!(!em.is_alive(c));
        assert_eq!(em.members(actors).unwrap(), &[a, b]);
    }

    #[test]
    fn entity_mut_routes_through_collections() {
        let mut em = manager();
        let drawable = em.query::<(Position, Sprite)>().unwrap();
        let id = em.create((pos(0, 0),)).unwrap();

        {
            let mut e = em.entity_mut(id).unwrap();
            e.add(Sprite("@".into()))
                .unwrap()
                .tag("player")
                .unwrap()
                .set_group("party")
                .unwrap();
            e.get_mut::<Position>().unwrap().x = 4;
            assert!(e.has::<Sprite>());
        }
        assert!(em.collection(drawable).unwrap().contains(id));
        assert_eq!(em.tagged("player"), Ok(id));
        assert_eq!(em.group_of(id), Ok("party"));
        assert_eq!(em.get::<Position>(id).unwrap().x, 4);

        assert!(em.entity_mut(id).unwrap().remove::<Sprite>());
        assert!(!em.collection(drawable).unwrap().contains(id));
    }

    #[test]
    fn take_component_returns_value() {
        let mut em = manager();
        let positioned = em.query::<(Position,)>().unwrap();
        let e = em.create((pos(3, 4),)).unwrap();
        assert_eq!(em.take_component::<Position>(e).unwrap(), Some(pos(3, 4)));
        assert_eq!(em.take_component::<Position>(e).unwrap(), None);
        assert!(!em.collection(positioned).unwrap().contains(e));
    }

    #[test]
    fn clone_entity_copies_components_independently() {
        let mut em = manager();
        let original = em.create((pos(1, 1), Sprite("@".into()))).unwrap();
        em.tag(original, "player").unwrap();
        let copy = em.clone_entity(original).unwrap();

        assert_ne!(original, copy);
        em.get_mut::<Position>(copy).unwrap().x = 50;
        assert_eq!(em.get::<Position>(original).unwrap().x, 1);
        assert_eq!(em.get::<Sprite>(copy), Some(&Sprite("@".into())));
        assert_eq!(em.tagged("player"), Ok(original));
    }

    #[test]
    fn tag_repoints_and_group_evicts() {
        let mut em = manager();
        let a = em.create(()).unwrap();
        let b = em.create(()).unwrap();

        em.tag(a, "target").unwrap();
        assert_eq!(em.tag(b, "target").unwrap(), Some(a));
        assert_eq!(em.tagged("target"), Ok(b));
        assert_eq!(em.untag("target"), Some(b));

        em.set_group("group1", a).unwrap();
        assert_eq!(em.set_group("group2", a).unwrap(), Some("group1".to_string()));
        assert!(!em.group_members("group1").unwrap().contains(&a));
        assert_eq!(em.ungroup(a).unwrap(), Some("group2".to_string()));
        assert_eq!(em.group_of(a), Err(EcsError::Ungrouped(a)));
    }

    #[test]
    fn operations_on_dead_entities_fail() {
        let mut em = manager();
        let e = em.create((pos(0, 0),)).unwrap();
        em.remove(e).unwrap();

        assert_eq!(em.add_component(e, Marker), Err(EcsError::UnknownEntity(e)));
        assert_eq!(em.remove_component::<Position>(e), Err(EcsError::UnknownEntity(e)));
        assert_eq!(em.tag(e, "x"), Err(EcsError::UnknownEntity(e)));
        assert!(em.entity_mut(e).is_err());
        assert!(em.get::<Position>(e).is_none());
    }

    #[test]
    fn remove_all_empties_everything() {
        let mut em = manager();
        let positioned = em.query::<(Position,)>().unwrap();
        let a = em.create((pos(0, 0),)).unwrap();
        em.create((pos(1, 0),)).unwrap();
        em.tag(a, "player").unwrap();

        em.remove_all();
        assert_eq!(em.entity_count(), 0);
        assert!(em.collection(positioned).unwrap().is_empty());
        assert!(em.tags().is_empty());
        assert_eq!(em.collection_count(), 1);
    }

    #[test]
    fn query_types_shares_the_typed_collection() {
        let mut em = manager();
        let typed = em.query::<(Position, Sprite)>().unwrap();
        let runtime = em
            .query_types(&[TypeId::of::<Sprite>(), TypeId::of::<Position>()], None)
            .unwrap();
        assert_eq!(runtime, typed);
        assert_eq!(em.collection_count(), 1);
    }

    #[test]
    fn query_types_rejects_unregistered_types() {
        let mut em = manager();
        let err = em
            .query_types(&[TypeId::of::<Position>(), TypeId::of::<Unregistered>()], None)
            .unwrap_err();
        assert_eq!(err, EcsError::UnregisteredType(TypeId::of::<Unregistered>()));
        assert_eq!(em.collection_count(), 0);
    }
}
