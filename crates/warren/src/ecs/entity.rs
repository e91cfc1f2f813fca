//! # Entity Handles — The Way Game Code Touches Components
//!
//! An entity has no data of its own. It is an [`Identity`] plus the place its
//! components live. Two handle flavours follow Rust's borrowing rules:
//!
//! - [`EntityRef`]: identity + `&ComponentStore`. `Copy`, read-only, cheap to
//!   pass around (comparators and observers receive these).
//! - [`EntityMut`]: identity + `&mut EntityManager`. Adds structural changes
//!   (`add`, `remove`) and routes them through the manager so every
//!   collection sees them before the call returns. [`EntityMut::manager`]
//!   reaches the rest of the world.
//!
//! Handles compare equal iff their identities are equal. They can only be
//! obtained for live identities; see
//! [`EntityManager::entity`](super::manager::EntityManager::entity).

use std::fmt;

use super::collection::ComponentSet;
use super::component::{Component, ComponentTypeId};
use super::identity::Identity;
use super::manager::EntityManager;
use super::store::ComponentStore;
use crate::error::EcsResult;

/// Read-only handle to a live entity.
#[derive(Clone, Copy)]
pub struct EntityRef<'a> {
    id: Identity,
    store: &'a ComponentStore,
}

impl<'a> EntityRef<'a> {
    pub(crate) fn new(id: Identity, store: &'a ComponentStore) -> Self {
        Self { id, store }
    }

    pub fn id(&self) -> Identity {
        self.id
    }

    /// The entity's `T` component, if it has one.
    pub fn get<T: Component>(&self) -> Option<&'a T> {
        self.store.get::<T>(self.id)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.get::<T>().is_some()
    }

    /// Does the entity carry every listed component type?
    pub fn has_all(&self, types: &[ComponentTypeId]) -> bool {
        self.store.contains_all(self.id, types)
    }

    /// Does the entity carry every type of the tuple `S`?
    ///
    /// Unregistered types are never present, so they make this `false`.
    pub fn has_all_of<S: ComponentSet>(&self) -> bool {
        let registry = self.store.registry();
        S::type_ids().into_iter().all(|(type_id, _)| {
            registry
                .id_of_type(type_id)
                .is_some_and(|t| self.store.contains(self.id, t))
        })
    }

    /// Every component attached to the entity.
    pub fn components(&self) -> Vec<&'a dyn Component> {
        self.store.all_of(self.id)
    }
}

impl PartialEq for EntityRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityRef<'_> {}

impl fmt::Debug for EntityRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRef")
            .field("id", &self.id)
            .field("components", &self.components())
            .finish()
    }
}

/// Mutable handle to a live entity.
///
/// Holds the manager exclusively; drop it (or call [`EntityMut::id`] first)
/// before asking the manager for anything else.
pub struct EntityMut<'a> {
    id: Identity,
    manager: &'a mut EntityManager,
}

impl<'a> EntityMut<'a> {
    pub(crate) fn new(id: Identity, manager: &'a mut EntityManager) -> Self {
        Self { id, manager }
    }

    pub fn id(&self) -> Identity {
        self.id
    }

    /// Downgrade to a read-only handle.
    pub fn view(&self) -> EntityRef<'_> {
        EntityRef::new(self.id, self.manager.store())
    }

    pub fn get<T: Component>(&self) -> Option<&T> {
        self.manager.store().get::<T>(self.id)
    }

    /// Mutate a component in place. Non-structural, so collections aren't told.
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.manager.store_mut().get_mut::<T>(self.id)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.get::<T>().is_some()
    }

    /// Attach a component. Fails on a duplicate type or an unregistered type.
    pub fn add<C: Component>(&mut self, component: C) -> EcsResult<&mut Self> {
        self.manager.attach(self.id, Box::new(component))?;
        Ok(self)
    }

    /// Attach an already boxed component (e.g. a template prototype copy).
    pub fn add_boxed(&mut self, component: Box<dyn Component>) -> EcsResult<&mut Self> {
        self.manager.attach(self.id, component)?;
        Ok(self)
    }

    /// Detach the `T` component. Returns whether anything was removed.
    pub fn remove<T: Component>(&mut self) -> bool {
        self.manager.detach::<T>(self.id)
    }

    /// Register `tag` for this entity, repointing it if already used.
    pub fn tag(&mut self, tag: &str) -> EcsResult<&mut Self> {
        self.manager.tag(self.id, tag)?;
        Ok(self)
    }

    /// Put this entity into `group`, leaving any previous group.
    pub fn set_group(&mut self, group: &str) -> EcsResult<&mut Self> {
        self.manager.set_group(group, self.id)?;
        Ok(self)
    }

    /// The manager this handle borrows, for changes to other entities.
    ///
    /// Once this entity is removed through it, the handle's own structural
    /// calls fail with [`EcsError::UnknownEntity`](crate::error::EcsError).
    pub fn manager(&mut self) -> &mut EntityManager {
        self.manager
    }

    /// Remove the entity from the manager.
    pub fn destroy(self) -> EcsResult<()> {
        self.manager.remove(self.id)
    }
}

impl PartialEq for EntityMut<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for EntityMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.view(), f)
    }
}
