//! # Component Store — Type-Indexed Component Storage
//!
//! The store owns every component in the world. It is a two-level map:
//!
//! ```text
//! columns: Vec<ComponentColumn>       ← indexed by ComponentTypeId
//!   [0] Position: { #0 → pos, #3 → pos }
//!   [1] Sprite:   { #0 → spr, #1 → spr, #3 → spr }
//!   [2] Health:   { }
//! ```
//!
//! The outer level is resolved once per type at registration time (a dense
//! index, no runtime type introspection). The inner level maps identities to
//! boxed components. A column is created when its type is registered.
//!
//! ## Ownership
//!
//! A component value belongs to exactly one entity. Values move into the store
//! by value (`Box<dyn Component>`), so the same instance can't be attached
//! twice; the second component of a type for the same entity is rejected.

use std::any::TypeId;
use std::collections::HashMap;

use super::component::{Component, ComponentRegistry, ComponentTypeId, short_type_name};
use super::identity::Identity;
use crate::error::{EcsError, EcsResult};

/// One column of components of a single type, keyed by identity.
#[derive(Default)]
pub(crate) struct ComponentColumn {
    data: HashMap<Identity, Box<dyn Component>>,
}

impl ComponentColumn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: Identity) -> bool {
        self.data.contains_key(&id)
    }

    pub fn insert(&mut self, id: Identity, value: Box<dyn Component>) {
        self.data.insert(id, value);
    }

    pub fn remove(&mut self, id: Identity) -> Option<Box<dyn Component>> {
        self.data.remove(&id)
    }

    pub fn get(&self, id: Identity) -> Option<&dyn Component> {
        self.data.get(&id).map(|boxed| &**boxed)
    }

    pub fn get_mut(&mut self, id: Identity) -> Option<&mut Box<dyn Component>> {
        self.data.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// Storage for every component of every entity.
#[derive(Default)]
pub struct ComponentStore {
    registry: ComponentRegistry,
    columns: Vec<ComponentColumn>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` and make sure its column exists.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        let id = self.registry.register::<T>();
        self.ensure_column(id);
        id
    }

    fn ensure_column(&mut self, id: ComponentTypeId) {
        while self.columns.len() <= id.index() {
            self.columns.push(ComponentColumn::new());
        }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Resolve the dense id of a boxed component's concrete type.
    pub(crate) fn resolve(&self, component: &dyn Component) -> EcsResult<ComponentTypeId> {
        self.registry
            .resolve(component.concrete_type(), component.type_name())
    }

    /// Attach `component` to `id`.
    ///
    /// Fails if the type isn't registered, or if `id` already has a component
    /// of this exact type. Liveness of `id` is the caller's concern.
    pub fn add(
        &mut self,
        id: Identity,
        component: Box<dyn Component>,
    ) -> EcsResult<ComponentTypeId> {
        let type_id = self.resolve(&*component)?;
        let column = &mut self.columns[type_id.index()];
        if column.contains(id) {
            return Err(EcsError::DuplicateComponent {
                entity: id,
                name: component.type_name(),
            });
        }
        log::trace!("{id}: + {}", short_type_name(component.type_name()));
        column.insert(id, component);
        Ok(type_id)
    }

    /// Detach the `T` component of `id`. Returns `true` if one was removed.
    pub fn remove<T: Component>(&mut self, id: Identity) -> bool {
        self.take_raw(id, TypeId::of::<T>()).is_some()
    }

    /// Detach and return the component of a raw type.
    pub(crate) fn take_raw(&mut self, id: Identity, type_id: TypeId) -> Option<Box<dyn Component>> {
        let index = self.registry.id_of_type(type_id)?;
        let removed = self.columns[index.index()].remove(id);
        if let Some(component) = removed.as_deref() {
            log::trace!("{id}: - {}", short_type_name(component.type_name()));
        }
        removed
    }

    /// Borrow the `T` component of `id`, if any.
    pub fn get<T: Component>(&self, id: Identity) -> Option<&T> {
        let index = self.registry.id_of::<T>()?;
        self.columns[index.index()]
            .get(id)?
            .as_any()
            .downcast_ref::<T>()
    }

    /// Mutably borrow the `T` component of `id`, if any.
    pub fn get_mut<T: Component>(&mut self, id: Identity) -> Option<&mut T> {
        let index = self.registry.id_of::<T>()?;
        self.columns[index.index()]
            .get_mut(id)?
            .as_any_mut()
            .downcast_mut::<T>()
    }

    /// Does `id` have a component of the given type?
    pub fn contains(&self, id: Identity, type_id: ComponentTypeId) -> bool {
        self.columns
            .get(type_id.index())
            .is_some_and(|column| column.contains(id))
    }

    /// Does `id` have a component of every given type?
    pub fn contains_all(&self, id: Identity, types: &[ComponentTypeId]) -> bool {
        types.iter().all(|&t| self.contains(id, t))
    }

    /// Every component attached to `id`, in registration order.
    pub fn all_of(&self, id: Identity) -> Vec<&dyn Component> {
        self.columns
            .iter()
            .filter_map(|column| column.get(id))
            .collect()
    }

    /// Dense ids of every component type attached to `id`.
    pub fn types_of(&self, id: Identity) -> Vec<ComponentTypeId> {
        (0..self.columns.len())
            .map(|i| ComponentTypeId(i as u16))
            .filter(|&t| self.contains(id, t))
            .collect()
    }

    /// Drop every component of `id`. Returns how many were removed.
    pub(crate) fn purge(&mut self, id: Identity) -> usize {
        self.columns
            .iter_mut()
            .filter_map(|column| column.remove(id))
            .count()
    }

    /// Number of entities holding a component of the given type.
    pub fn count(&self, type_id: ComponentTypeId) -> usize {
        self.columns.get(type_id.index()).map_or(0, ComponentColumn::len)
    }
}
