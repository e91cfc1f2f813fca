//! # Component — Plain Data, Registered Once
//!
//! Components are plain data: a `Position`, a `Sprite`, an `ActionPoints`
//! counter. Any `'static + Send + Sync + Clone` type is a component through the
//! blanket [`Component`] impl; the trait is object-safe so templates and
//! bundles can hold `Box<dyn Component>` of mixed types.
//!
//! ## Dense Type Ids
//!
//! Storage doesn't key on [`TypeId`] at runtime. Each component type is
//! registered once at startup and receives a dense [`ComponentTypeId`], an
//! index into the store's column vector:
//!
//! ```text
//! register::<Position>()  → ComponentTypeId(0)
//! register::<Sprite>()    → ComponentTypeId(1)
//! register::<Position>()  → ComponentTypeId(0)   ← idempotent
//! ```
//!
//! Using a type that was never registered is a configuration error surfaced at
//! the first structural use of that type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::error::EcsError;

/// Object-safe view of a component value.
///
/// Implemented for every `T: Clone + Send + Sync + 'static`. You never
/// implement this yourself.
pub trait Component: Any + Send + Sync {
    /// Copy this component into a fresh, independent box.
    fn boxed_clone(&self) -> Box<dyn Component>;
    /// The `TypeId` of the concrete component type.
    fn concrete_type(&self) -> TypeId;
    /// The full name of the concrete component type.
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Clone + Send + Sync + 'static> Component for T {
    fn boxed_clone(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn concrete_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl fmt::Debug for dyn Component + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component<{}>", short_type_name(self.type_name()))
    }
}

/// Dense index of a registered component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentTypeId(pub(crate) u16);

impl ComponentTypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Maps component `TypeId`s to dense [`ComponentTypeId`]s.
#[derive(Default)]
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentTypeId>,
    /// Full type names, indexed by `ComponentTypeId`.
    names: Vec<&'static str>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`, returning its dense id. Registering twice returns the same id.
    ///
    /// # Panics
    ///
    /// Panics if more than `u16::MAX` component types are registered.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        self.register_raw(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    fn register_raw(&mut self, type_id: TypeId, name: &'static str) -> ComponentTypeId {
        if let Some(&id) = self.by_type.get(&type_id) {
            return id;
        }
        let index = u16::try_from(self.names.len()).unwrap_or_else(|_| {
            panic!("Too many component types registered (max {})", u16::MAX)
        });
        let id = ComponentTypeId(index);
        self.by_type.insert(type_id, id);
        self.names.push(name);
        log::trace!("registered component `{}` as {:?}", short_type_name(name), id);
        id
    }

    /// Look up the id of `T`, if registered.
    pub fn id_of<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Look up the id of a raw `TypeId`, if registered.
    pub fn id_of_type(&self, type_id: TypeId) -> Option<ComponentTypeId> {
        self.by_type.get(&type_id).copied()
    }

    /// Like [`id_of_type`](Self::id_of_type), but a missing type is a
    /// configuration error.
    pub(crate) fn resolve(
        &self,
        type_id: TypeId,
        name: &'static str,
    ) -> Result<ComponentTypeId, EcsError> {
        self.id_of_type(type_id)
            .ok_or(EcsError::UnregisteredComponent { name })
    }

    /// Full type name of a registered component.
    pub fn name(&self, id: ComponentTypeId) -> Option<&'static str> {
        self.names.get(id.index()).copied()
    }

    /// Every registered type with its full name, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentTypeId, &'static str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .map(|(i, &name)| (ComponentTypeId(i as u16), name))
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Strip the module path from a fully-qualified type name, keeping only the
/// short name (e.g. `game::components::Sprite` → `Sprite`).
pub(crate) fn short_type_name(full: &str) -> String {
    if let Some(angle) = full.find('<') {
        let prefix = &full[..angle];
        let short_prefix = prefix.rsplit("::").next().unwrap_or(prefix);
        let inner = &full[angle + 1..full.len() - 1];
        format!("{}<{}>", short_prefix, short_type_name(inner))
    } else {
        full.rsplit("::").next().unwrap_or(full).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }

    #[derive(Clone)]
    struct Sprite(&'static str);

    #[test]
    fn register_is_dense_and_idempotent() {
        let mut reg = ComponentRegistry::new();
        let a = reg.register::<Position>();
        let b = reg.register::<Sprite>();
        assert_eq!(a, ComponentTypeId(0));
        assert_eq!(b, ComponentTypeId(1));
        assert_eq!(reg.register::<Position>(), a);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.id_of::<Sprite>(), Some(b));
        assert_eq!(reg.id_of::<u8>(), None);

        let names: Vec<_> = reg.iter().map(|(id, name)| (id, short_type_name(name))).collect();
        assert_eq!(names, vec![(a, "Position".to_string()), (b, "Sprite".to_string())]);
    }

    #[test]
    fn resolve_unregistered_is_configuration_error() {
        let reg = ComponentRegistry::new();
        let err = reg.resolve(TypeId::of::<Position>(), "Position").unwrap_err();
        assert_eq!(err, EcsError::UnregisteredComponent { name: "Position" });
    }

    #[test]
    fn boxed_clone_is_independent() {
        let original: Box<dyn Component> = Box::new(Position { x: 1, y: 2 });
        let mut copy = original.boxed_clone();
        copy.as_any_mut().downcast_mut::<Position>().unwrap().x = 10;

        assert_eq!(original.as_any().downcast_ref::<Position>(), Some(&Position { x: 1, y: 2 }));
        assert_eq!(copy.as_any().downcast_ref::<Position>(), Some(&Position { x: 10, y: 2 }));
        assert_eq!(copy.concrete_type(), TypeId::of::<Position>());
    }

    #[test]
    fn short_names() {
        assert_eq!(short_type_name("game::components::Sprite"), "Sprite");
        assert_eq!(short_type_name("alloc::vec::Vec<game::Item>"), "Vec<Item>");
        assert_eq!(format!("{:?}", &Sprite("x") as &dyn Component), "Component<Sprite>");
    }
}
