//! A [`Template`] is a bag of prototype components, at most one per concrete
//! type. Setting a second component of a type replaces the first.

use std::any::TypeId;
use std::fmt;

use crate::ecs::component::{Component, short_type_name};

/// Named bundle of prototype components, kept in insertion order.
#[derive(Default)]
pub struct Template {
    components: Vec<Box<dyn Component>>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    ///
    /// ```ignore
    /// let goblin = Template::new()
    ///     .with(Sprite::new("g"))
    ///     .with(Health(7));
    /// ```
    pub fn with<C: Component>(mut self, component: C) -> Self {
        self.set(component);
        self
    }

    /// Store `component`, replacing an existing one of the same type.
    pub fn set<C: Component>(&mut self, component: C) -> &mut Self {
        self.set_boxed(Box::new(component))
    }

    pub fn set_boxed(&mut self, component: Box<dyn Component>) -> &mut Self {
        match self.position(component.concrete_type()) {
            Some(index) => self.components[index] = component,
            None => self.components.push(component),
        }
        self
    }

    fn position(&self, type_id: TypeId) -> Option<usize> {
        self.components
            .iter()
            .position(|c| (**c).concrete_type() == type_id)
    }

    pub fn get<T: Component>(&self) -> Option<&T> {
        let index = self.position(TypeId::of::<T>())?;
        (*self.components[index]).as_any().downcast_ref::<T>()
    }

    pub fn contains<T: Component>(&self) -> bool {
        self.position(TypeId::of::<T>()).is_some()
    }

    /// Drop the `T` prototype. Returns whether there was one.
    pub fn remove<T: Component>(&mut self) -> bool {
        match self.position(TypeId::of::<T>()) {
            Some(index) => {
                self.components.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// The prototypes, in insertion order.
    pub fn components(&self) -> impl Iterator<Item = &dyn Component> {
        self.components.iter().map(|c| &**c)
    }

    /// Fresh copies of every prototype.
    pub(crate) fn instantiate(&self) -> Vec<Box<dyn Component>> {
        self.components().map(|c| c.boxed_clone()).collect()
    }

    /// `base` with `overrides` layered on top: an override replaces the base
    /// prototype of its type in place, new types are appended.
    pub(crate) fn merged(base: &Template, overrides: &Template) -> Template {
        let mut merged = base.clone();
        for component in overrides.components() {
            merged.set_boxed(component.boxed_clone());
        }
        merged
    }
}

impl Clone for Template {
    fn clone(&self) -> Self {
        Self {
            components: self.instantiate(),
        }
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.components().map(|c| short_type_name(c.type_name())))
            .finish()
    }
}
