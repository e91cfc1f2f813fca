//! Convenience re-exports — `use warren::prelude::*` for the common items.

pub use crate::ecs::{
    CollectionEvent, CollectionId, Component, ComponentTypeId, EntityManager, EntityMut,
    EntityRef, FilteredCollection, Identity, SortBy,
};
pub use crate::error::{EcsError, EcsResult, InheritanceFault, LoadError, TemplateError};
pub use crate::template::{EntityFactory, Template, TemplateRegistry};
#[cfg(feature = "diagnostics")]
pub use crate::diag::DiagSnapshot;
