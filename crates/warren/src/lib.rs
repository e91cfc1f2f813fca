//! # Warren — Entity Core for Roguelikes
//!
//! An entity-component core for turn-based games: an [`EntityManager`] that
//! owns entities and their components, live filtered collections over
//! component sets, tag and group lookups, and an [`EntityFactory`] that
//! compiles inheriting templates into prototypes.
//!
//! Start with `use warren::prelude::*`.
//!
//! [`EntityManager`]: ecs::EntityManager
//! [`EntityFactory`]: template::EntityFactory

pub mod ecs;
pub mod error;
pub mod prelude;
pub mod template;

#[cfg(feature = "diagnostics")]
pub mod diag;
