//! # Entity Component System
//!
//! A small ECS for turn-based games. Entities are bare identities, components
//! are plain data kept in per-type columns, and the interesting part lives in
//! [`collection`]: live, memoized views over "every entity with A and B",
//! optionally sorted, that the manager keeps exact after every structural
//! change.
//!
//! ## Module Overview
//!
//! - [`identity`] — Monotonic, never-reused entity ids
//! - [`component`] — The `Component` trait and the dense type registry
//! - [`store`] — Type-indexed component storage
//! - [`entity`] — `EntityRef` / `EntityMut` handles
//! - [`collection`] — Filtered collections and their observers
//! - [`manager`] — Central container (identities + store + collections)
//! - [`tag`] / [`group`] — Named lookups for single entities and sets

pub mod collection;
pub mod component;
pub mod entity;
pub mod group;
pub mod identity;
pub mod manager;
pub mod store;
pub mod tag;

pub use collection::{
    CollectionEvent, CollectionId, CompareFn, ComponentSet, FilteredCollection, SortBy,
};
pub use component::{Component, ComponentRegistry, ComponentTypeId};
pub use entity::{EntityMut, EntityRef};
pub use group::GroupManager;
pub use identity::Identity;
pub use manager::{EntityManager, IntoComponents};
pub use store::ComponentStore;
pub use tag::TagManager;
