//! # Templates — Prototype Entities
//!
//! - [`Template`] — a bundle of prototype components
//! - [`EntityFactory`] — compiles inheritance and creates entities from
//!   compiled templates
//! - [`TemplateRegistry`] — loads templates from JSON manifests

pub mod factory;
pub mod loader;
pub mod prototype;

pub use factory::EntityFactory;
pub use loader::{TemplateEntry, TemplateManifest, TemplateRegistry};
pub use prototype::Template;
