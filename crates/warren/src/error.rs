//! Error types for the entity runtime and the template compiler.
//!
//! Every error here is a misuse or configuration error reported to the
//! immediate caller. Plain absence (a missing component, an untagged key
//! looked up with a `try_` method) is an `Option`, not an error.

use thiserror::Error;

use crate::ecs::collection::CollectionId;
use crate::ecs::identity::Identity;

/// Errors raised by the live world: the component store, the entity manager
/// and the tag/group indices.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A component type was used before being registered with the manager.
    #[error(
        "component type `{name}` is not registered; \
         call `EntityManager::register::<{name}>()` first"
    )]
    UnregisteredComponent { name: &'static str },

    /// A runtime type list named a type that was never registered.
    #[error("component type {0:?} is not registered")]
    UnregisteredType(std::any::TypeId),

    /// The entity already carries a component of this exact type.
    #[error("entity {entity} already has a `{name}` component")]
    DuplicateComponent { entity: Identity, name: &'static str },

    /// The identity was never allocated or has been removed.
    #[error("unknown entity {0}")]
    UnknownEntity(Identity),

    /// No entity is registered under this tag.
    #[error("no entity tagged \"{0}\"")]
    UnknownTag(String),

    /// No group with this key was ever created.
    #[error("unknown group \"{0}\"")]
    UnknownGroup(String),

    /// The entity belongs to no group.
    #[error("entity {0} is not in any group")]
    Ungrouped(Identity),

    /// The collection id was not produced by this manager.
    #[error("unknown collection {0:?}")]
    UnknownCollection(CollectionId),
}

/// Result alias used throughout the live-world API.
pub type EcsResult<T> = Result<T, EcsError>;

/// Why an inheritance chain could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InheritanceFault {
    /// The base was never registered.
    MissingBase,
    /// The base depends, directly or transitively, on the child.
    Cycle,
}

/// Errors raised while registering, compiling or instantiating templates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A template was registered under an empty reference id.
    #[error("template reference id must not be empty")]
    MissingRefId,

    /// The reference id is already taken by a compiled or pending template.
    #[error("template \"{0}\" is already registered")]
    DuplicateRefId(String),

    /// The inheritance chain of `child` cannot be resolved.
    #[error("illegal inheritance: template \"{child}\" inherits from \"{base}\" ({reason:?})")]
    IllegalInheritance {
        child: String,
        base: String,
        reason: InheritanceFault,
    },

    /// No template is registered under this reference id.
    #[error("unknown template \"{0}\"")]
    UnknownTemplate(String),

    /// The template is registered but still waits for `compile()`.
    #[error("template \"{0}\" inherits from another template and has not been compiled yet")]
    NotCompiled(String),

    /// Instantiating the template into a manager failed.
    #[error(transparent)]
    Ecs(#[from] EcsError),
}

/// Errors raised while reading a JSON template manifest.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The manifest file couldn't be read.
    #[error("failed to read template manifest: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest isn't valid JSON or doesn't have the manifest shape.
    #[error("malformed template manifest: {0}")]
    Json(#[from] serde_json::Error),

    /// A template lists a component name that was never registered.
    #[error("template \"{template}\" uses unknown component \"{component}\"")]
    UnknownComponent { template: String, component: String },

    /// A component value doesn't deserialize into its registered type.
    #[error("template \"{template}\": invalid value for component \"{component}\": {source}")]
    InvalidComponent {
        template: String,
        component: String,
        #[source]
        source: serde_json::Error,
    },

    /// Registering the parsed template with the factory failed.
    #[error(transparent)]
    Template(#[from] TemplateError),
}
