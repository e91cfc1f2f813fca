//! # Template Manifests — Templates From JSON
//!
//! Level data usually lives in files, not code. A [`TemplateRegistry`] maps
//! short component type names to deserializers, so a manifest like
//!
//! ```json
//! {
//!   "templates": [
//!     { "id": "item",   "components": { "Identifier": "Item", "Sprite": "!" } },
//!     { "id": "potion", "inherits": "item", "components": { "Heals": 10 } }
//!   ]
//! }
//! ```
//!
//! can be registered with an [`EntityFactory`] in one call. Every entry is
//! parsed and its id checked before the first is registered, so a bad
//! component value or a clashing id never leaves half a manifest behind.
//! Compilation stays a separate step.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::factory::EntityFactory;
use super::prototype::Template;
use crate::ecs::component::{Component, short_type_name};
use crate::error::{LoadError, TemplateError};

type DeserializeFn = fn(serde_json::Value) -> Result<Box<dyn Component>, serde_json::Error>;

/// Maps component names to typed deserializers.
#[derive(Default)]
pub struct TemplateRegistry {
    by_name: HashMap<String, DeserializeFn>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `T` loadable under its short type name (`Sprite` for
    /// `game::components::Sprite`).
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: Component + DeserializeOwned,
    {
        let name = short_type_name(std::any::type_name::<T>());
        self.register_as::<T>(&name)
    }

    /// Make `T` loadable under an explicit name.
    pub fn register_as<T>(&mut self, name: &str) -> &mut Self
    where
        T: Component + DeserializeOwned,
    {
        let deserialize: DeserializeFn = |json| {
            let value: T = serde_json::from_value(json)?;
            Ok(Box::new(value) as Box<dyn Component>)
        };
        self.by_name.insert(name.to_string(), deserialize);
        self
    }

    /// Registered names, sorted.
    pub fn component_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Parse a manifest and register its templates. Returns how many were
    /// registered.
    pub fn load_str(&self, factory: &mut EntityFactory, json: &str) -> Result<usize, LoadError> {
        let manifest: TemplateManifest = serde_json::from_str(json)?;
        self.load(factory, manifest)
    }

    /// Read a manifest file and register its templates.
    pub fn load_file(
        &self,
        factory: &mut EntityFactory,
        path: impl AsRef<Path>,
    ) -> Result<usize, LoadError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let count = self.load_str(factory, &json)?;
        log::debug!("loaded {count} templates from {}", path.display());
        Ok(count)
    }

    /// Register an already parsed manifest.
    ///
    /// Ids must be non-empty, unique within the manifest and new to
    /// `factory`; otherwise nothing is registered.
    pub fn load(
        &self,
        factory: &mut EntityFactory,
        manifest: TemplateManifest,
    ) -> Result<usize, LoadError> {
        let mut seen = HashSet::with_capacity(manifest.templates.len());
        for entry in &manifest.templates {
            if entry.id.is_empty() {
                return Err(TemplateError::MissingRefId.into());
            }
            if !seen.insert(entry.id.as_str()) || factory.contains(&entry.id) {
                return Err(TemplateError::DuplicateRefId(entry.id.clone()).into());
            }
        }

        let mut parsed = Vec::with_capacity(manifest.templates.len());
        for entry in manifest.templates {
            let template = self.build(&entry)?;
            parsed.push((entry, template));
        }

        let count = parsed.len();
        for (entry, template) in parsed {
            match entry.inherits {
                Some(base) => factory.inherits(entry.id, base, template)?,
                None => factory.add(entry.id, template)?,
            }
        }
        Ok(count)
    }

    fn build(&self, entry: &TemplateEntry) -> Result<Template, LoadError> {
        let mut template = Template::new();
        for (name, value) in &entry.components {
            let deserialize = self
                .by_name
                .get(name)
                .ok_or_else(|| LoadError::UnknownComponent {
                    template: entry.id.clone(),
                    component: name.clone(),
                })?;
            let component =
                deserialize(value.clone()).map_err(|source| LoadError::InvalidComponent {
                    template: entry.id.clone(),
                    component: name.clone(),
                    source,
                })?;
            template.set_boxed(component);
        }
        Ok(template)
    }
}

// ── Manifest (JSON wire format) ──────────────────────────────────────────

/// A set of templates as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateManifest {
    pub templates: Vec<TemplateEntry>,
}

/// One template in a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,
    #[serde(default)]
    pub components: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ecs::manager::EntityManager;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Identifier(String);
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Sprite(String);
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Stats {
        weight: u32,
        #[serde(default)]
        heals: u32,
    }

    fn registry() -> TemplateRegistry {
        let mut registry = TemplateRegistry::new();
        registry
            .register::<Identifier>()
            .register::<Sprite>()
            .register::<Stats>();
        registry
    }

    fn manifest() -> String {
        json!({
            "templates": [
                {
                    "id": "item",
                    "components": { "Identifier": "Item", "Sprite": "!", "Stats": { "weight": 1 } }
                },
                {
                    "id": "potion",
                    "inherits": "item",
                    "components": { "Stats": { "weight": 1, "heals": 10 } }
                }
            ]
        })
        .to_string()
    }

    #[test]
    fn load_compile_create() {
        let registry = registry();
        let mut factory = EntityFactory::new();
        assert_eq!(registry.load_str(&mut factory, &manifest()).unwrap(), 2);
        assert_eq!(factory.pending_count(), 1);
        factory.compile().unwrap();

        let mut em = EntityManager::new();
        em.register::<Identifier>();
        em.register::<Sprite>();
        em.register::<Stats>();

        let potion = factory.create("potion", &mut em).unwrap();
        assert_eq!(em.get::<Sprite>(potion), Some(&Sprite("!".into())));
        assert_eq!(em.get::<Stats>(potion), Some(&Stats { weight: 1, heals: 10 }));
    }

    #[test]
    fn unknown_component_names_the_template() {
        let registry = registry();
        let mut factory = EntityFactory::new();
        let json = json!({ "templates": [{ "id": "rock", "components": { "Mass": 3 } }] });
        let err = registry.load_str(&mut factory, &json.to_string()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::UnknownComponent { ref template, ref component }
                if template == "rock" && component == "Mass"
        ));
    }

    #[test]
    fn bad_value_registers_nothing() {
        let registry = registry();
        let mut factory = EntityFactory::new();
        let json = json!({
            "templates": [
                { "id": "fine", "components": { "Sprite": "x" } },
                { "id": "broken", "components": { "Stats": { "weight": "heavy" } } }
            ]
        });
        let err = registry.load_str(&mut factory, &json.to_string()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::InvalidComponent { ref template, .. } if template == "broken"
        ));
        assert!(!factory.contains("fine"));
    }

    #[test]
    fn malformed_manifest_and_duplicates() {
        let registry = registry();
        let mut factory = EntityFactory::new();
        assert!(matches!(
            registry.load_str(&mut factory, "{ \"templates\": 3 }"),
            Err(LoadError::Json(_))
        ));

        registry.load_str(&mut factory, &manifest()).unwrap();
        assert!(matches!(
            registry.load_str(&mut factory, &manifest()),
            Err(LoadError::Template(TemplateError::DuplicateRefId(_)))
        ));
    }

    #[test]
    fn duplicate_ids_register_nothing() {
        let registry = registry();
        let mut factory = EntityFactory::new();
        let json = json!({
            "templates": [
                { "id": "first", "components": { "Sprite": "a" } },
                { "id": "dup", "components": { "Sprite": "b" } },
                { "id": "dup", "components": { "Sprite": "c" } }
            ]
        });
        let err = registry.load_str(&mut factory, &json.to_string()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Template(TemplateError::DuplicateRefId(ref id)) if id == "dup"
        ));
        assert!(!factory.contains("first"));
        assert!(!factory.contains("dup"));
    }

    #[test]
    fn clash_with_existing_template_registers_nothing() {
        let registry = registry();
        let mut factory = EntityFactory::new();
        factory.add("rock", Template::new()).unwrap();
        let json = json!({
            "templates": [
                { "id": "pebble", "components": { "Sprite": "." } },
                { "id": "rock", "components": { "Sprite": "*" } }
            ]
        });
        let err = registry.load_str(&mut factory, &json.to_string()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Template(TemplateError::DuplicateRefId(ref id)) if id == "rock"
        ));
        assert!(!factory.contains("pebble"));
    }

    #[test]
    fn empty_id_registers_nothing() {
        let registry = registry();
        let mut factory = EntityFactory::new();
        let json = json!({
            "templates": [
                { "id": "fine", "components": {} },
                { "id": "" }
            ]
        });
        let err = registry.load_str(&mut factory, &json.to_string()).unwrap_err();
        assert!(matches!(err, LoadError::Template(TemplateError::MissingRefId)));
        assert!(!factory.contains("fine"));
    }

    #[test]
    fn load_file_reads_from_disk() {
        let name = format!("warren-templates-{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, manifest()).unwrap();

        let mut factory = EntityFactory::new();
        let loaded = registry().load_file(&mut factory, &path);
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.unwrap(), 2);

        let missing = registry().load_file(&mut factory, path.with_extension("missing"));
        assert!(matches!(missing, Err(LoadError::Io(_))));
    }

    #[test]
    fn names_are_short_and_sorted() {
        assert_eq!(registry().component_names(), vec!["Identifier", "Sprite", "Stats"]);
    }
}
