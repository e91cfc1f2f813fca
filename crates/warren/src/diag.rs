//! Diagnostics snapshot — a serializable summary of an [`EntityManager`].
//!
//! Enabled by the `diagnostics` feature flag (on by default). Call
//! [`EntityManager::diagnostics`] whenever you want a picture of the world,
//! e.g. once per turn in a debug build, and write it as JSON with
//! [`DiagSnapshot::to_json`].

use serde::Serialize;

use crate::ecs::component::short_type_name;
use crate::ecs::manager::EntityManager;

// ── Snapshot types (wire format) ────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DiagSnapshot {
    pub entity_count: usize,
    /// Identities handed out since the manager was created, live or not.
    pub identities_allocated: u64,
    pub components: Vec<ComponentStat>,
    pub collections: Vec<CollectionStat>,
    pub tag_count: usize,
    pub group_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentStat {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStat {
    pub id: usize,
    pub component_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<&'static str>,
    pub members: usize,
}

impl DiagSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl EntityManager {
    /// Summarize entity, component and collection counts.
    pub fn diagnostics(&self) -> DiagSnapshot {
        let components = self
            .registry()
            .iter()
            .map(|(type_id, name)| ComponentStat {
                name: short_type_name(name),
                count: self.store().count(type_id),
            })
            .collect();

        let collections = self
            .collections()
            .iter()
            .map(|collection| CollectionStat {
                id: collection.id().0,
                component_names: self.type_names(collection.types()),
                sort: collection.sort_name(),
                members: collection.len(),
            })
            .collect();

        DiagSnapshot {
            entity_count: self.entity_count(),
            identities_allocated: self.total_allocated(),
            components,
            collections,
            tag_count: self.tags().len(),
            group_count: self.groups().groups().count(),
        }
    }
}
