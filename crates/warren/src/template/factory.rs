//! # Entity Factory — Compiling Template Inheritance
//!
//! Templates are registered in bulk, in any order, then resolved in one
//! explicit [`compile`](EntityFactory::compile) step:
//!
//! ```text
//! add("item", {Identifier, Sprite})
//! inherits("potion", "item", {Sprite, Heals})
//! inherits("big_potion", "potion", {Heals})
//!
//! compile():
//!   pre-check   every base exists (compiled or pending)
//!   queue       [potion, big_potion]
//!     potion      base "item" compiled    → item ⊕ potion
//!     big_potion  base "potion" compiled  → potion ⊕ big_potion
//! ```
//!
//! A template whose base is still pending goes to the back of the queue. A
//! full pass over the queue without progress means the remaining templates
//! inherit from each other in a cycle.
//!
//! Compiled templates are master data: [`get`](EntityFactory::get) hands out
//! fresh copies, never the stored prototypes.

use std::collections::{HashMap, VecDeque};

use super::prototype::Template;
use crate::ecs::component::Component;
use crate::ecs::identity::Identity;
use crate::ecs::manager::EntityManager;
use crate::error::{InheritanceFault, TemplateError};

/// A registered template that still waits for its base.
#[derive(Debug)]
struct Pending {
    ref_id: String,
    base: String,
    template: Template,
}

/// Registry of compiled and pending templates.
#[derive(Debug, Default)]
pub struct EntityFactory {
    compiled: HashMap<String, Template>,
    pending: Vec<Pending>,
}

impl EntityFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a finished template under `ref_id`.
    pub fn add(
        &mut self,
        ref_id: impl Into<String>,
        template: Template,
    ) -> Result<(), TemplateError> {
        let ref_id = self.check_ref_id(ref_id.into())?;
        log::trace!("template \"{ref_id}\": {template:?}");
        self.compiled.insert(ref_id, template);
        Ok(())
    }

    /// Register a template to be merged over `base` at the next
    /// [`compile`](Self::compile).
    pub fn inherits(
        &mut self,
        ref_id: impl Into<String>,
        base: impl Into<String>,
        template: Template,
    ) -> Result<(), TemplateError> {
        let ref_id = self.check_ref_id(ref_id.into())?;
        let base = base.into();
        log::trace!("template \"{ref_id}\" (inherits \"{base}\"): {template:?}");
        self.pending.push(Pending {
            ref_id,
            base,
            template,
        });
        Ok(())
    }

    fn check_ref_id(&self, ref_id: String) -> Result<String, TemplateError> {
        if ref_id.is_empty() {
            return Err(TemplateError::MissingRefId);
        }
        if self.contains(&ref_id) {
            return Err(TemplateError::DuplicateRefId(ref_id));
        }
        Ok(ref_id)
    }

    /// Resolve every pending template. Returns how many were compiled.
    ///
    /// Fails without touching anything if a base was never registered. On a
    /// cycle, templates resolved before it stay compiled and the members of
    /// the cycle stay pending.
    pub fn compile(&mut self) -> Result<usize, TemplateError> {
        if let Some(orphan) = self.pending.iter().find(|p| !self.contains(&p.base)) {
            return Err(TemplateError::IllegalInheritance {
                child: orphan.ref_id.clone(),
                base: orphan.base.clone(),
                reason: InheritanceFault::MissingBase,
            });
        }

        let mut queue: VecDeque<Pending> = std::mem::take(&mut self.pending).into();
        let mut compiled = 0;
        let mut stalled = 0;
        while let Some(next) = queue.pop_front() {
            match self.compiled.get(&next.base) {
                Some(base) => {
                    let merged = Template::merged(base, &next.template);
                    self.compiled.insert(next.ref_id, merged);
                    compiled += 1;
                    stalled = 0;
                }
                None => {
                    queue.push_back(next);
                    stalled += 1;
                    if stalled == queue.len() {
                        let stuck = &queue[0];
                        let err = TemplateError::IllegalInheritance {
                            child: stuck.ref_id.clone(),
                            base: stuck.base.clone(),
                            reason: InheritanceFault::Cycle,
                        };
                        self.pending = queue.into();
                        return Err(err);
                    }
                }
            }
        }
        log::debug!(
            "compiled {compiled} templates ({} available)",
            self.compiled.len()
        );
        Ok(compiled)
    }

    /// Fresh copies of every component of a compiled template.
    pub fn get(&self, ref_id: &str) -> Result<Vec<Box<dyn Component>>, TemplateError> {
        self.template(ref_id).map(Template::instantiate)
    }

    /// Read access to a compiled template.
    pub fn template(&self, ref_id: &str) -> Result<&Template, TemplateError> {
        if let Some(template) = self.compiled.get(ref_id) {
            return Ok(template);
        }
        if self.pending.iter().any(|p| p.ref_id == ref_id) {
            Err(TemplateError::NotCompiled(ref_id.to_string()))
        } else {
            Err(TemplateError::UnknownTemplate(ref_id.to_string()))
        }
    }

    /// Create an entity in `manager` from a compiled template.
    pub fn create(
        &self,
        ref_id: &str,
        manager: &mut EntityManager,
    ) -> Result<Identity, TemplateError> {
        let components = self.get(ref_id)?;
        let id = manager.create(components)?;
        log::trace!("{id} created from template \"{ref_id}\"");
        Ok(id)
    }

    /// Is `ref_id` registered, compiled or not?
    pub fn contains(&self, ref_id: &str) -> bool {
        self.compiled.contains_key(ref_id) || self.pending.iter().any(|p| p.ref_id == ref_id)
    }

    pub fn is_compiled(&self, ref_id: &str) -> bool {
        self.compiled.contains_key(ref_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Every registered reference id, sorted.
    pub fn ref_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .compiled
            .keys()
            .map(String::as_str)
            .chain(self.pending.iter().map(|p| p.ref_id.as_str()))
            .collect();
        ids.sort_unstable();
        ids
    }
}
