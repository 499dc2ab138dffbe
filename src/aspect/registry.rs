//! Registry of aspect factories with lazy, once-only extraction.
//!
//! Hosts register a factory per aspect id up front; the descriptor is
//! instantiated and its metadata extracted the first time the aspect is
//! resolved, and both are cached for the registry's lifetime. Iteration
//! follows registration order, which fixes advice ordering across aspects.

use std::collections::HashMap;

use once_cell::sync::OnceCell;

use crate::errors::{self, BraidError};
use crate::syntax::Grammar;

use super::descriptor::{AdviceContext, AspectDescriptor, Value};
use super::{extractor, AspectMetadata};

type FactoryFn = Box<dyn Fn() -> Box<dyn AspectDescriptor> + Send + Sync>;
type ResolvedSlot = OnceCell<(Box<dyn AspectDescriptor>, AspectMetadata)>;

struct AspectEntry {
    id: String,
    factory: FactoryFn,
    slot: ResolvedSlot,
}

/// Insertion-ordered collection of registered aspects.
#[derive(Default)]
pub struct AspectRegistry {
    entries: Vec<AspectEntry>,
    index: HashMap<String, usize>,
}

impl AspectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an aspect under a unique id. The factory runs at most once,
    /// on first resolution.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> Result<(), BraidError>
    where
        F: Fn() -> Box<dyn AspectDescriptor> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(errors::invocation_error(
                format!("aspect `{id}` is already registered"),
                None,
            ));
        }
        self.index.insert(id.clone(), self.entries.len());
        self.entries.push(AspectEntry {
            id,
            factory: Box::new(factory),
            slot: OnceCell::new(),
        });
        Ok(())
    }

    /// Registered ids, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve an aspect to its instance and metadata, extracting on first
    /// use. A failed extraction leaves the slot empty, so the next call
    /// retries it.
    pub fn resolve(
        &self,
        id: &str,
        grammar: &Grammar,
    ) -> Result<(&dyn AspectDescriptor, &AspectMetadata), BraidError> {
        let entry = self
            .index
            .get(id)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| {
                errors::invocation_error(format!("aspect `{id}` is not registered"), None)
            })?;
        let (instance, metadata) = entry.slot.get_or_try_init(|| {
            let instance = (entry.factory)();
            let metadata = extractor::extract(&entry.id, instance.as_ref(), grammar)?;
            Ok::<_, BraidError>((instance, metadata))
        })?;
        Ok((instance.as_ref(), metadata))
    }

    /// Route one advice invocation into a resolved descriptor.
    pub fn call_advice(
        &self,
        instance: &dyn AspectDescriptor,
        member: &str,
        ctx: &mut AdviceContext<'_>,
    ) -> Result<Value, BraidError> {
        instance.invoke(member, ctx)
    }
}
