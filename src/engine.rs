//! The engine context: one grammar, one aspect registry, and the weavers
//! built over them.
//!
//! [`EngineContext`] is the single entry point a host embeds. Aspects are
//! registered up front; pointcut compilation and metadata extraction run
//! lazily on first use and are cached for the context's lifetime.

use crate::aspect::{AspectDescriptor, AspectMetadata, AspectRegistry};
use crate::errors::{self, BraidError};
use crate::pointcut::{build_pointcuts, Pointcut, PointcutDecl};
use crate::syntax::{parse_expression, Grammar};
use crate::weaver::{LoadTimeWeaver, PathEligibility, SourceRewriter, Weaver};

pub struct EngineContext {
    grammar: Grammar,
    registry: AspectRegistry,
}

impl EngineContext {
    pub fn new() -> Self {
        Self {
            grammar: Grammar::pointcut_language(),
            registry: AspectRegistry::new(),
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn registry(&self) -> &AspectRegistry {
        &self.registry
    }

    /// Register an aspect factory under a unique id.
    pub fn register_aspect<F>(&mut self, id: impl Into<String>, factory: F) -> Result<(), BraidError>
    where
        F: Fn() -> Box<dyn AspectDescriptor> + Send + Sync + 'static,
    {
        self.registry.register(id, factory)
    }

    /// Resolve an aspect, extracting its metadata on first use.
    pub fn aspect(
        &self,
        id: &str,
    ) -> Result<(&dyn AspectDescriptor, &AspectMetadata), BraidError> {
        self.registry.resolve(id, &self.grammar)
    }

    /// Compile a standalone pointcut expression. Named references are not
    /// available here; they only resolve within an aspect's declarations.
    pub fn compile_pointcut(&self, name: &str, text: &str) -> Result<Pointcut, BraidError> {
        let expr = parse_expression(&self.grammar, text)?;
        let source = errors::to_error_source(name, text);
        let mut pointcuts = build_pointcuts(vec![PointcutDecl {
            name: name.to_string(),
            expr,
            source,
        }])?;
        pointcuts
            .pop()
            .ok_or_else(|| errors::invocation_error("compilation produced no pointcut", None))
    }

    /// A dispatch-time weaver over this context's aspects.
    pub fn weaver(&self) -> Weaver<'_> {
        Weaver::new(self)
    }

    /// A load-time weaver with host-supplied eligibility and rewriting.
    pub fn load_time_weaver<'a>(
        &'a self,
        eligibility: &'a dyn PathEligibility,
        rewriter: &'a dyn SourceRewriter,
    ) -> LoadTimeWeaver<'a> {
        LoadTimeWeaver::new(self.weaver(), eligibility, rewriter)
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new()
    }
}
