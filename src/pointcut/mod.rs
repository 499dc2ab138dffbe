//! Pointcut expression tree and compiled matchers.
//!
//! The parser produces [`PointcutExpr`] values; the builder lowers them
//! into an index-based [`MatcherTable`] arena whose nodes carry compiled
//! wildcard patterns, and hands out named [`Pointcut`] handles into it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::syntax::Spanned;
use crate::weaver::JoinPoint;

pub mod builder;
pub mod matcher;
pub mod pattern;

pub use builder::{build_pointcuts, PointcutDecl};
pub use matcher::{MatcherNode, MatcherTable};
pub use pattern::{CompiledNamePattern, CompiledTypePattern};

/// Member visibility, both as declared on a join point and as required by
/// a pointcut (`Any` is the `*` modifier and never appears on join points).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Protected,
    Private,
    Any,
}

impl Visibility {
    /// Whether a join point declared with `actual` satisfies this requirement.
    pub fn admits(self, actual: Visibility) -> bool {
        self == Visibility::Any || self == actual
    }
}

/// Property access operation required by a pointcut (`Any` is `*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessOp {
    Read,
    Write,
    Any,
}

/// Whether a member is reached through `::` (static) or `->` (instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberScope {
    Static,
    Instance,
}

/// The member kind an annotated pointcut targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotatedTarget {
    Method,
    Property(AccessOp),
}

/// A namespace pattern plus the optional `+` subtype-inclusion suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypePattern {
    pub text: String,
    pub subtypes: bool,
}

impl TypePattern {
    pub fn new(text: impl Into<String>, subtypes: bool) -> Self {
        Self {
            text: text.into(),
            subtypes,
        }
    }
}

/// Tagged union over the five primitive pointcut kinds plus the composite
/// forms. Patterns are raw text here; validation and compilation happen in
/// the builder, once, not on every match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointcutExpr {
    MethodExecution {
        visibility: Visibility,
        class: TypePattern,
        scope: MemberScope,
        method: String,
    },
    PropertyAccess {
        access: AccessOp,
        visibility: Visibility,
        class: TypePattern,
        scope: MemberScope,
        property: String,
    },
    Annotated {
        target: AnnotatedTarget,
        annotation: String,
    },
    Initialization {
        class: TypePattern,
    },
    StaticInitialization {
        class: TypePattern,
    },
    /// Reference to a pointcut declared elsewhere in the same aspect.
    Named(String),
    Not(Box<Spanned<PointcutExpr>>),
    And(Box<Spanned<PointcutExpr>>, Box<Spanned<PointcutExpr>>),
    Or(Box<Spanned<PointcutExpr>>, Box<Spanned<PointcutExpr>>),
    Group(Box<Spanned<PointcutExpr>>),
}

/// Index of a compiled node within a [`MatcherTable`].
pub type NodeId = usize;

/// A named, compiled predicate over join points. Cheap to clone; all
/// pointcuts of one aspect share a single arena.
#[derive(Debug, Clone)]
pub struct Pointcut {
    name: String,
    root: NodeId,
    table: Arc<MatcherTable>,
}

impl Pointcut {
    pub(crate) fn new(name: String, root: NodeId, table: Arc<MatcherTable>) -> Self {
        Self { name, root, table }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared arena this pointcut's matcher lives in.
    pub fn table(&self) -> &MatcherTable {
        &self.table
    }

    /// Evaluates this pointcut against a concrete join point.
    pub fn matches(&self, join_point: &JoinPoint) -> bool {
        self.table.matches(self.root, join_point)
    }
}
