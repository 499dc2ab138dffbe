//! Join-point matching over the compiled pointcut arena.

use serde::{Deserialize, Serialize};

use crate::pointcut::{
    AccessOp, AnnotatedTarget, CompiledNamePattern, CompiledTypePattern, MemberScope, NodeId,
    Visibility,
};
use crate::weaver::{JoinPoint, JoinPointKind};

/// A compiled pointcut node. Children are arena indices; only
/// [`MatcherNode::Reference`] may point forward (to a pointcut declared
/// later in the same aspect), which is why the builder runs a cycle check.
#[derive(Debug, Clone)]
pub enum MatcherNode {
    MethodExecution {
        visibility: Visibility,
        class: CompiledTypePattern,
        scope: MemberScope,
        method: CompiledNamePattern,
    },
    PropertyAccess {
        access: AccessOp,
        visibility: Visibility,
        class: CompiledTypePattern,
        scope: MemberScope,
        property: CompiledNamePattern,
    },
    Annotated {
        target: AnnotatedTarget,
        annotation: CompiledNamePattern,
    },
    Initialization {
        class: CompiledTypePattern,
    },
    StaticInitialization {
        class: CompiledTypePattern,
    },
    /// Delegation to another pointcut's root node.
    Reference(NodeId),
    Not(NodeId),
    And(NodeId, NodeId),
    Or(NodeId, NodeId),
}

/// Index-based arena of compiled matcher nodes, shared by every pointcut
/// of one aspect. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct MatcherTable {
    nodes: Vec<MatcherNode>,
}

impl MatcherTable {
    pub(crate) fn from_nodes(nodes: Vec<MatcherNode>) -> Self {
        Self { nodes }
    }

    pub fn node(&self, id: NodeId) -> Option<&MatcherNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Evaluate the node at `id` against a join point. `&&`/`||`
    /// short-circuit through Rust's own operators.
    pub fn matches(&self, id: NodeId, jp: &JoinPoint) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        match node {
            MatcherNode::MethodExecution {
                visibility,
                class,
                scope,
                method,
            } => {
                // Constructor executions count as instance method executions.
                let actual_scope = match jp.kind {
                    JoinPointKind::MethodExecution => jp.scope,
                    JoinPointKind::Construction => MemberScope::Instance,
                    _ => return false,
                };
                *scope == actual_scope
                    && visibility.admits(jp.visibility)
                    && method.matches(&jp.member)
                    && class.matches_type(&jp.type_name, &jp.ancestry)
            }
            MatcherNode::PropertyAccess {
                access,
                visibility,
                class,
                scope,
                property,
            } => {
                let Some(actual) = access_of_kind(jp.kind) else {
                    return false;
                };
                access.admits(actual)
                    && *scope == jp.scope
                    && visibility.admits(jp.visibility)
                    && property.matches(&jp.member)
                    && class.matches_type(&jp.type_name, &jp.ancestry)
            }
            MatcherNode::Annotated { target, annotation } => {
                let kind_ok = match target {
                    AnnotatedTarget::Method => jp.kind == JoinPointKind::MethodExecution,
                    AnnotatedTarget::Property(access) => match access_of_kind(jp.kind) {
                        Some(actual) => access.admits(actual),
                        None => false,
                    },
                };
                kind_ok && jp.annotations.iter().any(|a| annotation.matches(a))
            }
            MatcherNode::Initialization { class } => {
                jp.kind == JoinPointKind::Construction
                    && class.matches_type(&jp.type_name, &jp.ancestry)
            }
            MatcherNode::StaticInitialization { class } => {
                jp.kind == JoinPointKind::StaticInitialization
                    && class.matches_type(&jp.type_name, &jp.ancestry)
            }
            MatcherNode::Reference(target) => self.matches(*target, jp),
            MatcherNode::Not(inner) => !self.matches(*inner, jp),
            MatcherNode::And(lhs, rhs) => self.matches(*lhs, jp) && self.matches(*rhs, jp),
            MatcherNode::Or(lhs, rhs) => self.matches(*lhs, jp) || self.matches(*rhs, jp),
        }
    }
}

impl AccessOp {
    /// Whether a concrete read/write access satisfies this requirement.
    pub fn admits(self, actual: AccessOp) -> bool {
        self == AccessOp::Any || self == actual
    }
}

/// The access operation a join point kind implies, if any.
fn access_of_kind(kind: JoinPointKind) -> Option<AccessOp> {
    match kind {
        JoinPointKind::PropertyRead => Some(AccessOp::Read),
        JoinPointKind::PropertyWrite => Some(AccessOp::Write),
        _ => None,
    }
}

/// Serialization-friendly summary of a compiled node, used by hosts that
/// want to inspect or snapshot a compiled pointcut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherNodeSummary {
    pub kind: &'static str,
    pub children: Vec<NodeId>,
}

impl MatcherNode {
    pub fn summary(&self) -> MatcherNodeSummary {
        let (kind, children) = match self {
            MatcherNode::MethodExecution { .. } => ("method_execution", vec![]),
            MatcherNode::PropertyAccess { .. } => ("property_access", vec![]),
            MatcherNode::Annotated { .. } => ("annotated", vec![]),
            MatcherNode::Initialization { .. } => ("initialization", vec![]),
            MatcherNode::StaticInitialization { .. } => ("static_initialization", vec![]),
            MatcherNode::Reference(t) => ("reference", vec![*t]),
            MatcherNode::Not(i) => ("not", vec![*i]),
            MatcherNode::And(l, r) => ("and", vec![*l, *r]),
            MatcherNode::Or(l, r) => ("or", vec![*l, *r]),
        };
        MatcherNodeSummary { kind, children }
    }
}
