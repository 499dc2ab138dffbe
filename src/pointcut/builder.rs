//! Lowers parsed pointcut expressions into the compiled matcher arena.
//!
//! Building is separate from parsing so that named references may point at
//! pointcuts declared later in the same aspect: all declarations are
//! lowered first, references are patched afterwards, and a cycle check
//! rejects mutually recursive definitions.

use std::sync::Arc;

use crate::errors::{self, BraidError, SourceArc};
use crate::pointcut::{
    pattern, MatcherNode, MatcherTable, NodeId, Pointcut, PointcutExpr, TypePattern,
};
use crate::syntax::{Span, Spanned};

/// One parsed `pointcut` declaration awaiting compilation.
#[derive(Debug, Clone)]
pub struct PointcutDecl {
    pub name: String,
    pub expr: Spanned<PointcutExpr>,
    pub source: SourceArc,
}

/// A named reference lowered before its target was known.
struct PendingRef {
    node: NodeId,
    name: String,
    span: Span,
    source: SourceArc,
}

/// Compile a set of declarations into pointcuts sharing one arena.
/// Declaration order is preserved in the returned vector.
pub fn build_pointcuts(decls: Vec<PointcutDecl>) -> Result<Vec<Pointcut>, BraidError> {
    let mut nodes: Vec<MatcherNode> = Vec::new();
    let mut pending: Vec<PendingRef> = Vec::new();
    let mut roots: Vec<(String, NodeId)> = Vec::new();

    for decl in &decls {
        if roots.iter().any(|(name, _)| name == &decl.name) {
            return Err(errors::parse_error(
                format!("duplicate pointcut `{}`", decl.name),
                &decl.source,
                decl.expr.span,
            ));
        }
        let root = lower(&decl.expr, &decl.source, &mut nodes, &mut pending)?;
        roots.push((decl.name.clone(), root));
    }

    for reference in pending {
        match roots.iter().find(|(name, _)| *name == reference.name) {
            Some((_, target)) => nodes[reference.node] = MatcherNode::Reference(*target),
            None => {
                return Err(errors::parse_error_with_help(
                    format!("reference to undeclared pointcut `{}`", reference.name),
                    &reference.source,
                    reference.span,
                    "a bare identifier must name a pointcut declared in the same aspect",
                ))
            }
        }
    }

    detect_cycles(&nodes, &roots, &decls)?;

    let table = Arc::new(MatcherTable::from_nodes(nodes));
    Ok(roots
        .into_iter()
        .map(|(name, root)| Pointcut::new(name, root, Arc::clone(&table)))
        .collect())
}

/// Recursively lower one expression. Children land in the arena before
/// their parents, so every edge except `Reference` points backwards.
fn lower(
    expr: &Spanned<PointcutExpr>,
    src: &SourceArc,
    nodes: &mut Vec<MatcherNode>,
    pending: &mut Vec<PendingRef>,
) -> Result<NodeId, BraidError> {
    let span = expr.span;
    let node = match &expr.value {
        PointcutExpr::MethodExecution {
            visibility,
            class,
            scope,
            method,
        } => MatcherNode::MethodExecution {
            visibility: *visibility,
            class: pattern::compile_type_pattern(class, src, span)?,
            scope: *scope,
            method: pattern::compile_name_pattern(method, src, span)?,
        },
        PointcutExpr::PropertyAccess {
            access,
            visibility,
            class,
            scope,
            property,
        } => MatcherNode::PropertyAccess {
            access: *access,
            visibility: *visibility,
            class: pattern::compile_type_pattern(class, src, span)?,
            scope: *scope,
            property: pattern::compile_name_pattern(property, src, span)?,
        },
        PointcutExpr::Annotated { target, annotation } => MatcherNode::Annotated {
            target: *target,
            annotation: pattern::compile_name_pattern(annotation, src, span)?,
        },
        PointcutExpr::Initialization { class } => MatcherNode::Initialization {
            class: compile_class(class, src, span)?,
        },
        PointcutExpr::StaticInitialization { class } => MatcherNode::StaticInitialization {
            class: compile_class(class, src, span)?,
        },
        PointcutExpr::Named(name) => {
            // Placeholder, patched once every declaration is known.
            let id = push(nodes, MatcherNode::Reference(NodeId::MAX));
            pending.push(PendingRef {
                node: id,
                name: name.clone(),
                span,
                source: src.clone(),
            });
            return Ok(id);
        }
        PointcutExpr::Not(inner) => {
            let inner = lower(inner, src, nodes, pending)?;
            MatcherNode::Not(inner)
        }
        PointcutExpr::And(lhs, rhs) => {
            let lhs = lower(lhs, src, nodes, pending)?;
            let rhs = lower(rhs, src, nodes, pending)?;
            MatcherNode::And(lhs, rhs)
        }
        PointcutExpr::Or(lhs, rhs) => {
            let lhs = lower(lhs, src, nodes, pending)?;
            let rhs = lower(rhs, src, nodes, pending)?;
            MatcherNode::Or(lhs, rhs)
        }
        // Grouping only affects parse structure.
        PointcutExpr::Group(inner) => return lower(inner, src, nodes, pending),
    };
    Ok(push(nodes, node))
}

fn compile_class(
    class: &TypePattern,
    src: &SourceArc,
    span: Span,
) -> Result<pattern::CompiledTypePattern, BraidError> {
    pattern::compile_type_pattern(class, src, span)
}

fn push(nodes: &mut Vec<MatcherNode>, node: MatcherNode) -> NodeId {
    nodes.push(node);
    nodes.len() - 1
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    White,
    Grey,
    Black,
}

/// Depth-first coloring over the arena. Only `Reference` edges can point
/// forward, so any grey re-entry is a genuine reference cycle.
fn detect_cycles(
    nodes: &[MatcherNode],
    roots: &[(String, NodeId)],
    decls: &[PointcutDecl],
) -> Result<(), BraidError> {
    let mut marks = vec![Mark::White; nodes.len()];
    for (name, root) in roots {
        if visit(nodes, *root, &mut marks) {
            continue;
        }
        let decl = decls
            .iter()
            .find(|d| &d.name == name)
            .ok_or_else(|| errors::invocation_error("declaration list out of sync", None))?;
        return Err(errors::parse_error_with_help(
            format!("circular reference in pointcut `{name}`"),
            &decl.source,
            decl.expr.span,
            "named pointcut references must not form a cycle",
        ));
    }
    Ok(())
}

/// Returns false when a cycle is reachable from `id`.
fn visit(nodes: &[MatcherNode], id: NodeId, marks: &mut Vec<Mark>) -> bool {
    match marks.get(id).copied() {
        Some(Mark::Black) => return true,
        Some(Mark::Grey) => return false,
        Some(Mark::White) => {}
        None => return false,
    }
    marks[id] = Mark::Grey;
    let ok = match &nodes[id] {
        MatcherNode::Reference(target) => visit(nodes, *target, marks),
        MatcherNode::Not(inner) => visit(nodes, *inner, marks),
        MatcherNode::And(lhs, rhs) | MatcherNode::Or(lhs, rhs) => {
            visit(nodes, *lhs, marks) && visit(nodes, *rhs, marks)
        }
        _ => true,
    };
    marks[id] = Mark::Black;
    ok
}

#[cfg(test)]
mod builder_tests {
    use super::*;
    use crate::syntax::{parse_expression, Grammar};

    fn decl(name: &str, text: &str) -> PointcutDecl {
        let grammar = Grammar::pointcut_language();
        PointcutDecl {
            name: name.to_string(),
            expr: parse_expression(&grammar, text).unwrap(),
            source: errors::to_error_source(name, text),
        }
    }

    #[test]
    fn forward_references_resolve() {
        let pointcuts = build_pointcuts(vec![
            decl("combined", "entry && !exit"),
            decl("entry", "{public Service->start()}"),
            decl("exit", "{public Service->stop()}"),
        ])
        .unwrap();
        assert_eq!(pointcuts.len(), 3);
        assert_eq!(pointcuts[0].name(), "combined");
    }

    #[test]
    fn undeclared_reference_is_a_parse_error() {
        let err = build_pointcuts(vec![decl("only", "entry && missing")]).unwrap_err();
        let BraidError::Parse { message, .. } = &err else {
            panic!("expected parse error");
        };
        assert!(message.contains("missing") || message.contains("entry"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = build_pointcuts(vec![
            decl("p", "{public A->run()}"),
            decl("p", "{public B->run()}"),
        ])
        .unwrap_err();
        assert!(matches!(err, BraidError::Parse { .. }));
    }

    #[test]
    fn reference_cycles_are_rejected() {
        let err = build_pointcuts(vec![decl("a", "b || {public X->y()}"), decl("b", "a")])
            .unwrap_err();
        let BraidError::Parse { message, .. } = &err else {
            panic!("expected parse error");
        };
        assert!(message.contains("circular"));
    }

    #[test]
    fn self_reference_is_rejected() {
        let err = build_pointcuts(vec![decl("a", "!a")]).unwrap_err();
        assert!(matches!(err, BraidError::Parse { .. }));
    }

    #[test]
    fn grouping_is_transparent_in_the_arena() {
        let built = build_pointcuts(vec![
            decl("p", "({public A->run()} && q)"),
            decl("q", "{public B->run()}"),
        ])
        .unwrap();
        let summary = serde_json::to_value(
            (0..3)
                .filter_map(|i| built[0].table().node(i).map(MatcherNode::summary))
                .collect::<Vec<_>>(),
        )
        .unwrap();
        let kinds: Vec<&str> = summary
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["kind"].as_str().unwrap())
            .collect();
        // No node for the parentheses themselves.
        assert_eq!(kinds, vec!["method_execution", "reference", "and"]);
    }
}
