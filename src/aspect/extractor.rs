//! Scans a descriptor's members and extracts its pointcuts and advice.
//!
//! Member names are the declaration surface: `pointcut_<name>` members are
//! invoked once and must return the expression text to compile;
//! `before_<name>_<suffix>`, `after_<name>_<suffix>` and
//! `around_<name>_<suffix>` members bind advice to the named pointcut.
//! Delimiter-shaped names that fit neither role are skipped, not fatal;
//! ordinary members are ignored entirely.

use std::collections::HashMap;

use crate::errors::{self, BraidError};
use crate::pointcut::{build_pointcuts, PointcutDecl};
use crate::syntax::{Grammar, Lexer, Parser, Span};

use super::{
    AdviceBindings, AdviceKind, AspectDescriptor, AspectMetadata, MemberKind, Value, DELIMITER,
};
use crate::aspect::descriptor::AdviceContext;

/// What a member name means to the extractor.
enum MemberRole {
    Pointcut(String),
    Advice { kind: AdviceKind, pointcut: String },
}

/// Classify a member name against the naming convention. `Ok(None)` means
/// the member does not participate in weaving at all; an
/// `UnknownAdviceKind` error means the name is delimiter-shaped but fits
/// no role.
fn classify(name: &str) -> Result<Option<MemberRole>, BraidError> {
    let parts: Vec<&str> = name.split(DELIMITER).collect();
    if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
        return Ok(None);
    }
    if parts[0] == "pointcut" && parts.len() == 2 {
        return Ok(Some(MemberRole::Pointcut(parts[1].to_string())));
    }
    match AdviceKind::from_token(parts[0]) {
        Some(kind) if parts.len() == 3 => Ok(Some(MemberRole::Advice {
            kind,
            pointcut: parts[1].to_string(),
        })),
        _ => Err(errors::unknown_advice_kind(name)),
    }
}

/// Extract the full metadata for one aspect.
///
/// Fails with `PointlessAspect` when the scan finds pointcuts without
/// advice or advice without pointcuts, and with a parse error when advice
/// binds to a pointcut name no declaration provides.
pub fn extract(
    aspect_id: &str,
    descriptor: &dyn AspectDescriptor,
    grammar: &Grammar,
) -> Result<AspectMetadata, BraidError> {
    let mut decls: Vec<PointcutDecl> = Vec::new();
    let mut advices: Vec<(String, AdviceKind, String)> = Vec::new();

    for member in descriptor.members() {
        if member.kind != MemberKind::Method {
            continue;
        }
        match classify(&member.name) {
            Ok(None) => {}
            Ok(Some(MemberRole::Pointcut(name))) => {
                let text = expression_text(aspect_id, descriptor, &member.name)?;
                let src = errors::to_error_source(format!("{aspect_id}::{}", member.name), &text);
                let tokens = Lexer::new(&text, src.clone()).tokenize()?;
                let expr = Parser::new(grammar, tokens, src.clone()).parse()?;
                decls.push(PointcutDecl {
                    name,
                    expr,
                    source: src,
                });
            }
            Ok(Some(MemberRole::Advice { kind, pointcut })) => {
                advices.push((pointcut, kind, member.name));
            }
            // Tolerated: the member simply does not take part in weaving.
            Err(BraidError::UnknownAdviceKind { .. }) => {}
            Err(other) => return Err(other),
        }
    }

    if decls.is_empty() || advices.is_empty() {
        return Err(errors::pointless_aspect(aspect_id));
    }

    let pointcuts = build_pointcuts(decls)?;

    let mut advice: HashMap<String, AdviceBindings> = HashMap::new();
    for (pointcut, kind, member) in advices {
        if !pointcuts.iter().any(|p| p.name() == pointcut) {
            let src = errors::to_error_source(aspect_id, &member);
            return Err(errors::parse_error_with_help(
                format!("advice `{member}` binds to undeclared pointcut `{pointcut}`"),
                &src,
                Span::new(0, member.len()),
                "advice member names follow `<kind>_<pointcutName>_<suffix>`",
            ));
        }
        advice.entry(pointcut).or_default().push(kind, member);
    }

    Ok(AspectMetadata::new(aspect_id.to_string(), pointcuts, advice))
}

/// Invoke a pointcut declaration member and require a text result.
fn expression_text(
    aspect_id: &str,
    descriptor: &dyn AspectDescriptor,
    member: &str,
) -> Result<String, BraidError> {
    let mut ctx = AdviceContext::detached();
    match descriptor.invoke(member, &mut ctx)? {
        Value::Text(text) => Ok(text),
        other => Err(errors::invocation_error(
            format!("pointcut member `{aspect_id}::{member}` returned {other:?} instead of an expression string"),
            None,
        )),
    }
}

#[cfg(test)]
mod extractor_tests {
    use super::*;
    use crate::aspect::AspectMember;
    use crate::weaver::JoinPoint;

    /// Descriptor whose members are (name, expression-text-or-empty) pairs.
    struct TableAspect {
        members: Vec<(&'static str, &'static str)>,
    }

    impl AspectDescriptor for TableAspect {
        fn members(&self) -> Vec<AspectMember> {
            self.members
                .iter()
                .map(|(name, _)| AspectMember::method(*name))
                .collect()
        }

        fn invoke(
            &self,
            member: &str,
            _ctx: &mut AdviceContext<'_>,
        ) -> Result<Value, BraidError> {
            let (_, text) = self
                .members
                .iter()
                .find(|(name, _)| *name == member)
                .ok_or_else(|| errors::invocation_error("no such member", None))?;
            Ok(Value::Text(text.to_string()))
        }
    }

    fn grammar() -> Grammar {
        Grammar::pointcut_language()
    }

    #[test]
    fn pointcuts_and_advice_are_paired() {
        let aspect = TableAspect {
            members: vec![
                ("pointcut_entry", "{public Service->run()}"),
                ("before_entry_log", ""),
                ("after_entry_log", ""),
                ("helper", ""),
            ],
        };
        let meta = extract("Logging", &aspect, &grammar()).unwrap();
        assert_eq!(meta.pointcuts().len(), 1);
        let bindings = meta.bindings("entry").unwrap();
        assert_eq!(bindings.before, vec!["before_entry_log"]);
        assert_eq!(bindings.after, vec!["after_entry_log"]);
        assert!(bindings.around.is_empty());
    }

    #[test]
    fn advice_declaration_order_is_preserved() {
        let aspect = TableAspect {
            members: vec![
                ("pointcut_entry", "{public Service->run()}"),
                ("before_entry_first", ""),
                ("before_entry_second", ""),
            ],
        };
        let meta = extract("Ordered", &aspect, &grammar()).unwrap();
        let bindings = meta.bindings("entry").unwrap();
        assert_eq!(bindings.before, vec!["before_entry_first", "before_entry_second"]);
    }

    #[test]
    fn pointcut_without_advice_is_pointless() {
        let aspect = TableAspect {
            members: vec![("pointcut_entry", "{public Service->run()}")],
        };
        let err = extract("Lonely", &aspect, &grammar()).unwrap_err();
        assert!(matches!(err, BraidError::PointlessAspect { .. }));
    }

    #[test]
    fn advice_without_pointcut_is_pointless() {
        let aspect = TableAspect {
            members: vec![("before_entry_log", "")],
        };
        let err = extract("Lonely", &aspect, &grammar()).unwrap_err();
        assert!(matches!(err, BraidError::PointlessAspect { .. }));
    }

    #[test]
    fn unknown_delimiter_shapes_are_skipped() {
        let aspect = TableAspect {
            members: vec![
                ("pointcut_entry", "{public Service->run()}"),
                ("before_entry_log", ""),
                // Two parts but not `pointcut_*`, four parts: both skipped.
                ("during_entry", ""),
                ("before_entry_log_extra", ""),
            ],
        };
        let meta = extract("Tolerant", &aspect, &grammar()).unwrap();
        assert_eq!(meta.bindings("entry").unwrap().before, vec!["before_entry_log"]);
    }

    #[test]
    fn advice_bound_to_missing_pointcut_fails() {
        let aspect = TableAspect {
            members: vec![
                ("pointcut_entry", "{public Service->run()}"),
                ("before_entry_log", ""),
                ("before_exit_log", ""),
            ],
        };
        let err = extract("Dangling", &aspect, &grammar()).unwrap_err();
        let BraidError::Parse { message, .. } = &err else {
            panic!("expected parse error, got {err:?}");
        };
        assert!(message.contains("exit"));
    }

    #[test]
    fn named_references_resolve_across_members() {
        let aspect = TableAspect {
            members: vec![
                ("pointcut_all", "entry || exit"),
                ("pointcut_entry", "{public Service->start()}"),
                ("pointcut_exit", "{public Service->stop()}"),
                ("before_all_log", ""),
            ],
        };
        let meta = extract("Composite", &aspect, &grammar()).unwrap();
        let all = meta.pointcut("all").unwrap();
        assert!(all.matches(&JoinPoint::method_execution("Service", "start")));
        assert!(all.matches(&JoinPoint::method_execution("Service", "stop")));
        assert!(!all.matches(&JoinPoint::method_execution("Service", "run")));
    }
}
