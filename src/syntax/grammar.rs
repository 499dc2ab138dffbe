//! Declarative grammar table for the pointcut language.
//!
//! Pure data: a named set of rules, each an alternation of symbol
//! sequences. The table is built once per process and cloned into each
//! engine context; the parser interprets it, the table itself has no
//! behavior beyond lookup and validation.
//!
//! Grammar Invariant: every nonterminal referenced by a sequence must be
//! defined, and exactly one root rule exists. The table is acyclic except
//! through the explicit `pointcut_expression` recursion that
//! parenthesization bottoms out; termination is the parser's concern,
//! bounded by the token stream.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::syntax::TokenKind;

// Rule names, shared between the table and the parser.
pub const RULE_ROOT: &str = "pointcut_expression";
pub const RULE_POINTCUT: &str = "pointcut";
pub const RULE_METHOD_EXECUTION: &str = "method_execution";
pub const RULE_PROPERTY_ACCESS: &str = "property_access";
pub const RULE_ANNOTATED: &str = "annotated";
pub const RULE_INITIALIZATION: &str = "initialization";
pub const RULE_STATIC_INITIALIZATION: &str = "static_initialization";
pub const RULE_NAMED_REFERENCE: &str = "named_reference";
pub const RULE_COMPLEX: &str = "complex_pointcut";
pub const RULE_NEGATION: &str = "negation";
pub const RULE_CONJUNCTION: &str = "conjunction";
pub const RULE_DISJUNCTION: &str = "disjunction";

/// Token kinds accepted in the member-visibility slot.
pub const MODIFIER: &[TokenKind] = &[
    TokenKind::Public,
    TokenKind::Protected,
    TokenKind::Private,
    TokenKind::Star,
];

/// Token kinds accepted in the property access-operation slot.
pub const ACCESS_OP: &[TokenKind] = &[TokenKind::Read, TokenKind::Write, TokenKind::Star];

/// Token kinds accepted in the member-access-operator slot.
pub const MEMBER_OP: &[TokenKind] = &[TokenKind::StaticAccess, TokenKind::InstanceAccess];

/// Token kinds that can stand as a namespace/type pattern.
pub const TYPE_PATTERN: &[TokenKind] = &[
    TokenKind::NamespacePattern,
    TokenKind::NamePattern,
    TokenKind::Identifier,
    TokenKind::Star,
    TokenKind::DoubleStar,
];

/// Token kinds that can stand as a member-name pattern.
pub const NAME_PATTERN: &[TokenKind] = &[
    TokenKind::NamePattern,
    TokenKind::Identifier,
    TokenKind::Star,
];

/// Token kinds that can stand as an annotation pattern.
pub const ANNOTATION_PATTERN: &[TokenKind] = &[
    TokenKind::NamespacePattern,
    TokenKind::NamePattern,
    TokenKind::Identifier,
    TokenKind::Star,
];

/// A single element of a grammar sequence.
#[derive(Debug, Clone)]
pub enum GrammarSymbol {
    /// Exactly this terminal token kind.
    Terminal(TokenKind),
    /// Any one of these terminal token kinds.
    OneOf(&'static [TokenKind]),
    /// A reference to another rule.
    Nonterminal(&'static str),
    /// Zero or one occurrence of the wrapped symbol.
    Optional(Box<GrammarSymbol>),
}

/// A named nonterminal mapped to an alternation of sequences.
#[derive(Debug, Clone)]
pub struct GrammarRule {
    pub name: &'static str,
    pub alternatives: Vec<Vec<GrammarSymbol>>,
}

/// The read-only rule table plus its designated root.
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: Vec<GrammarRule>,
    index: HashMap<&'static str, usize>,
    root: &'static str,
}

static POINTCUT_LANGUAGE: Lazy<Grammar> = Lazy::new(build_pointcut_language);

impl Grammar {
    /// The grammar of the pointcut expression language. Built once per
    /// process; each call hands out a cheap clone of the immutable table.
    pub fn pointcut_language() -> Grammar {
        POINTCUT_LANGUAGE.clone()
    }

    pub fn root_rule(&self) -> &'static str {
        self.root
    }

    pub fn rule(&self, name: &str) -> Option<&GrammarRule> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    pub fn rules(&self) -> &[GrammarRule] {
        &self.rules
    }

    /// Checks the table invariants: unique rule names, a defined root, and
    /// no dangling nonterminal references.
    pub fn validate(&self) -> Result<(), String> {
        if self.index.len() != self.rules.len() {
            return Err("duplicate rule names in grammar".to_string());
        }
        if !self.index.contains_key(self.root) {
            return Err(format!("root rule `{}` is not defined", self.root));
        }
        for rule in &self.rules {
            for alt in &rule.alternatives {
                for symbol in alt {
                    self.check_symbol(rule.name, symbol)?;
                }
            }
        }
        Ok(())
    }

    fn check_symbol(&self, rule: &str, symbol: &GrammarSymbol) -> Result<(), String> {
        match symbol {
            GrammarSymbol::Nonterminal(name) if !self.index.contains_key(name) => {
                Err(format!("rule `{rule}` references undefined rule `{name}`"))
            }
            GrammarSymbol::Optional(inner) => self.check_symbol(rule, inner),
            _ => Ok(()),
        }
    }

    /// Human-readable terminal name, used only for diagnostics.
    pub fn display_name(kind: TokenKind) -> &'static str {
        match kind {
            TokenKind::Whitespace => "whitespace",
            TokenKind::PointcutOpen => "`{`",
            TokenKind::PointcutClose => "`}`",
            TokenKind::GroupOpen => "`(`",
            TokenKind::GroupClose => "`)`",
            TokenKind::MethodParens => "`()`",
            TokenKind::StaticAccess => "`::`",
            TokenKind::InstanceAccess => "`->`",
            TokenKind::Not => "`!`",
            TokenKind::And => "`&&`",
            TokenKind::Or => "`||`",
            TokenKind::Plus => "`+`",
            TokenKind::At => "`@`",
            TokenKind::Star => "`*`",
            TokenKind::DoubleStar => "`**`",
            TokenKind::Public => "`public`",
            TokenKind::Protected => "`protected`",
            TokenKind::Private => "`private`",
            TokenKind::Read => "`read`",
            TokenKind::Write => "`write`",
            TokenKind::Method => "`method`",
            TokenKind::Property => "`property`",
            TokenKind::Static => "`static`",
            TokenKind::New => "`new`",
            TokenKind::NamespacePattern => "namespace pattern",
            TokenKind::NamePattern => "name pattern",
            TokenKind::Identifier => "identifier",
        }
    }
}

// Shorthand constructors keep the table below readable.
fn t(kind: TokenKind) -> GrammarSymbol {
    GrammarSymbol::Terminal(kind)
}

fn one(set: &'static [TokenKind]) -> GrammarSymbol {
    GrammarSymbol::OneOf(set)
}

fn n(name: &'static str) -> GrammarSymbol {
    GrammarSymbol::Nonterminal(name)
}

fn opt(symbol: GrammarSymbol) -> GrammarSymbol {
    GrammarSymbol::Optional(Box::new(symbol))
}

fn build_pointcut_language() -> Grammar {
    use TokenKind::*;

    let rules = vec![
        GrammarRule {
            name: RULE_ROOT,
            alternatives: vec![
                vec![n(RULE_POINTCUT)],
                vec![t(GroupOpen), n(RULE_POINTCUT), t(GroupClose)],
            ],
        },
        GrammarRule {
            name: RULE_POINTCUT,
            alternatives: vec![
                vec![n(RULE_METHOD_EXECUTION)],
                vec![n(RULE_PROPERTY_ACCESS)],
                vec![n(RULE_ANNOTATED)],
                vec![n(RULE_INITIALIZATION)],
                vec![n(RULE_STATIC_INITIALIZATION)],
                vec![n(RULE_NAMED_REFERENCE)],
                vec![n(RULE_COMPLEX)],
            ],
        },
        GrammarRule {
            name: RULE_METHOD_EXECUTION,
            alternatives: vec![vec![
                t(PointcutOpen),
                one(MODIFIER),
                one(TYPE_PATTERN),
                opt(t(Plus)),
                one(MEMBER_OP),
                one(NAME_PATTERN),
                t(MethodParens),
                t(PointcutClose),
            ]],
        },
        GrammarRule {
            name: RULE_PROPERTY_ACCESS,
            alternatives: vec![vec![
                t(PointcutOpen),
                one(ACCESS_OP),
                one(MODIFIER),
                one(TYPE_PATTERN),
                opt(t(Plus)),
                one(MEMBER_OP),
                one(NAME_PATTERN),
                t(PointcutClose),
            ]],
        },
        GrammarRule {
            name: RULE_ANNOTATED,
            alternatives: vec![
                vec![
                    t(PointcutOpen),
                    t(Method),
                    t(At),
                    one(ANNOTATION_PATTERN),
                    t(PointcutClose),
                ],
                vec![
                    t(PointcutOpen),
                    t(Property),
                    one(ACCESS_OP),
                    t(At),
                    one(ANNOTATION_PATTERN),
                    t(PointcutClose),
                ],
            ],
        },
        GrammarRule {
            name: RULE_INITIALIZATION,
            alternatives: vec![vec![
                t(PointcutOpen),
                t(New),
                one(TYPE_PATTERN),
                opt(t(Plus)),
                t(PointcutClose),
            ]],
        },
        GrammarRule {
            name: RULE_STATIC_INITIALIZATION,
            alternatives: vec![vec![
                t(PointcutOpen),
                t(Static),
                one(TYPE_PATTERN),
                opt(t(Plus)),
                t(PointcutClose),
            ]],
        },
        GrammarRule {
            name: RULE_NAMED_REFERENCE,
            alternatives: vec![vec![t(Identifier)]],
        },
        GrammarRule {
            name: RULE_COMPLEX,
            alternatives: vec![
                vec![n(RULE_NEGATION)],
                vec![n(RULE_CONJUNCTION)],
                vec![n(RULE_DISJUNCTION)],
            ],
        },
        GrammarRule {
            name: RULE_NEGATION,
            alternatives: vec![vec![t(Not), n(RULE_ROOT)]],
        },
        GrammarRule {
            name: RULE_CONJUNCTION,
            alternatives: vec![vec![n(RULE_ROOT), t(And), n(RULE_ROOT)]],
        },
        GrammarRule {
            name: RULE_DISJUNCTION,
            alternatives: vec![vec![n(RULE_ROOT), t(Or), n(RULE_ROOT)]],
        },
    ];

    let index = rules
        .iter()
        .enumerate()
        .map(|(i, r)| (r.name, i))
        .collect();

    let grammar = Grammar {
        rules,
        index,
        root: RULE_ROOT,
    };
    debug_assert!(grammar.validate().is_ok());
    grammar
}

#[cfg(test)]
mod grammar_tests {
    use super::*;

    #[test]
    fn table_invariants_hold() {
        let grammar = Grammar::pointcut_language();
        grammar.validate().expect("grammar must be well-formed");
        assert_eq!(grammar.root_rule(), RULE_ROOT);
    }

    #[test]
    fn every_primitive_rule_starts_with_the_pointcut_delimiter() {
        let grammar = Grammar::pointcut_language();
        for name in [
            RULE_METHOD_EXECUTION,
            RULE_PROPERTY_ACCESS,
            RULE_ANNOTATED,
            RULE_INITIALIZATION,
            RULE_STATIC_INITIALIZATION,
        ] {
            let rule = grammar.rule(name).expect("rule defined");
            for alt in &rule.alternatives {
                assert!(matches!(
                    alt.first(),
                    Some(GrammarSymbol::Terminal(TokenKind::PointcutOpen))
                ));
            }
        }
    }

    #[test]
    fn undefined_reference_fails_validation() {
        let grammar = Grammar {
            rules: vec![GrammarRule {
                name: "root",
                alternatives: vec![vec![GrammarSymbol::Nonterminal("missing")]],
            }],
            index: [("root", 0)].into_iter().collect(),
            root: "root",
        };
        assert!(grammar.validate().is_err());
    }
}
