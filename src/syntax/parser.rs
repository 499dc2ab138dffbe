//! Parser for pointcut expressions.
//!
//! Consumes significant tokens with one token of lookahead. Braced
//! primitive forms are matched directly against the grammar table's
//! alternatives (backtracking between alternatives, reporting the furthest
//! failure); the boolean composition (`!`, `&&`, `||`, grouping, named
//! references) is folded on an explicit operator/operand stack during
//! reduction, so the declared binding order (`!` over `&&` over `||`,
//! left-associative) falls out of "last reduce wins" rather than a
//! separate precedence-climbing pass.

use crate::errors::{self, BraidError, SourceArc};
use crate::pointcut::{
    AccessOp, AnnotatedTarget, MemberScope, PointcutExpr, TypePattern, Visibility,
};
use crate::syntax::grammar::{self, Grammar, GrammarSymbol};
use crate::syntax::{significant, Lexer, Span, Spanned, Token, TokenKind};

/// Lex and parse a single pointcut expression.
pub fn parse_expression(
    grammar: &Grammar,
    text: &str,
) -> Result<Spanned<PointcutExpr>, BraidError> {
    let src = errors::to_error_source("pointcut", text);
    let tokens = Lexer::new(text, src.clone()).tokenize()?;
    Parser::new(grammar, tokens, src).parse()
}

/// Partial derivation entry: an operator waiting for its operands.
enum OpEntry {
    Not(Span),
    And(Span),
    Or(Span),
    /// `(` marker; reduction never crosses it until the matching `)`.
    Group(Span),
}

impl OpEntry {
    fn precedence(&self) -> u8 {
        match self {
            OpEntry::Not(_) => 3,
            OpEntry::And(_) => 2,
            OpEntry::Or(_) => 1,
            OpEntry::Group(_) => 0,
        }
    }
}

pub struct Parser<'g> {
    grammar: &'g Grammar,
    tokens: Vec<Token>,
    pos: usize,
    src: SourceArc,
}

impl<'g> Parser<'g> {
    /// Whitespace tokens are filtered out here; callers may pass the raw
    /// lexer output.
    pub fn new(grammar: &'g Grammar, tokens: Vec<Token>, src: SourceArc) -> Self {
        Self {
            grammar,
            tokens: significant(tokens),
            pos: 0,
            src,
        }
    }

    /// Parse the token stream as one complete pointcut expression.
    pub fn parse(&mut self) -> Result<Spanned<PointcutExpr>, BraidError> {
        let mut operands: Vec<Spanned<PointcutExpr>> = Vec::new();
        let mut ops: Vec<OpEntry> = Vec::new();
        let mut expect_operand = true;

        while let Some(token) = self.tokens.get(self.pos).cloned() {
            match token.kind {
                TokenKind::Not if expect_operand => {
                    self.pos += 1;
                    ops.push(OpEntry::Not(token.span));
                }
                TokenKind::GroupOpen if expect_operand => {
                    self.pos += 1;
                    ops.push(OpEntry::Group(token.span));
                }
                TokenKind::PointcutOpen if expect_operand => {
                    operands.push(self.parse_primitive()?);
                    expect_operand = false;
                }
                TokenKind::Identifier if expect_operand => {
                    self.pos += 1;
                    operands.push(Spanned::new(
                        PointcutExpr::Named(token.lexeme.clone()),
                        token.span,
                    ));
                    expect_operand = false;
                }
                TokenKind::And | TokenKind::Or if !expect_operand => {
                    self.pos += 1;
                    let (entry, prec) = if token.kind == TokenKind::And {
                        (OpEntry::And(token.span), 2)
                    } else {
                        (OpEntry::Or(token.span), 1)
                    };
                    // Left associativity: equal precedence reduces first.
                    while ops.last().is_some_and(|op| op.precedence() >= prec) {
                        let op = ops.pop().ok_or_else(|| self.incomplete())?;
                        Self::reduce(op, &mut operands, &self.src)?;
                    }
                    ops.push(entry);
                    expect_operand = true;
                }
                TokenKind::GroupClose if !expect_operand => {
                    self.pos += 1;
                    loop {
                        match ops.pop() {
                            Some(OpEntry::Group(open)) => {
                                let inner = operands.pop().ok_or_else(|| self.incomplete())?;
                                let span = open.merge(token.span);
                                operands.push(Spanned::new(
                                    PointcutExpr::Group(Box::new(inner)),
                                    span,
                                ));
                                break;
                            }
                            Some(op) => Self::reduce(op, &mut operands, &self.src)?,
                            None => {
                                return Err(errors::parse_error(
                                    "unmatched `)`",
                                    &self.src,
                                    token.span,
                                ))
                            }
                        }
                    }
                }
                _ => return Err(self.unexpected(&token, expect_operand)),
            }
        }

        if expect_operand {
            return Err(errors::parse_error_with_help(
                "unexpected end of input",
                &self.src,
                self.end_span(),
                "expected `{`, `(`, `!`, or a pointcut name",
            ));
        }
        while let Some(op) = ops.pop() {
            if let OpEntry::Group(open) = op {
                return Err(errors::parse_error("unclosed `(`", &self.src, open));
            }
            Self::reduce(op, &mut operands, &self.src)?;
        }
        match (operands.pop(), operands.is_empty()) {
            (Some(expr), true) => Ok(expr),
            _ => Err(self.incomplete()),
        }
    }

    /// Pop the operands an operator needs and push the folded node.
    fn reduce(
        op: OpEntry,
        operands: &mut Vec<Spanned<PointcutExpr>>,
        src: &SourceArc,
    ) -> Result<(), BraidError> {
        let missing =
            || errors::parse_error("incomplete pointcut expression", src, Span::default());
        match op {
            OpEntry::Not(span) => {
                let operand = operands.pop().ok_or_else(missing)?;
                let full = span.merge(operand.span);
                operands.push(Spanned::new(PointcutExpr::Not(Box::new(operand)), full));
            }
            OpEntry::And(_) => {
                let rhs = operands.pop().ok_or_else(missing)?;
                let lhs = operands.pop().ok_or_else(missing)?;
                let full = lhs.span.merge(rhs.span);
                operands.push(Spanned::new(
                    PointcutExpr::And(Box::new(lhs), Box::new(rhs)),
                    full,
                ));
            }
            OpEntry::Or(_) => {
                let rhs = operands.pop().ok_or_else(missing)?;
                let lhs = operands.pop().ok_or_else(missing)?;
                let full = lhs.span.merge(rhs.span);
                operands.push(Spanned::new(
                    PointcutExpr::Or(Box::new(lhs), Box::new(rhs)),
                    full,
                ));
            }
            OpEntry::Group(span) => {
                return Err(errors::parse_error("unclosed `(`", src, span));
            }
        }
        Ok(())
    }

    // ========================================================================
    // PRIMITIVE FORMS - matched against the grammar table
    // ========================================================================

    /// Parse one braced primitive pointcut starting at the current `{`.
    ///
    /// Tries, in declaration order, every grammar alternative that opens
    /// with the pointcut delimiter; on total failure reports the furthest
    /// point any alternative reached and what it expected there.
    fn parse_primitive(&mut self) -> Result<Spanned<PointcutExpr>, BraidError> {
        let pointcut_rule = self
            .grammar
            .rule(grammar::RULE_POINTCUT)
            .ok_or_else(|| self.missing_rule(grammar::RULE_POINTCUT))?;

        let mut best_offset = 0usize;
        let mut best_expected: Vec<String> = Vec::new();

        for alt in &pointcut_rule.alternatives {
            let [GrammarSymbol::Nonterminal(rule_name)] = alt.as_slice() else {
                continue;
            };
            let Some(rule) = self.grammar.rule(rule_name) else {
                continue;
            };
            for (alt_index, sequence) in rule.alternatives.iter().enumerate() {
                let opens_with_brace = matches!(
                    sequence.first(),
                    Some(GrammarSymbol::Terminal(TokenKind::PointcutOpen))
                );
                if !opens_with_brace {
                    continue;
                }
                match self.try_sequence(sequence) {
                    Ok((captures, consumed)) => {
                        let first = self.span_at(self.pos);
                        let last = self.span_at(self.pos + consumed - 1);
                        let expr = self.shape_primitive(rule.name, alt_index, &captures)?;
                        self.pos += consumed;
                        return Ok(Spanned::new(expr, first.merge(last)));
                    }
                    Err((offset, expected)) => {
                        if offset > best_offset {
                            best_offset = offset;
                            best_expected = vec![expected];
                        } else if offset == best_offset && !best_expected.contains(&expected) {
                            best_expected.push(expected);
                        }
                    }
                }
            }
        }

        let at = self.pos + best_offset;
        let (span, found) = match self.tokens.get(at) {
            Some(token) => (token.span, format!("found `{}`", token.lexeme)),
            None => (self.end_span(), "found end of input".to_string()),
        };
        Err(errors::parse_error_with_help(
            format!("no pointcut form matches: {found}"),
            &self.src,
            span,
            format!("expected {}", best_expected.join(" or ")),
        ))
    }

    /// Match a flat grammar sequence against the tokens at the current
    /// position without consuming. Returns the captured token per symbol
    /// (`None` for skipped optionals) and the number of tokens matched, or
    /// the failure offset plus a display name of what was expected.
    fn try_sequence(
        &self,
        sequence: &[GrammarSymbol],
    ) -> Result<(Vec<Option<Token>>, usize), (usize, String)> {
        let mut captures = Vec::with_capacity(sequence.len());
        let mut offset = 0usize;

        for symbol in sequence {
            let token = self.tokens.get(self.pos + offset);
            match symbol {
                GrammarSymbol::Terminal(kind) => match token {
                    Some(t) if t.kind == *kind => {
                        captures.push(Some(t.clone()));
                        offset += 1;
                    }
                    _ => return Err((offset, Grammar::display_name(*kind).to_string())),
                },
                GrammarSymbol::OneOf(set) => match token {
                    Some(t) if set.contains(&t.kind) => {
                        captures.push(Some(t.clone()));
                        offset += 1;
                    }
                    _ => {
                        let expected = set
                            .iter()
                            .map(|k| Grammar::display_name(*k))
                            .collect::<Vec<_>>()
                            .join(" or ");
                        return Err((offset, expected));
                    }
                },
                GrammarSymbol::Optional(inner) => {
                    let matched = match (inner.as_ref(), token) {
                        (GrammarSymbol::Terminal(kind), Some(t)) => t.kind == *kind,
                        (GrammarSymbol::OneOf(set), Some(t)) => set.contains(&t.kind),
                        _ => false,
                    };
                    if matched {
                        captures.push(token.cloned());
                        offset += 1;
                    } else {
                        captures.push(None);
                    }
                }
                // Primitive rules are flat token sequences.
                GrammarSymbol::Nonterminal(name) => return Err((offset, format!("<{name}>"))),
            }
        }
        Ok((captures, offset))
    }

    /// Build the AST node for a successfully matched primitive sequence.
    fn shape_primitive(
        &self,
        rule: &str,
        alt_index: usize,
        captures: &[Option<Token>],
    ) -> Result<PointcutExpr, BraidError> {
        let take = |i: usize| -> Result<&Token, BraidError> {
            captures
                .get(i)
                .and_then(Option::as_ref)
                .ok_or_else(|| self.incomplete())
        };

        match rule {
            grammar::RULE_METHOD_EXECUTION => Ok(PointcutExpr::MethodExecution {
                visibility: visibility_of(take(1)?.kind),
                class: TypePattern::new(&take(2)?.lexeme, capture_present(captures, 3)),
                scope: scope_of(take(4)?.kind),
                method: take(5)?.lexeme.clone(),
            }),
            grammar::RULE_PROPERTY_ACCESS => Ok(PointcutExpr::PropertyAccess {
                access: access_of(take(1)?.kind),
                visibility: visibility_of(take(2)?.kind),
                class: TypePattern::new(&take(3)?.lexeme, capture_present(captures, 4)),
                scope: scope_of(take(5)?.kind),
                property: take(6)?.lexeme.clone(),
            }),
            grammar::RULE_ANNOTATED if alt_index == 0 => Ok(PointcutExpr::Annotated {
                target: AnnotatedTarget::Method,
                annotation: take(3)?.lexeme.clone(),
            }),
            grammar::RULE_ANNOTATED => Ok(PointcutExpr::Annotated {
                target: AnnotatedTarget::Property(access_of(take(2)?.kind)),
                annotation: take(4)?.lexeme.clone(),
            }),
            grammar::RULE_INITIALIZATION => Ok(PointcutExpr::Initialization {
                class: TypePattern::new(&take(2)?.lexeme, capture_present(captures, 3)),
            }),
            grammar::RULE_STATIC_INITIALIZATION => Ok(PointcutExpr::StaticInitialization {
                class: TypePattern::new(&take(2)?.lexeme, capture_present(captures, 3)),
            }),
            _ => Err(self.missing_rule(rule)),
        }
    }

    // ========================================================================
    // DIAGNOSTIC HELPERS
    // ========================================================================

    fn unexpected(&self, token: &Token, expect_operand: bool) -> BraidError {
        let help = if expect_operand {
            "expected `{`, `(`, `!`, or a pointcut name"
        } else {
            "expected `&&`, `||`, `)`, or end of expression"
        };
        errors::parse_error_with_help(
            format!("unexpected token `{}`", token.lexeme),
            &self.src,
            token.span,
            help,
        )
    }

    fn incomplete(&self) -> BraidError {
        errors::parse_error("incomplete pointcut expression", &self.src, self.end_span())
    }

    fn missing_rule(&self, name: &str) -> BraidError {
        errors::parse_error(
            format!("grammar does not define rule `{name}`"),
            &self.src,
            self.end_span(),
        )
    }

    fn span_at(&self, index: usize) -> Span {
        self.tokens
            .get(index)
            .map(|t| t.span)
            .unwrap_or_else(|| self.end_span())
    }

    fn end_span(&self) -> Span {
        let end = self.tokens.last().map(|t| t.span.end).unwrap_or(0);
        Span::new(end, end)
    }
}

fn capture_present(captures: &[Option<Token>], index: usize) -> bool {
    captures.get(index).is_some_and(Option::is_some)
}

fn visibility_of(kind: TokenKind) -> Visibility {
    match kind {
        TokenKind::Public => Visibility::Public,
        TokenKind::Protected => Visibility::Protected,
        TokenKind::Private => Visibility::Private,
        _ => Visibility::Any,
    }
}

fn access_of(kind: TokenKind) -> AccessOp {
    match kind {
        TokenKind::Read => AccessOp::Read,
        TokenKind::Write => AccessOp::Write,
        _ => AccessOp::Any,
    }
}

fn scope_of(kind: TokenKind) -> MemberScope {
    match kind {
        TokenKind::StaticAccess => MemberScope::Static,
        _ => MemberScope::Instance,
    }
}
