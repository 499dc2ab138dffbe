//! Syntax module for the braid pointcut language.
//!
//! Provides the token model shared by the lexer, the declarative grammar
//! table, and the parser, plus source-span tracking for diagnostics.

use serde::{Deserialize, Serialize};

pub mod grammar;
pub mod lexer;
pub mod parser;

pub use grammar::{Grammar, GrammarRule, GrammarSymbol};
pub use lexer::{significant, Lexer};
pub use parser::{parse_expression, Parser};

/// Represents a span in the source text of a pointcut expression.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Wrapper for carrying source span information with any value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

/// Closed token classification for the pointcut language.
///
/// Lexemes live on [`Token`]; every variant here is payload-free so the
/// grammar table can refer to kinds as plain data.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Whitespace,
    /// `{` opening a primitive pointcut form.
    PointcutOpen,
    /// `}` closing a primitive pointcut form.
    PointcutClose,
    /// `(` grouping a sub-expression.
    GroupOpen,
    /// `)` closing a group.
    GroupClose,
    /// `()` marking a method-execution pointcut.
    MethodParens,
    /// `::` static member access.
    StaticAccess,
    /// `->` instance member access.
    InstanceAccess,
    Not,
    And,
    Or,
    /// `+` subtype-inclusion suffix on a type pattern.
    Plus,
    /// `@` annotation marker.
    At,
    /// A lone `*` wildcard.
    Star,
    /// A lone `**` cross-namespace wildcard.
    DoubleStar,
    Public,
    Protected,
    Private,
    Read,
    Write,
    Method,
    Property,
    Static,
    New,
    /// A word containing a namespace separator, e.g. `App\Model\*`.
    NamespacePattern,
    /// A word mixing identifier characters and wildcards, e.g. `*s`.
    NamePattern,
    /// A plain word: a type name, member name, or pointcut reference.
    Identifier,
}

impl TokenKind {
    /// True for tokens the parser consumes; whitespace is filtered out.
    pub fn is_significant(self) -> bool {
        self != TokenKind::Whitespace
    }
}

/// A classified lexeme produced by the lexer. Tokens are emitted
/// left-to-right and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }
}
