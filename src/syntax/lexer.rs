//! Finite-state lexer for pointcut expressions.
//!
//! Converts a raw expression string into a stream of classified [`Token`]s.
//! Whitespace is tokenized (patterns must not contain embedded whitespace,
//! which maximal-munch word scanning enforces structurally) and filtered
//! out by [`significant`] before the tokens reach the parser.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::errors::{self, BraidError, SourceArc};
use crate::syntax::{Span, Token, TokenKind};

/// Characters that may appear inside a word run: identifier characters,
/// the `*` wildcard, and the `\` namespace separator.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '*' || c == '\\'
}

/// Lexer for the pointcut expression language.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    pos: usize,
    src: SourceArc,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `source`; `src` names the text for diagnostics.
    pub fn new(source: &'a str, src: SourceArc) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            pos: 0,
            src,
        }
    }

    /// Convenience constructor that names the source "pointcut".
    pub fn from_text(source: &'a str) -> Self {
        let src = errors::to_error_source("pointcut", source);
        Self::new(source, src)
    }

    /// Tokenize the entire input, whitespace tokens included.
    pub fn tokenize(mut self) -> Result<Vec<Token>, BraidError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>, BraidError> {
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(None);
        };

        let kind = match c {
            c if c.is_whitespace() => {
                while self.peek_char().is_some_and(char::is_whitespace) {
                    self.advance();
                }
                TokenKind::Whitespace
            }
            '{' => {
                self.advance();
                TokenKind::PointcutOpen
            }
            '}' => {
                self.advance();
                TokenKind::PointcutClose
            }
            '(' => {
                self.advance();
                // `()` lexes as a single method-parentheses marker; an empty
                // group is never legal, so one character of lookahead settles it.
                if self.peek_char() == Some(')') {
                    self.advance();
                    TokenKind::MethodParens
                } else {
                    TokenKind::GroupOpen
                }
            }
            ')' => {
                self.advance();
                TokenKind::GroupClose
            }
            '!' => {
                self.advance();
                TokenKind::Not
            }
            '+' => {
                self.advance();
                TokenKind::Plus
            }
            '@' => {
                self.advance();
                TokenKind::At
            }
            '&' => self.doubled('&', TokenKind::And)?,
            '|' => self.doubled('|', TokenKind::Or)?,
            ':' => self.doubled(':', TokenKind::StaticAccess)?,
            '-' => {
                self.advance();
                if self.peek_char() == Some('>') {
                    self.advance();
                    TokenKind::InstanceAccess
                } else {
                    return Err(self.unrecognized(start, "`-` must be followed by `>`"));
                }
            }
            c if is_word_char(c) => {
                while self.peek_char().is_some_and(is_word_char) {
                    self.advance();
                }
                classify_word(&self.source[start..self.pos])
            }
            c => {
                self.advance();
                return Err(self.unrecognized(start, format!("unrecognized character `{c}`")));
            }
        };

        let span = Span::new(start, self.pos);
        Ok(Some(Token::new(kind, &self.source[start..self.pos], span)))
    }

    /// Consume a character that is only legal when doubled (`&&`, `||`, `::`).
    fn doubled(&mut self, c: char, kind: TokenKind) -> Result<TokenKind, BraidError> {
        let start = self.pos;
        self.advance();
        if self.peek_char() == Some(c) {
            self.advance();
            Ok(kind)
        } else {
            Err(self.unrecognized(start, format!("`{c}` must be doubled as `{c}{c}`")))
        }
    }

    fn unrecognized(&self, start: usize, message: impl Into<String>) -> BraidError {
        errors::lex_error(message, &self.src, Span::new(start, self.pos.max(start + 1)))
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<char> {
        let (i, c) = self.chars.next()?;
        self.pos = i + c.len_utf8();
        Some(c)
    }
}

/// Classify a completed word run. Keywords win over identifiers; wildcard
/// and separator content decides between the pattern kinds.
fn classify_word(lexeme: &str) -> TokenKind {
    match lexeme {
        "public" => TokenKind::Public,
        "protected" => TokenKind::Protected,
        "private" => TokenKind::Private,
        "read" => TokenKind::Read,
        "write" => TokenKind::Write,
        "method" => TokenKind::Method,
        "property" => TokenKind::Property,
        "static" => TokenKind::Static,
        "new" => TokenKind::New,
        "*" => TokenKind::Star,
        "**" => TokenKind::DoubleStar,
        _ if lexeme.contains('\\') => TokenKind::NamespacePattern,
        _ if lexeme.contains('*') => TokenKind::NamePattern,
        _ => TokenKind::Identifier,
    }
}

/// Drop whitespace tokens before handing the stream to the parser.
pub fn significant(tokens: Vec<Token>) -> Vec<Token> {
    tokens
        .into_iter()
        .filter(|t| t.kind.is_significant())
        .collect()
}
