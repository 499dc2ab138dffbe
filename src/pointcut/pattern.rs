//! Wildcard pattern validation and compilation.
//!
//! Namespace and member-name patterns are validated and compiled into
//! anchored regexes exactly once, at build time; the matcher only ever
//! runs the compiled form. Wildcard semantics: `*` matches a run of
//! identifier characters within one namespace segment, `**` matches across
//! segment separators, and everything else matches literally.

use regex::Regex;

use crate::errors::{self, BraidError, SourceArc};
use crate::pointcut::TypePattern;
use crate::syntax::Span;

/// The namespace segment separator.
pub const SEPARATOR: char = '\\';

/// A compiled namespace pattern plus the `+` subtype flag.
#[derive(Debug, Clone)]
pub struct CompiledTypePattern {
    text: String,
    subtypes: bool,
    regex: Regex,
}

impl CompiledTypePattern {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn subtypes(&self) -> bool {
        self.subtypes
    }

    /// Whether `type_name` satisfies the pattern; with the `+` suffix, any
    /// ancestor or implemented interface may satisfy it instead.
    pub fn matches_type(&self, type_name: &str, ancestry: &[String]) -> bool {
        if self.regex.is_match(type_name) {
            return true;
        }
        self.subtypes && ancestry.iter().any(|a| self.regex.is_match(a))
    }
}

/// A compiled member-name or annotation pattern.
#[derive(Debug, Clone)]
pub struct CompiledNamePattern {
    text: String,
    regex: Regex,
}

impl CompiledNamePattern {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

pub fn compile_type_pattern(
    pattern: &TypePattern,
    src: &SourceArc,
    span: Span,
) -> Result<CompiledTypePattern, BraidError> {
    let regex = compile(&pattern.text, src, span)?;
    Ok(CompiledTypePattern {
        text: pattern.text.clone(),
        subtypes: pattern.subtypes,
        regex,
    })
}

pub fn compile_name_pattern(
    text: &str,
    src: &SourceArc,
    span: Span,
) -> Result<CompiledNamePattern, BraidError> {
    let regex = compile(text, src, span)?;
    Ok(CompiledNamePattern {
        text: text.to_string(),
        regex,
    })
}

fn compile(text: &str, src: &SourceArc, span: Span) -> Result<Regex, BraidError> {
    validate(text, src, span)?;
    Regex::new(&translate(text)).map_err(|e| {
        errors::parse_error(format!("pattern `{text}` failed to compile: {e}"), src, span)
    })
}

/// Pattern-validity check, run once at build time.
fn validate(text: &str, src: &SourceArc, span: Span) -> Result<(), BraidError> {
    if text.is_empty() {
        return Err(errors::parse_error("empty pattern", src, span));
    }
    let mut stars = 0usize;
    let mut prev_separator = false;
    for c in text.chars() {
        if c == '*' {
            stars += 1;
            if stars > 2 {
                return Err(errors::parse_error(
                    format!("pattern `{text}` uses more than two consecutive wildcards"),
                    src,
                    span,
                ));
            }
        } else {
            stars = 0;
        }
        if prev_separator && c.is_ascii_digit() {
            return Err(errors::parse_error(
                format!("pattern `{text}` places a digit directly after a namespace separator"),
                src,
                span,
            ));
        }
        prev_separator = c == SEPARATOR;
    }
    Ok(())
}

/// Translate a validated pattern into anchored regex source.
fn translate(text: &str) -> String {
    let mut out = String::from("^");
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str(r"[^\\]*");
                }
            }
            SEPARATOR => out.push_str(r"\\"),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}
