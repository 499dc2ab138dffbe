//! Unified, `miette`-based diagnostics for the braid engine.
//!
//! Every failure mode of the compilation and weaving pipeline is represented
//! by a [`BraidError`] variant carrying an [`ErrorContext`] so that errors
//! render as labeled source diagnostics. Construct errors through the
//! builder functions at the bottom of this module rather than via struct
//! literals.

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

use crate::syntax::Span;

/// Shared handle to a named source text used in diagnostics.
pub type SourceArc = Arc<NamedSource<String>>;

/// Type-safe error classification corresponding to [`BraidError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Unrecognized character sequence in a pointcut expression.
    Lex,
    /// Structural grammar violation or unresolved pointcut reference.
    Parse,
    /// An aspect declaring no pointcut/advice pairing.
    PointlessAspect,
    /// A delimiter-shaped member name that fits no known advice kind.
    UnknownAdviceKind,
    /// An error propagated unchanged from advice execution.
    Invocation,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Lex => "Lex",
            ErrorType::Parse => "Parse",
            ErrorType::PointlessAspect => "PointlessAspect",
            ErrorType::UnknownAdviceKind => "UnknownAdviceKind",
            ErrorType::Invocation => "Invocation",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The primary source for this error (if any).
    pub source: Option<SourceArc>,
    /// The primary span for this error (if any).
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
}

impl ErrorContext {
    /// Returns an empty error context (no source, span, or help).
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            help: None,
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Unified error type for all braid engine failure modes.
#[derive(Debug, Error)]
pub enum BraidError {
    #[error("Lex error: {message}")]
    Lex { message: String, ctx: ErrorContext },

    #[error("Parse error: {message}")]
    Parse { message: String, ctx: ErrorContext },

    #[error("Pointless aspect `{aspect}`: it pairs no pointcut with any advice")]
    PointlessAspect { aspect: String, ctx: ErrorContext },

    #[error("Member `{member}` fits the delimiter shape but names no known advice kind")]
    UnknownAdviceKind { member: String, ctx: ErrorContext },

    #[error("Invocation error: {message}")]
    Invocation {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },
}

impl BraidError {
    fn get_ctx(&self) -> &ErrorContext {
        match self {
            BraidError::Lex { ctx, .. } => ctx,
            BraidError::Parse { ctx, .. } => ctx,
            BraidError::PointlessAspect { ctx, .. } => ctx,
            BraidError::UnknownAdviceKind { ctx, .. } => ctx,
            BraidError::Invocation { ctx, .. } => ctx,
        }
    }

    /// Returns the type-safe classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            BraidError::Lex { .. } => ErrorType::Lex,
            BraidError::Parse { .. } => ErrorType::Parse,
            BraidError::PointlessAspect { .. } => ErrorType::PointlessAspect,
            BraidError::UnknownAdviceKind { .. } => ErrorType::UnknownAdviceKind,
            BraidError::Invocation { .. } => ErrorType::Invocation,
        }
    }
}

impl Diagnostic for BraidError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        None
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.get_ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.get_ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.get_ctx();
        let span = ctx.span?;
        let len = if span.end > span.start {
            span.end - span.start
        } else {
            1
        };
        let text = match self {
            BraidError::Lex { message, .. } => message.clone(),
            BraidError::Parse { message, .. } => message.clone(),
            BraidError::PointlessAspect { aspect, .. } => {
                format!("aspect `{aspect}` is pointless")
            }
            BraidError::UnknownAdviceKind { member, .. } => {
                format!("member `{member}` was skipped")
            }
            BraidError::Invocation { message, .. } => message.clone(),
        };
        Some(Box::new(std::iter::once(LabeledSpan::new(
            Some(text),
            span.start,
            len,
        ))))
    }
}

// ============================================================================
// BUILDERS - the only sanctioned way to construct BraidError values
// ============================================================================

/// Wraps a source string into an `Arc<NamedSource<String>>` for diagnostics.
pub fn to_error_source(name: impl AsRef<str>, content: impl AsRef<str>) -> SourceArc {
    Arc::new(NamedSource::new(
        name.as_ref().to_string(),
        content.as_ref().to_string(),
    ))
}

pub fn lex_error(message: impl Into<String>, src: &SourceArc, span: Span) -> BraidError {
    BraidError::Lex {
        message: message.into(),
        ctx: ErrorContext::with_source_and_span(Arc::clone(src), span),
    }
}

pub fn parse_error(message: impl Into<String>, src: &SourceArc, span: Span) -> BraidError {
    BraidError::Parse {
        message: message.into(),
        ctx: ErrorContext::with_source_and_span(Arc::clone(src), span),
    }
}

pub fn parse_error_with_help(
    message: impl Into<String>,
    src: &SourceArc,
    span: Span,
    help: impl Into<String>,
) -> BraidError {
    BraidError::Parse {
        message: message.into(),
        ctx: ErrorContext::with_source_and_span(Arc::clone(src), span).help(help),
    }
}

pub fn pointless_aspect(aspect: impl Into<String>) -> BraidError {
    BraidError::PointlessAspect {
        aspect: aspect.into(),
        ctx: ErrorContext::none().help(
            "declare at least one `pointcut_*` member and bind at least one \
             `before_*`/`after_*`/`around_*` member to it",
        ),
    }
}

pub fn unknown_advice_kind(member: impl Into<String>) -> BraidError {
    BraidError::UnknownAdviceKind {
        member: member.into(),
        ctx: ErrorContext::none(),
    }
}

pub fn invocation_error(
    message: impl Into<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> BraidError {
    BraidError::Invocation {
        message: message.into(),
        ctx: ErrorContext::none(),
        source,
    }
}

#[cfg(test)]
mod errors_tests {
    use super::*;
    use miette::Report;

    #[test]
    fn lex_error_renders_label_and_position() {
        let src = to_error_source("pointcut", "{public Foo->bar()}");
        let err = lex_error("unexpected character", &src, Span::new(8, 11));
        assert_eq!(err.error_type(), ErrorType::Lex);
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("unexpected character"));
    }

    #[test]
    fn pointless_aspect_carries_help() {
        let err = pointless_aspect("LoggingAspect");
        assert_eq!(err.error_type(), ErrorType::PointlessAspect);
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("LoggingAspect"));
        assert!(output.contains("pointcut_"));
    }

    #[test]
    fn invocation_error_chains_cause() {
        let cause = invocation_error("advice body failed", None);
        let err = invocation_error("before advice raised", Some(Box::new(cause)));
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("before advice raised"));
        assert!(output.contains("advice body failed"));
    }
}
