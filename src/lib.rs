pub use crate::errors::{BraidError, ErrorContext, ErrorType};
pub use crate::syntax::{Span, Spanned};

pub mod aspect;
pub mod engine;
pub mod errors;
pub mod pointcut;
pub mod syntax;
pub mod weaver;
