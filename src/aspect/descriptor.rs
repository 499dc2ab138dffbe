//! The descriptor seam between the engine and host aspect types.
//!
//! The engine never reflects over host objects directly; it talks to a
//! [`AspectDescriptor`], which lists the aspect's members and routes
//! invocations into them. Advice receives an [`AdviceContext`] carrying
//! the join point it fired on and, for `around` advice, a one-shot
//! `proceed` continuation standing in for the original call.

use crate::errors::{self, BraidError};
use crate::weaver::JoinPoint;

use super::AspectMember;

/// The values flowing across the descriptor boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

type ProceedFn<'a> = Box<dyn FnOnce() -> Result<Value, BraidError> + 'a>;

/// Per-invocation context handed to an advice member.
///
/// `proceed` is present only for `around` advice and may be taken at most
/// once; not taking it suppresses the original call and any inner advice.
pub struct AdviceContext<'a> {
    join_point: Option<&'a JoinPoint>,
    proceed: Option<ProceedFn<'a>>,
}

impl<'a> AdviceContext<'a> {
    /// A context with no join point, used when a member is invoked outside
    /// any interception (pointcut declaration members, for instance).
    pub fn detached() -> Self {
        Self {
            join_point: None,
            proceed: None,
        }
    }

    /// A context for before/after advice at the given join point.
    pub fn at(join_point: &'a JoinPoint) -> Self {
        Self {
            join_point: Some(join_point),
            proceed: None,
        }
    }

    pub(crate) fn with_proceed(join_point: &'a JoinPoint, proceed: ProceedFn<'a>) -> Self {
        Self {
            join_point: Some(join_point),
            proceed: Some(proceed),
        }
    }

    pub fn join_point(&self) -> Option<&JoinPoint> {
        self.join_point
    }

    pub fn can_proceed(&self) -> bool {
        self.proceed.is_some()
    }

    /// Run the rest of the advice chain and the original call.
    pub fn proceed(&mut self) -> Result<Value, BraidError> {
        match self.proceed.take() {
            Some(run) => run(),
            None => Err(errors::invocation_error(
                "proceed is only available once, inside around advice",
                None,
            )),
        }
    }
}

impl std::fmt::Debug for AdviceContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdviceContext")
            .field("join_point", &self.join_point)
            .field("can_proceed", &self.proceed.is_some())
            .finish()
    }
}

/// Host-side view of one aspect type.
pub trait AspectDescriptor: Send + Sync {
    /// All members of the aspect type, in declaration order.
    fn members(&self) -> Vec<AspectMember>;

    /// Invoke the named member. The engine calls this for pointcut
    /// declaration members (expecting a [`Value::Text`] expression) and for
    /// advice members during dispatch.
    fn invoke(&self, member: &str, ctx: &mut AdviceContext<'_>) -> Result<Value, BraidError>;
}

impl std::fmt::Debug for dyn AspectDescriptor + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AspectDescriptor").finish_non_exhaustive()
    }
}
