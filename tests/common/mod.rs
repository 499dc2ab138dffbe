//! Shared fixtures: a scriptable aspect descriptor that records every
//! advice invocation into a trace.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use braid::aspect::{AdviceContext, AspectDescriptor, AspectMember, Value};
use braid::errors::{self, BraidError};

pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn new_trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn record(trace: &Trace, entry: impl Into<String>) {
    trace.lock().unwrap().push(entry.into());
}

pub fn entries(trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clone()
}

/// What an aspect member does when invoked.
#[derive(Clone)]
pub enum MemberBehavior {
    /// A `pointcut_*` declaration returning this expression text.
    Expression(&'static str),
    /// Log the member name and return `Unit`.
    Record,
    /// Log the member name, then fail.
    Fail(&'static str),
    /// Around advice that proceeds, logging entry and exit.
    ProceedThrough,
    /// Around advice that never proceeds.
    Suppress,
}

/// An aspect whose members are a (name, behavior) table.
#[derive(Clone)]
pub struct RecordingAspect {
    members: Vec<(String, MemberBehavior)>,
    trace: Trace,
}

impl RecordingAspect {
    pub fn new(members: &[(&str, MemberBehavior)], trace: &Trace) -> Self {
        Self {
            members: members
                .iter()
                .map(|(name, behavior)| (name.to_string(), behavior.clone()))
                .collect(),
            trace: Arc::clone(trace),
        }
    }
}

impl AspectDescriptor for RecordingAspect {
    fn members(&self) -> Vec<AspectMember> {
        self.members
            .iter()
            .map(|(name, _)| AspectMember::method(name.clone()))
            .collect()
    }

    fn invoke(&self, member: &str, ctx: &mut AdviceContext<'_>) -> Result<Value, BraidError> {
        let Some((_, behavior)) = self.members.iter().find(|(name, _)| name == member) else {
            return Err(errors::invocation_error(
                format!("no member `{member}`"),
                None,
            ));
        };
        match behavior {
            MemberBehavior::Expression(text) => Ok(Value::Text((*text).to_string())),
            MemberBehavior::Record => {
                record(&self.trace, member);
                Ok(Value::Unit)
            }
            MemberBehavior::Fail(message) => {
                record(&self.trace, member);
                Err(errors::invocation_error(*message, None))
            }
            MemberBehavior::ProceedThrough => {
                record(&self.trace, format!("{member}:start"));
                let result = ctx.proceed();
                record(&self.trace, format!("{member}:end"));
                result
            }
            MemberBehavior::Suppress => {
                record(&self.trace, member);
                Ok(Value::Text("suppressed".into()))
            }
        }
    }
}
