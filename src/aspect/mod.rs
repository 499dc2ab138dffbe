//! Aspect metadata: advice kinds, member listings, and the extracted
//! pointcut/advice tables.
//!
//! An aspect is any type implementing [`AspectDescriptor`]. The extractor
//! scans its member names for the `_`-delimited naming convention
//! (`pointcut_<name>`, `before_<name>_<suffix>`, ...) and produces an
//! [`AspectMetadata`] pairing compiled pointcuts with the advice members
//! bound to them.

use std::collections::HashMap;

use crate::pointcut::{Pointcut, Visibility};

pub mod descriptor;
pub mod extractor;
pub mod registry;

pub use descriptor::{AdviceContext, AspectDescriptor, Value};
pub use extractor::extract;
pub use registry::AspectRegistry;

/// The delimiter splitting role, pointcut name, and suffix in member names.
pub const DELIMITER: char = '_';

/// The three positions advice can take relative to the original call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdviceKind {
    Before,
    After,
    Around,
}

impl AdviceKind {
    /// Parse the leading segment of a member name, if it names a kind.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "before" => Some(AdviceKind::Before),
            "after" => Some(AdviceKind::After),
            "around" => Some(AdviceKind::Around),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdviceKind::Before => "before",
            AdviceKind::After => "after",
            AdviceKind::Around => "around",
        }
    }
}

/// The kind of member a descriptor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Property,
}

/// One member of an aspect type, as reported by its descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct AspectMember {
    pub name: String,
    pub kind: MemberKind,
    pub visibility: Visibility,
}

impl AspectMember {
    pub fn method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method,
            visibility: Visibility::Public,
        }
    }

    pub fn property(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Property,
            visibility: Visibility::Public,
        }
    }
}

/// Advice members bound to one pointcut, kept in declaration order per kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdviceBindings {
    pub before: Vec<String>,
    pub after: Vec<String>,
    pub around: Vec<String>,
}

impl AdviceBindings {
    pub fn push(&mut self, kind: AdviceKind, member: impl Into<String>) {
        self.of_mut(kind).push(member.into());
    }

    pub fn of(&self, kind: AdviceKind) -> &[String] {
        match kind {
            AdviceKind::Before => &self.before,
            AdviceKind::After => &self.after,
            AdviceKind::Around => &self.around,
        }
    }

    fn of_mut(&mut self, kind: AdviceKind) -> &mut Vec<String> {
        match kind {
            AdviceKind::Before => &mut self.before,
            AdviceKind::After => &mut self.after,
            AdviceKind::Around => &mut self.around,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty() && self.around.is_empty()
    }
}

/// Everything the engine knows about one aspect after extraction.
#[derive(Debug, Clone)]
pub struct AspectMetadata {
    aspect: String,
    pointcuts: Vec<Pointcut>,
    advice: HashMap<String, AdviceBindings>,
}

impl AspectMetadata {
    pub(crate) fn new(
        aspect: String,
        pointcuts: Vec<Pointcut>,
        advice: HashMap<String, AdviceBindings>,
    ) -> Self {
        Self {
            aspect,
            pointcuts,
            advice,
        }
    }

    pub fn aspect(&self) -> &str {
        &self.aspect
    }

    /// Compiled pointcuts in declaration order.
    pub fn pointcuts(&self) -> &[Pointcut] {
        &self.pointcuts
    }

    pub fn pointcut(&self, name: &str) -> Option<&Pointcut> {
        self.pointcuts.iter().find(|p| p.name() == name)
    }

    /// Advice bound to the named pointcut, if any.
    pub fn bindings(&self, pointcut: &str) -> Option<&AdviceBindings> {
        self.advice.get(pointcut)
    }
}
