//! Join points and the weaving protocol.
//!
//! A [`JoinPoint`] describes a runtime event observed by the host's
//! interception hook; the [`Weaver`](dispatch::Weaver) evaluates every
//! registered pointcut against it and drives matched advice around the
//! original call. The load-time variant rewrites whole source units
//! instead of intercepting individual calls.

use serde::{Deserialize, Serialize};

use crate::pointcut::{MemberScope, Visibility};

pub mod dispatch;
pub mod loadtime;

pub use dispatch::{AdvicePlan, AdviceRef, Weaver};
pub use loadtime::{
    LoadTimeWeaver, MarkerRewriter, MatchedMember, PathEligibility, SourceRewriter, SourceUnit,
    SuffixEligibility, WeaveOutcome, WOVEN_MARKER,
};

/// The kinds of runtime event a pointcut can match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinPointKind {
    MethodExecution,
    PropertyRead,
    PropertyWrite,
    Construction,
    StaticInitialization,
}

/// A concrete runtime event, produced by the host's weaving hook.
///
/// `ancestry` lists the fully qualified names of supertypes and
/// implemented interfaces; `scope` records whether the member was reached
/// statically (`::`) or through an instance (`->`). Both are required for
/// the `+` subtype suffix and the member-access operators to be matchable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPoint {
    pub kind: JoinPointKind,
    pub type_name: String,
    pub member: String,
    pub visibility: Visibility,
    pub scope: MemberScope,
    pub ancestry: Vec<String>,
    pub annotations: Vec<String>,
}

impl JoinPoint {
    /// A join point with the given identity and defaulted detail fields
    /// (public, instance scope, no ancestry, no annotations).
    pub fn new(kind: JoinPointKind, type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            kind,
            type_name: type_name.into(),
            member: member.into(),
            visibility: Visibility::Public,
            scope: MemberScope::Instance,
            ancestry: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn method_execution(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self::new(JoinPointKind::MethodExecution, type_name, member)
    }

    pub fn property_read(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self::new(JoinPointKind::PropertyRead, type_name, member)
    }

    pub fn property_write(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self::new(JoinPointKind::PropertyWrite, type_name, member)
    }

    pub fn construction(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self::new(JoinPointKind::Construction, type_name, member)
    }

    pub fn static_initialization(type_name: impl Into<String>) -> Self {
        Self::new(JoinPointKind::StaticInitialization, type_name, "")
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_scope(mut self, scope: MemberScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_ancestry(mut self, ancestry: Vec<String>) -> Self {
        self.ancestry = ancestry;
        self
    }

    pub fn with_annotations(mut self, annotations: Vec<String>) -> Self {
        self.annotations = annotations;
        self
    }
}
