//! Load-time weaving: rewriting whole source units before execution.
//!
//! Instead of intercepting individual calls, a host can hand compilation
//! units to the [`LoadTimeWeaver`]. Eligible units have each declared
//! member matched against the registered pointcuts; units with at least
//! one match are rewritten by the host's [`SourceRewriter`] and stamped
//! with [`WOVEN_MARKER`] so that re-weaving is a no-op.

use serde::{Deserialize, Serialize};

use crate::errors::BraidError;
use crate::weaver::dispatch::{AdvicePlan, Weaver};
use crate::weaver::JoinPoint;

/// First-line stamp distinguishing woven output from pristine sources.
pub const WOVEN_MARKER: &str = "// braid:woven";

/// Host policy deciding which paths are subject to weaving at all.
pub trait PathEligibility {
    fn is_eligible(&self, path: &str) -> bool;
}

/// Host hook that produces the rewritten text for a matched unit.
///
/// Implementations receive the original unit and the members that matched,
/// each with its advice plan; they own the actual code transformation. The
/// returned text must not already carry [`WOVEN_MARKER`]; the weaver
/// prepends it.
pub trait SourceRewriter {
    fn rewrite(&self, unit: &SourceUnit, matched: &[MatchedMember]) -> String;
}

/// One compilation unit as presented by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Host-assigned identity, typically the declared type name.
    pub id: String,
    pub path: String,
    pub text: String,
    /// Join-point descriptors for every member the unit declares.
    pub members: Vec<JoinPoint>,
}

/// A member of a [`SourceUnit`] that at least one pointcut matched.
#[derive(Debug, Clone)]
pub struct MatchedMember {
    /// Index into [`SourceUnit::members`].
    pub index: usize,
    pub plan: AdvicePlan,
}

/// The result of weaving one unit.
#[derive(Debug, Clone, PartialEq)]
pub enum WeaveOutcome {
    /// Ineligible path, already-woven text, or no matching member.
    Unchanged,
    /// The rewritten text, marker included.
    Woven(String),
}

/// Applies registered aspects to whole source units at load time.
pub struct LoadTimeWeaver<'a> {
    weaver: Weaver<'a>,
    eligibility: &'a dyn PathEligibility,
    rewriter: &'a dyn SourceRewriter,
}

impl<'a> LoadTimeWeaver<'a> {
    pub(crate) fn new(
        weaver: Weaver<'a>,
        eligibility: &'a dyn PathEligibility,
        rewriter: &'a dyn SourceRewriter,
    ) -> Self {
        Self {
            weaver,
            eligibility,
            rewriter,
        }
    }

    /// Whether a path is even a candidate for weaving.
    pub fn should_weave(&self, path: &str) -> bool {
        self.eligibility.is_eligible(path)
    }

    /// Weave one unit. Idempotent: text already starting with the marker
    /// comes back [`WeaveOutcome::Unchanged`].
    pub fn weave_unit(&self, unit: &SourceUnit) -> Result<WeaveOutcome, BraidError> {
        if !self.should_weave(&unit.path) || unit.text.starts_with(WOVEN_MARKER) {
            return Ok(WeaveOutcome::Unchanged);
        }
        let mut matched = Vec::new();
        for (index, member) in unit.members.iter().enumerate() {
            let plan = self.weaver.plan(member)?;
            if !plan.is_empty() {
                matched.push(MatchedMember { index, plan });
            }
        }
        if matched.is_empty() {
            return Ok(WeaveOutcome::Unchanged);
        }
        let rewritten = self.rewriter.rewrite(unit, &matched);
        Ok(WeaveOutcome::Woven(format!("{WOVEN_MARKER}\n{rewritten}")))
    }
}

/// Default rewriter: stamps which members were matched without touching
/// the source body. Useful for dry runs and for hosts that perform the
/// real transformation elsewhere.
#[derive(Debug, Default)]
pub struct MarkerRewriter;

impl SourceRewriter for MarkerRewriter {
    fn rewrite(&self, unit: &SourceUnit, matched: &[MatchedMember]) -> String {
        let mut out = String::new();
        for m in matched {
            if let Some(member) = unit.members.get(m.index) {
                out.push_str(&format!(
                    "// braid:advise {}::{} before={} around={} after={}\n",
                    member.type_name,
                    member.member,
                    m.plan.before.len(),
                    m.plan.around.len(),
                    m.plan.after.len(),
                ));
            }
        }
        out.push_str(&unit.text);
        out
    }
}

/// Eligibility by path suffix, the common host policy.
#[derive(Debug, Clone)]
pub struct SuffixEligibility {
    suffixes: Vec<String>,
}

impl SuffixEligibility {
    pub fn new(suffixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            suffixes: suffixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl PathEligibility for SuffixEligibility {
    fn is_eligible(&self, path: &str) -> bool {
        self.suffixes.iter().any(|s| path.ends_with(s.as_str()))
    }
}
