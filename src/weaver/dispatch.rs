//! Dispatch-time weaving: advice planning and execution around one call.
//!
//! For a given join point the weaver walks every registered aspect in
//! registration order and every matching pointcut in declaration order,
//! building an [`AdvicePlan`]. Execution then runs `before` advice, nests
//! `around` advice outside-in with a one-shot `proceed` chain ending at
//! the original call, and runs `after` advice unconditionally, in the
//! manner of a finally block.

use crate::aspect::{AdviceContext, AdviceKind, Value};
use crate::engine::EngineContext;
use crate::errors::BraidError;
use crate::weaver::JoinPoint;

/// Locates one advice member within a registered aspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdviceRef {
    pub aspect: String,
    pub member: String,
}

/// All advice that applies to one join point, per kind, in firing order.
#[derive(Debug, Clone, Default)]
pub struct AdvicePlan {
    pub before: Vec<AdviceRef>,
    pub around: Vec<AdviceRef>,
    pub after: Vec<AdviceRef>,
}

impl AdvicePlan {
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.around.is_empty() && self.after.is_empty()
    }
}

type Original<'a> = Box<dyn FnOnce() -> Result<Value, BraidError> + 'a>;

/// Evaluates pointcuts and drives advice around intercepted calls.
pub struct Weaver<'ctx> {
    ctx: &'ctx EngineContext,
}

impl<'ctx> Weaver<'ctx> {
    pub(crate) fn new(ctx: &'ctx EngineContext) -> Self {
        Self { ctx }
    }

    /// Collect the advice applying to `join_point`. Aspects contribute in
    /// registration order; within one aspect, pointcut declaration order
    /// and then advice declaration order decide.
    pub fn plan(&self, join_point: &JoinPoint) -> Result<AdvicePlan, BraidError> {
        let mut plan = AdvicePlan::default();
        for id in self.ctx.registry().ids() {
            let (_, metadata) = self.ctx.aspect(id)?;
            for pointcut in metadata.pointcuts() {
                if !pointcut.matches(join_point) {
                    continue;
                }
                let Some(bindings) = metadata.bindings(pointcut.name()) else {
                    continue;
                };
                for kind in [AdviceKind::Before, AdviceKind::Around, AdviceKind::After] {
                    let bucket = match kind {
                        AdviceKind::Before => &mut plan.before,
                        AdviceKind::Around => &mut plan.around,
                        AdviceKind::After => &mut plan.after,
                    };
                    for member in bindings.of(kind) {
                        bucket.push(AdviceRef {
                            aspect: id.to_string(),
                            member: member.clone(),
                        });
                    }
                }
            }
        }
        Ok(plan)
    }

    /// Plan and execute in one step.
    pub fn dispatch<F>(&self, join_point: &JoinPoint, original: F) -> Result<Value, BraidError>
    where
        F: FnOnce() -> Result<Value, BraidError>,
    {
        let plan = self.plan(join_point)?;
        self.run(&plan, join_point, Box::new(original))
    }

    /// Execute a previously computed plan.
    ///
    /// `after` advice always runs, even when a `before` advice, an `around`
    /// advice, or the original call failed; the earlier error is then
    /// re-raised. An error raised by `after` advice itself propagates only
    /// when nothing earlier failed.
    pub fn run<'a>(
        &'a self,
        plan: &'a AdvicePlan,
        join_point: &'a JoinPoint,
        original: Original<'a>,
    ) -> Result<Value, BraidError> {
        let mut pending = self.run_main(plan, join_point, original);
        for advice in &plan.after {
            let result = self.invoke(advice, &mut AdviceContext::at(join_point));
            if pending.is_ok() {
                if let Err(err) = result {
                    pending = Err(err);
                }
            }
        }
        pending
    }

    fn run_main<'a>(
        &'a self,
        plan: &'a AdvicePlan,
        join_point: &'a JoinPoint,
        original: Original<'a>,
    ) -> Result<Value, BraidError> {
        for advice in &plan.before {
            self.invoke(advice, &mut AdviceContext::at(join_point))?;
        }
        self.run_around(&plan.around, join_point, original)
    }

    /// Nest the around chain: the first advice is outermost, and each
    /// `proceed` continues with the rest of the chain. An advice that never
    /// proceeds drops the continuation, original call included.
    fn run_around<'a>(
        &'a self,
        arounds: &'a [AdviceRef],
        join_point: &'a JoinPoint,
        original: Original<'a>,
    ) -> Result<Value, BraidError> {
        let Some((head, rest)) = arounds.split_first() else {
            return original();
        };
        let proceed: Original<'a> = Box::new(move || self.run_around(rest, join_point, original));
        let mut ctx = AdviceContext::with_proceed(join_point, proceed);
        self.invoke(head, &mut ctx)
    }

    fn invoke(
        &self,
        advice: &AdviceRef,
        ctx: &mut AdviceContext<'_>,
    ) -> Result<Value, BraidError> {
        let (instance, _) = self.ctx.aspect(&advice.aspect)?;
        self.ctx.registry().call_advice(instance, &advice.member, ctx)
    }
}
