//! Dispatch-time and load-time weaving behavior.

mod common;

use braid::aspect::Value;
use braid::engine::EngineContext;
use braid::errors;
use braid::weaver::{
    JoinPoint, MarkerRewriter, SourceUnit, SuffixEligibility, WeaveOutcome, WOVEN_MARKER,
};
use braid::BraidError;

use common::{entries, new_trace, record, MemberBehavior, RecordingAspect, Trace};

fn engine_with(
    aspects: &[(&str, &[(&str, MemberBehavior)])],
    trace: &Trace,
) -> EngineContext {
    let mut ctx = EngineContext::new();
    for (id, members) in aspects {
        let aspect = RecordingAspect::new(members, trace);
        ctx.register_aspect(*id, move || Box::new(aspect.clone()))
            .unwrap();
    }
    ctx
}

fn run_jp() -> JoinPoint {
    JoinPoint::method_execution("Service", "run")
}

#[test]
fn before_advice_fires_in_declaration_order() {
    let trace = new_trace();
    let ctx = engine_with(
        &[(
            "Logging",
            &[
                ("pointcut_entry", MemberBehavior::Expression("{public Service->run()}")),
                ("before_entry_first", MemberBehavior::Record),
                ("before_entry_second", MemberBehavior::Record),
            ],
        )],
        &trace,
    );

    let result = ctx
        .weaver()
        .dispatch(&run_jp(), || {
            record(&trace, "original");
            Ok(Value::Unit)
        })
        .unwrap();

    assert_eq!(result, Value::Unit);
    assert_eq!(
        entries(&trace),
        vec!["before_entry_first", "before_entry_second", "original"]
    );
}

#[test]
fn aspects_contribute_in_registration_order() {
    let trace = new_trace();
    let ctx = engine_with(
        &[
            (
                "Second",
                &[
                    ("pointcut_entry", MemberBehavior::Expression("{public Service->run()}")),
                    ("before_entry_b", MemberBehavior::Record),
                ],
            ),
            (
                "First",
                &[
                    ("pointcut_entry", MemberBehavior::Expression("{public Service->run()}")),
                    ("before_entry_a", MemberBehavior::Record),
                ],
            ),
        ],
        &trace,
    );

    ctx.weaver()
        .dispatch(&run_jp(), || Ok(Value::Unit))
        .unwrap();

    // "Second" was registered first, so its advice fires first.
    assert_eq!(entries(&trace), vec!["before_entry_b", "before_entry_a"]);
}

#[test]
fn around_advice_nests_outside_in() {
    let trace = new_trace();
    let ctx = engine_with(
        &[(
            "Timing",
            &[
                ("pointcut_entry", MemberBehavior::Expression("{public Service->run()}")),
                ("around_entry_outer", MemberBehavior::ProceedThrough),
                ("around_entry_inner", MemberBehavior::ProceedThrough),
            ],
        )],
        &trace,
    );

    let result = ctx
        .weaver()
        .dispatch(&run_jp(), || {
            record(&trace, "original");
            Ok(Value::Text("done".into()))
        })
        .unwrap();

    assert_eq!(result, Value::Text("done".into()));
    assert_eq!(
        entries(&trace),
        vec![
            "around_entry_outer:start",
            "around_entry_inner:start",
            "original",
            "around_entry_inner:end",
            "around_entry_outer:end",
        ]
    );
}

#[test]
fn around_that_never_proceeds_suppresses_the_rest() {
    let trace = new_trace();
    let ctx = engine_with(
        &[(
            "Gate",
            &[
                ("pointcut_entry", MemberBehavior::Expression("{public Service->run()}")),
                ("around_entry_gate", MemberBehavior::Suppress),
                ("around_entry_inner", MemberBehavior::ProceedThrough),
                ("after_entry_done", MemberBehavior::Record),
            ],
        )],
        &trace,
    );

    let result = ctx
        .weaver()
        .dispatch(&run_jp(), || {
            record(&trace, "original");
            Ok(Value::Unit)
        })
        .unwrap();

    // The gate's return value replaces the original's; the inner around
    // and the original call never ran, but after advice still did.
    assert_eq!(result, Value::Text("suppressed".into()));
    assert_eq!(entries(&trace), vec!["around_entry_gate", "after_entry_done"]);
}

#[test]
fn after_advice_runs_when_the_original_fails() {
    let trace = new_trace();
    let ctx = engine_with(
        &[(
            "Cleanup",
            &[
                ("pointcut_entry", MemberBehavior::Expression("{public Service->run()}")),
                ("after_entry_release", MemberBehavior::Record),
            ],
        )],
        &trace,
    );

    let err = ctx
        .weaver()
        .dispatch(&run_jp(), || {
            record(&trace, "original");
            Err(errors::invocation_error("boom", None))
        })
        .unwrap_err();

    let BraidError::Invocation { message, .. } = &err else {
        panic!("expected the original error back, got {err:?}");
    };
    assert_eq!(message, "boom");
    assert_eq!(entries(&trace), vec!["original", "after_entry_release"]);
}

#[test]
fn failing_before_advice_skips_the_original_but_not_after() {
    let trace = new_trace();
    let ctx = engine_with(
        &[(
            "Guard",
            &[
                ("pointcut_entry", MemberBehavior::Expression("{public Service->run()}")),
                ("before_entry_check", MemberBehavior::Fail("denied")),
                ("around_entry_wrap", MemberBehavior::ProceedThrough),
                ("after_entry_release", MemberBehavior::Record),
            ],
        )],
        &trace,
    );

    let err = ctx
        .weaver()
        .dispatch(&run_jp(), || {
            record(&trace, "original");
            Ok(Value::Unit)
        })
        .unwrap_err();

    let BraidError::Invocation { message, .. } = &err else {
        panic!("expected the before failure back, got {err:?}");
    };
    assert_eq!(message, "denied");
    assert_eq!(entries(&trace), vec!["before_entry_check", "after_entry_release"]);
}

#[test]
fn failing_after_advice_does_not_mask_an_earlier_error() {
    let trace = new_trace();
    let ctx = engine_with(
        &[(
            "Messy",
            &[
                ("pointcut_entry", MemberBehavior::Expression("{public Service->run()}")),
                ("after_entry_broken", MemberBehavior::Fail("after failed")),
            ],
        )],
        &trace,
    );

    let err = ctx
        .weaver()
        .dispatch(&run_jp(), || Err(errors::invocation_error("boom", None)))
        .unwrap_err();
    let BraidError::Invocation { message, .. } = &err else {
        panic!("expected invocation error");
    };
    assert_eq!(message, "boom");

    // With a clean main path, the after failure itself propagates.
    let err = ctx
        .weaver()
        .dispatch(&run_jp(), || Ok(Value::Unit))
        .unwrap_err();
    let BraidError::Invocation { message, .. } = &err else {
        panic!("expected invocation error");
    };
    assert_eq!(message, "after failed");
}

#[test]
fn unmatched_join_points_run_the_original_untouched() {
    let trace = new_trace();
    let ctx = engine_with(
        &[(
            "Logging",
            &[
                ("pointcut_entry", MemberBehavior::Expression("{public Service->run()}")),
                ("before_entry_log", MemberBehavior::Record),
            ],
        )],
        &trace,
    );

    let jp = JoinPoint::method_execution("Unrelated", "run");
    let plan = ctx.weaver().plan(&jp).unwrap();
    assert!(plan.is_empty());

    ctx.weaver()
        .dispatch(&jp, || {
            record(&trace, "original");
            Ok(Value::Unit)
        })
        .unwrap();
    assert_eq!(entries(&trace), vec!["original"]);
}

// ---------------------------------------------------------------------------
// Load-time weaving
// ---------------------------------------------------------------------------

fn service_unit() -> SourceUnit {
    SourceUnit {
        id: "Service".to_string(),
        path: "app/Service.src".to_string(),
        text: "class Service { run() {} idle() {} }".to_string(),
        members: vec![
            JoinPoint::method_execution("Service", "run"),
            JoinPoint::method_execution("Service", "idle"),
        ],
    }
}

#[test]
fn matched_units_are_rewritten_and_stamped() {
    let trace = new_trace();
    let ctx = engine_with(
        &[(
            "Logging",
            &[
                ("pointcut_entry", MemberBehavior::Expression("{public Service->run()}")),
                ("before_entry_log", MemberBehavior::Record),
            ],
        )],
        &trace,
    );

    let eligibility = SuffixEligibility::new([".src"]);
    let rewriter = MarkerRewriter;
    let weaver = ctx.load_time_weaver(&eligibility, &rewriter);

    let unit = service_unit();
    let WeaveOutcome::Woven(text) = weaver.weave_unit(&unit).unwrap() else {
        panic!("expected the unit to be woven");
    };
    assert!(text.starts_with(WOVEN_MARKER));
    assert!(text.contains("Service::run"));
    assert!(!text.contains("Service::idle"));
    assert!(text.ends_with(&unit.text));
}

#[test]
fn weaving_is_idempotent() {
    let trace = new_trace();
    let ctx = engine_with(
        &[(
            "Logging",
            &[
                ("pointcut_entry", MemberBehavior::Expression("{public Service->run()}")),
                ("before_entry_log", MemberBehavior::Record),
            ],
        )],
        &trace,
    );

    let eligibility = SuffixEligibility::new([".src"]);
    let rewriter = MarkerRewriter;
    let weaver = ctx.load_time_weaver(&eligibility, &rewriter);

    let unit = service_unit();
    let WeaveOutcome::Woven(text) = weaver.weave_unit(&unit).unwrap() else {
        panic!("expected the unit to be woven");
    };

    let rewoven = SourceUnit {
        text,
        ..service_unit()
    };
    assert_eq!(weaver.weave_unit(&rewoven).unwrap(), WeaveOutcome::Unchanged);
}

#[test]
fn ineligible_paths_and_unmatched_units_pass_through() {
    let trace = new_trace();
    let ctx = engine_with(
        &[(
            "Logging",
            &[
                ("pointcut_entry", MemberBehavior::Expression("{public Service->run()}")),
                ("before_entry_log", MemberBehavior::Record),
            ],
        )],
        &trace,
    );

    let eligibility = SuffixEligibility::new([".src"]);
    let rewriter = MarkerRewriter;
    let weaver = ctx.load_time_weaver(&eligibility, &rewriter);

    assert!(!weaver.should_weave("vendor/lib.bin"));
    let mut unit = service_unit();
    unit.path = "vendor/lib.bin".to_string();
    assert_eq!(weaver.weave_unit(&unit).unwrap(), WeaveOutcome::Unchanged);

    let unmatched = SourceUnit {
        id: "Other".to_string(),
        path: "app/Other.src".to_string(),
        text: "class Other {}".to_string(),
        members: vec![JoinPoint::method_execution("Other", "run")],
    };
    assert_eq!(weaver.weave_unit(&unmatched).unwrap(), WeaveOutcome::Unchanged);
}
