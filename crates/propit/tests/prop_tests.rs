use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use propit::fc::{self, GlobalParameters, Parameters, Predicate, PropertyEngine, ProptestEngine, RunDetails};
use propit::runner::{Suite, TestBody, TestReport, TestStatus};
use propit::{build_test, Arbitraries, EnrichedTest, PropError};
use serde_json::{json, Value};
use test_case::test_case;

fn engine() -> Arc<dyn PropertyEngine> {
    Arc::new(ProptestEngine::with_global(GlobalParameters {
        num_runs: 50,
        seed: Some(42),
        ..GlobalParameters::standard()
    }))
}

fn setup(name: &str) -> (Suite, EnrichedTest) {
    propit::init();
    let suite = Suite::new(name);
    let test = build_test(&suite.test(), engine());
    (suite, test)
}

fn status(report: &TestReport, name: &str) -> TestStatus {
    report.result(name).map(|result| result.status).unwrap()
}

fn sum_is(expected: i64) -> Predicate {
    Predicate::new(move |args: &Value| {
        args[0].as_i64().unwrap_or_default() + args[1].as_i64().unwrap_or_default() == expected
    })
}

fn counted(count: &Arc<AtomicU32>) -> Predicate {
    let count = count.clone();
    Predicate::new(move |_: &Value| {
        count.fetch_add(1, Ordering::SeqCst);
        true
    })
}

#[test]
fn test_tuple_property_passes() {
    let (suite, test) = setup("tuple");
    test.prop([fc::constant(1), fc::constant(2)], None)
        .unwrap()
        .register("sums to three", sum_is(3), None)
        .unwrap();

    let report = suite.run().unwrap();
    assert_eq!(status(&report, "sums to three"), TestStatus::Passed);
}

#[test]
fn test_tuple_property_reports_counterexample() {
    let (suite, test) = setup("tuple");
    test.prop([fc::constant(1), fc::constant(2)], None)
        .unwrap()
        .register("sums to four", sum_is(4), None)
        .unwrap();

    let report = suite.run().unwrap();
    let result = report.result("sums to four").unwrap();
    assert_eq!(result.status, TestStatus::Failed);
    assert_eq!(result.detail.as_ref().unwrap()["counterexample"], json!([1, 2]));
    assert!(result.message.as_deref().unwrap().contains("Counterexample: [1,2]"));
}

#[test]
fn test_record_property_passes() {
    let (suite, test) = setup("record");
    test.prop(Arbitraries::record([("x", fc::constant(5))]), None)
        .unwrap()
        .register(
            "x is positive",
            Predicate::new(|input: &Value| input["x"].as_i64().is_some_and(|x| x > 0)),
            None,
        )
        .unwrap();

    let report = suite.run().unwrap();
    assert_eq!(status(&report, "x is positive"), TestStatus::Passed);
}

#[test]
fn test_record_reporter_sees_record_shapes() {
    let (suite, test) = setup("record");
    let captured: Arc<Mutex<Option<RunDetails>>> = Arc::new(Mutex::new(None));
    let sink = captured.clone();
    let params = Parameters::new()
        .with_examples(vec![json!({"x": 10})])
        .with_reporter(move |details| {
            *sink.lock() = Some(details.clone());
            Ok(())
        });
    let caller_reporter = params.reporter.clone().unwrap();

    test.prop(
        Arbitraries::record([("x", fc::integer(0..=1_000))]),
        Some(params),
    )
    .unwrap()
    .register(
        "x is small",
        Predicate::new(|input: &Value| input["x"].as_i64().unwrap_or_default() < 50),
        None,
    )
    .unwrap();

    let report = suite.run().unwrap();
    // A custom reporter replaces the default failure reporting.
    assert_eq!(status(&report, "x is small"), TestStatus::Passed);

    let details = captured.lock().take().unwrap();
    assert!(details.failed);
    assert_eq!(details.counterexample, Some(json!({"x": 50})));
    assert!(details.failures.iter().all(|failure| failure.get("x").is_some()));
    assert_eq!(details.execution_summary[0].value, json!({"x": 10}));
    assert!(details
        .execution_summary
        .iter()
        .all(|node| node.value.is_object()));
    assert_eq!(details.run_configuration.examples, Some(vec![json!({"x": 10})]));
    assert!(Arc::ptr_eq(
        details.run_configuration.reporter.as_ref().unwrap(),
        &caller_reporter
    ));
}

#[test]
fn test_record_failure_detail_is_unwrapped() {
    let (suite, test) = setup("record");
    let params = Parameters::new().with_examples(vec![json!({"x": 77})]);
    test.prop(Arbitraries::record([("x", fc::integer(0..=10))]), Some(params))
        .unwrap()
        .register(
            "x is below fifty",
            Predicate::new(|input: &Value| input["x"].as_i64().unwrap_or_default() < 50),
            None,
        )
        .unwrap();

    let report = suite.run().unwrap();
    let result = report.result("x is below fifty").unwrap();
    assert_eq!(result.status, TestStatus::Failed);
    assert_eq!(result.detail.as_ref().unwrap()["counterexample"], json!({"x": 77}));
}

#[test]
fn test_malformed_record_example_is_rejected_at_registration() {
    let (suite, test) = setup("record");
    let params = Parameters::new().with_examples(vec![json!([1])]);
    let err = test
        .prop(Arbitraries::record([("x", fc::constant(1))]), Some(params))
        .unwrap()
        .register("never registered", Predicate::new(|_: &Value| true), None)
        .unwrap_err();

    assert!(matches!(err, PropError::MalformedExample(_)));
    assert!(suite.is_empty());
}

#[test]
fn test_only_prop_skips_siblings() {
    let (suite, test) = setup("only");
    let count = Arc::new(AtomicU32::new(0));
    test.call("sibling", TestBody::new(|| Ok(())), None);
    test.only()
        .unwrap()
        .prop([fc::boolean()], None)
        .unwrap()
        .register("focused", counted(&count), None)
        .unwrap();

    let report = suite.run().unwrap();
    assert_eq!(status(&report, "focused"), TestStatus::Passed);
    assert_eq!(status(&report, "sibling"), TestStatus::Skipped);
    assert_eq!(count.load(Ordering::SeqCst), 50);
}

#[test]
fn test_skip_prop_never_runs_predicate() {
    let (suite, test) = setup("skip");
    let count = Arc::new(AtomicU32::new(0));
    test.skip()
        .unwrap()
        .prop([fc::boolean()], None)
        .unwrap()
        .register("skipped", counted(&count), None)
        .unwrap();

    let report = suite.run().unwrap();
    assert_eq!(status(&report, "skipped"), TestStatus::Skipped);
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test_case("if", false, TestStatus::Skipped, false ; "if false skips")]
#[test_case("if", true, TestStatus::Passed, true ; "if true runs")]
#[test_case("skipIf", true, TestStatus::Skipped, false ; "skipIf true skips")]
#[test_case("skipIf", false, TestStatus::Passed, true ; "skipIf false runs")]
#[test_case("todoIf", true, TestStatus::Todo, false ; "todoIf true is todo")]
#[test_case("todoIf", false, TestStatus::Passed, true ; "todoIf false runs")]
fn test_conditional_prop(slot: &str, condition: bool, expected: TestStatus, executes: bool) {
    let (suite, test) = setup("conditional");
    let count = Arc::new(AtomicU32::new(0));
    test.conditional(slot, condition)
        .unwrap()
        .prop([fc::nat(10)], None)
        .unwrap()
        .register("conditional", counted(&count), None)
        .unwrap();

    let report = suite.run().unwrap();
    assert_eq!(status(&report, "conditional"), expected);
    assert_eq!(count.load(Ordering::SeqCst) > 0, executes);
}

#[test]
fn test_failing_prop_passes_when_property_fails() {
    let (suite, test) = setup("failing");
    test.failing()
        .unwrap()
        .prop([fc::constant(0)], None)
        .unwrap()
        .register("known bug", Predicate::new(|_: &Value| false), None)
        .unwrap();

    let report = suite.run().unwrap();
    assert_eq!(status(&report, "known bug"), TestStatus::Passed);
}

#[test]
fn test_every_variant_exposes_prop() {
    let (_suite, test) = setup("shape");
    assert!(test.prop_fn().is_some());
    for name in ["only", "skip", "todo", "failing"] {
        assert!(test.nested(name).unwrap().prop_fn().is_some(), "{name}");
    }
    for name in ["if", "skipIf", "todoIf"] {
        for condition in [true, false] {
            let variant = test.conditional(name, condition).unwrap();
            assert!(variant.prop_fn().is_some(), "{name}({condition})");
        }
    }
}

#[test]
fn test_each_passes_through_untouched() {
    propit::init();
    let suite = Suite::new("each");
    let base = suite.test();
    let test = build_test(&base, engine());

    assert!(test.each().unwrap().ptr_eq(base.each().unwrap()));
    assert!(test
        .only()
        .unwrap()
        .each()
        .unwrap()
        .ptr_eq(base.callable("only").unwrap().each().unwrap()));
}

#[test]
fn test_direct_call_matches_base_registration() {
    let (suite, test) = setup("delegation");
    test.call("direct", TestBody::new(|| Ok(())), None);
    test.base().call("base", TestBody::new(|| Ok(())), None);
    assert_eq!(suite.len(), 2);

    let report = suite.run().unwrap();
    assert_eq!(status(&report, "direct"), TestStatus::Passed);
    assert_eq!(status(&report, "base"), TestStatus::Passed);
}

#[test]
fn test_timeout_fails_slow_property() {
    let (suite, test) = setup("timeout");
    test.prop([fc::constant(1)], None)
        .unwrap()
        .register(
            "slow",
            Predicate::future(|_: Value| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                true
            }),
            Some(Duration::from_millis(30)),
        )
        .unwrap();

    let report = suite.run().unwrap();
    let result = report.result("slow").unwrap();
    assert_eq!(result.status, TestStatus::Failed);
    assert_eq!(result.message.as_deref(), Some("test timed out after 30ms"));
}

#[test]
fn test_async_predicate_samples_in_order() {
    let (suite, test) = setup("async");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let params = Parameters::new()
        .with_examples(vec![json!([1]), json!([2]), json!([3])])
        .with_num_runs(3);
    test.prop([fc::nat(5)], Some(params))
        .unwrap()
        .register(
            "ordered",
            Predicate::future(move |args: Value| {
                let sink = sink.clone();
                async move {
                    tokio::task::yield_now().await;
                    sink.lock().push(args[0].clone());
                    true
                }
            }),
            None,
        )
        .unwrap();

    let report = suite.run().unwrap();
    assert_eq!(status(&report, "ordered"), TestStatus::Passed);
    assert_eq!(*seen.lock(), vec![json!(1), json!(2), json!(3)]);
}
