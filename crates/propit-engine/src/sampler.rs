//! The sampling loop.
//!
//! Examples run first, then random samples, one at a time, `num_runs`
//! inputs in all. The first failing input stops sampling; inputs drawn from
//! a generator are then shrunk through their value tree. Each evaluated
//! input lands in the execution summary.

use std::time::Instant;

use proptest::strategy::{Strategy, ValueTree};
use proptest::test_runner::{Config, RngAlgorithm, TestRng, TestRunner};
use serde_json::Value;
use tracing::debug;

use crate::details::{ExecutionStatus, ExecutionTree, RunDetails};
use crate::error::PropertyFailure;
use crate::global::{read_configure_global, GlobalParameters};
use crate::params::{Parameters, Settings};
use crate::predicate::{Predicate, Verdict};
use crate::property::Property;

type Tree = Box<dyn ValueTree<Value = Value>>;

struct Failing {
    input: Value,
    message: String,
    tree: Option<Tree>,
}

struct Shrunk {
    counterexample: Value,
    message: String,
    path: Vec<usize>,
    num_shrinks: u32,
    interrupted: bool,
}

/// Run a property against the global configuration and collect details.
pub async fn check(property: &Property, params: &Parameters) -> Result<RunDetails, PropertyFailure> {
    check_with(property, params, &read_configure_global()).await
}

/// Run a property and collect details.
///
/// Errors are reserved for runs that could not be carried out at all
/// (malformed examples, generator failures); a falsified property is a
/// successful check whose details say `failed`.
pub async fn check_with(
    property: &Property,
    params: &Parameters,
    global: &GlobalParameters,
) -> Result<RunDetails, PropertyFailure> {
    let settings = Settings::resolve(params, global);
    let examples = params.examples.clone().unwrap_or_default();
    for example in &examples {
        property.validate_example(example)?;
    }

    debug!(
        seed = settings.seed,
        num_runs = settings.num_runs,
        examples = examples.len(),
        generator = property.generator().label(),
        "checking property"
    );

    let mut runner = runner_for(&settings);
    let predicate = property.predicate();
    let started = Instant::now();
    let mut summary = Vec::new();
    let mut failures = Vec::new();
    let mut interrupted = false;
    let mut first_failure = None;

    let mut examples = examples.into_iter();
    for _ in 0..settings.num_runs {
        if out_of_time(&settings, started) {
            interrupted = true;
            break;
        }

        let (input, tree) = match examples.next() {
            Some(example) => (example, None),
            None => {
                let tree = property
                    .generator()
                    .new_tree(&mut runner)
                    .map_err(|reason| PropertyFailure::Generation(reason.message().to_string()))?;
                (tree.current(), Some(tree))
            }
        };

        match predicate.evaluate(&input).await {
            Verdict::Pass => summary.push(ExecutionTree::leaf(ExecutionStatus::Success, input)),
            Verdict::Fail(message) => {
                summary.push(ExecutionTree::leaf(ExecutionStatus::Failure, input.clone()));
                failures.push(input.clone());
                first_failure = Some(Failing {
                    input,
                    message,
                    tree,
                });
                break;
            }
        }

        tokio::task::yield_now().await;
    }

    let num_runs = summary.len() as u32;
    let mut details = RunDetails {
        failed: false,
        interrupted,
        num_runs,
        num_shrinks: 0,
        seed: settings.seed,
        counterexample: None,
        counterexample_path: None,
        error: None,
        failures: Vec::new(),
        execution_summary: Vec::new(),
        run_configuration: settings.to_parameters(params),
    };

    match first_failure {
        Some(failing) => {
            let shrunk = shrink(predicate, failing, &settings, started, &mut summary, &mut failures).await;
            debug!(
                num_runs,
                num_shrinks = shrunk.num_shrinks,
                counterexample = %shrunk.counterexample,
                "property falsified"
            );
            details.failed = true;
            details.interrupted |= shrunk.interrupted;
            details.num_shrinks = shrunk.num_shrinks;
            details.counterexample = Some(shrunk.counterexample);
            details.counterexample_path = Some(
                shrunk
                    .path
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(":"),
            );
            details.error = Some(shrunk.message);
        }
        None if interrupted && settings.mark_interrupt_as_failure => {
            details.failed = true;
            details.error = Some(format!("Property interrupted after {num_runs} tests"));
        }
        None => {}
    }

    details.failures = failures;
    details.execution_summary = summary;
    Ok(details)
}

/// Run a property against the global configuration and report the outcome.
pub async fn assert(property: &Property, params: &Parameters) -> Result<(), PropertyFailure> {
    assert_with(property, params, &read_configure_global()).await
}

/// Run a property and report the outcome through the configured reporter.
pub async fn assert_with(
    property: &Property,
    params: &Parameters,
    global: &GlobalParameters,
) -> Result<(), PropertyFailure> {
    let details = check_with(property, params, global).await?;
    report(details).await
}

/// Hand finished run details to the caller's reporters, or to the default
/// reporter when none is configured.
pub async fn report(details: RunDetails) -> Result<(), PropertyFailure> {
    let reporter = details.run_configuration.reporter.clone();
    let async_reporter = details.run_configuration.async_reporter.clone();
    if reporter.is_none() && async_reporter.is_none() {
        return default_reporter(&details);
    }

    if let Some(reporter) = reporter {
        reporter(&details).map_err(|e| PropertyFailure::Reporter(format!("{e:#}")))?;
    }
    if let Some(reporter) = async_reporter {
        reporter(details)
            .await
            .map_err(|e| PropertyFailure::Reporter(format!("{e:#}")))?;
    }
    Ok(())
}

fn default_reporter(details: &RunDetails) -> Result<(), PropertyFailure> {
    if !details.failed {
        return Ok(());
    }

    match &details.counterexample {
        Some(counterexample) => Err(PropertyFailure::Counterexample {
            counterexample: counterexample.clone(),
            seed: details.seed,
            path: details.counterexample_path.clone().unwrap_or_default(),
            num_runs: details.num_runs,
            num_shrinks: details.num_shrinks,
            message: details.error.clone().unwrap_or_default(),
        }),
        None => Err(PropertyFailure::Interrupted {
            num_runs: details.num_runs,
            seed: details.seed,
        }),
    }
}

fn out_of_time(settings: &Settings, started: Instant) -> bool {
    settings
        .interrupt_after_time_limit
        .is_some_and(|limit| started.elapsed() >= limit)
}

fn runner_for(settings: &Settings) -> TestRunner {
    let mut seed = [0u8; 32];
    seed[..8].copy_from_slice(&settings.seed.to_le_bytes());

    let config = Config {
        cases: settings.num_runs,
        max_shrink_iters: settings.max_shrinks,
        failure_persistence: None,
        ..Config::default()
    };
    TestRunner::new_with_rng(config, TestRng::from_seed(RngAlgorithm::ChaCha, &seed))
}

async fn shrink(
    predicate: &Predicate,
    failing: Failing,
    settings: &Settings,
    started: Instant,
    summary: &mut [ExecutionTree],
    failures: &mut Vec<Value>,
) -> Shrunk {
    let mut shrunk = Shrunk {
        counterexample: failing.input,
        message: failing.message,
        path: vec![summary.len().saturating_sub(1)],
        num_shrinks: 0,
        interrupted: false,
    };

    let Some(mut tree) = failing.tree.filter(|_| !settings.end_on_failure) else {
        return shrunk;
    };

    let mut attempts = 0u32;
    let mut more = tree.simplify();
    while more && attempts < settings.max_shrinks {
        if out_of_time(settings, started) {
            debug!(num_shrinks = shrunk.num_shrinks, "shrinking interrupted");
            shrunk.interrupted = true;
            break;
        }
        attempts += 1;
        let candidate = tree.current();
        match predicate.evaluate(&candidate).await {
            Verdict::Pass => {
                attach(
                    summary,
                    &shrunk.path,
                    ExecutionTree::leaf(ExecutionStatus::Success, candidate),
                );
                more = tree.complicate();
            }
            Verdict::Fail(message) => {
                let node = ExecutionTree::leaf(ExecutionStatus::Failure, candidate.clone());
                if let Some(index) = attach(summary, &shrunk.path, node) {
                    shrunk.path.push(index);
                }
                failures.push(candidate.clone());
                shrunk.counterexample = candidate;
                shrunk.message = message;
                shrunk.num_shrinks += 1;
                more = tree.simplify();
            }
        }
        tokio::task::yield_now().await;
    }

    shrunk
}

/// Append `node` under the node at `path`, returning its child index.
fn attach(roots: &mut [ExecutionTree], path: &[usize], node: ExecutionTree) -> Option<usize> {
    let (first, rest) = path.split_first()?;
    let mut parent = roots.get_mut(*first)?;
    for index in rest {
        parent = parent.children.get_mut(*index)?;
    }
    parent.children.push(node);
    Some(parent.children.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arbitrary::{constant, integer};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn global(num_runs: u32) -> GlobalParameters {
        GlobalParameters {
            num_runs,
            seed: Some(7),
            ..GlobalParameters::standard()
        }
    }

    fn sum_is(expected: i64) -> Predicate {
        Predicate::new(move |args: &Value| {
            args[0].as_i64().unwrap_or_default() + args[1].as_i64().unwrap_or_default() == expected
        })
    }

    #[tokio::test]
    async fn test_passing_property_runs_every_sample() {
        let property = Property::new(vec![constant(1), constant(2)], sum_is(3));
        let details = check_with(&property, &Parameters::new(), &global(25))
            .await
            .unwrap();

        assert!(details.passed());
        assert_eq!(details.num_runs, 25);
        assert_eq!(details.execution_summary.len(), 25);
        assert!(details.counterexample.is_none());
    }

    #[tokio::test]
    async fn test_failing_property_reports_counterexample() {
        let property = Property::new(vec![constant(1), constant(2)], sum_is(4));
        let err = assert_with(&property, &Parameters::new(), &global(25))
            .await
            .unwrap_err();

        assert_eq!(err.counterexample(), Some(&json!([1, 2])));
        assert!(err.to_string().contains("Property failed after 1 tests"));
    }

    #[tokio::test]
    async fn test_counterexample_is_shrunk() {
        let property = Property::new(
            vec![integer(0..=10_000)],
            Predicate::new(|args: &Value| args[0].as_i64().unwrap_or_default() < 100),
        );
        let params = Parameters::new().with_num_runs(200);
        let details = check_with(&property, &params, &global(0)).await.unwrap();

        assert!(details.failed);
        assert_eq!(details.counterexample, Some(json!([100])));
        assert!(details.num_shrinks > 0);
        assert_eq!(details.failures.len() as u32, details.num_shrinks + 1);
        assert_eq!(details.failures.last(), details.counterexample.as_ref());
    }

    #[tokio::test]
    async fn test_counterexample_path_points_into_summary() {
        let property = Property::new(
            vec![integer(0..=10_000)],
            Predicate::new(|args: &Value| args[0].as_i64().unwrap_or_default() < 100),
        );
        let details = check_with(&property, &Parameters::new(), &global(200))
            .await
            .unwrap();

        let path: Vec<usize> = details
            .counterexample_path
            .as_deref()
            .unwrap()
            .split(':')
            .map(|part| part.parse().unwrap())
            .collect();
        let mut node = &details.execution_summary[path[0]];
        for index in &path[1..] {
            node = &node.children[*index];
        }
        assert_eq!(Some(&node.value), details.counterexample.as_ref());
        assert_eq!(node.status, ExecutionStatus::Failure);
    }

    #[tokio::test]
    async fn test_end_on_failure_skips_shrinking() {
        let property = Property::new(
            vec![integer(1_000..=10_000)],
            Predicate::new(|_: &Value| false),
        );
        let params = Parameters::new().with_end_on_failure(true);
        let details = check_with(&property, &params, &global(10)).await.unwrap();

        assert!(details.failed);
        assert_eq!(details.num_shrinks, 0);
        assert_eq!(details.execution_summary[0].children.len(), 0);
    }

    #[tokio::test]
    async fn test_examples_run_before_random_samples() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let property = Property::new(
            vec![constant(0)],
            Predicate::new(move |args: &Value| {
                recorder.lock().push(args.clone());
                true
            }),
        );
        let params = Parameters::new()
            .with_examples(vec![json!([41]), json!([42])])
            .with_num_runs(4);
        let details = check_with(&property, &params, &global(100)).await.unwrap();

        assert_eq!(details.num_runs, 4);
        assert_eq!(
            *seen.lock(),
            vec![json!([41]), json!([42]), json!([0]), json!([0])]
        );
    }

    #[tokio::test]
    async fn test_examples_count_towards_num_runs() {
        let property = Property::new(vec![constant(0)], Predicate::new(|_: &Value| true));
        let params = Parameters::new()
            .with_examples(vec![json!([1]), json!([2]), json!([3])])
            .with_num_runs(2);
        let details = check_with(&property, &params, &global(100)).await.unwrap();

        assert_eq!(details.num_runs, 2);
        let inputs: Vec<&Value> = details.execution_summary.iter().map(|node| &node.value).collect();
        assert_eq!(inputs, vec![&json!([1]), &json!([2])]);
    }

    #[tokio::test]
    async fn test_failing_example_is_not_shrunk() {
        let property = Property::new(
            vec![integer(0..=10)],
            Predicate::new(|args: &Value| args[0].as_i64().unwrap_or_default() < 500),
        );
        let params = Parameters::new().with_examples(vec![json!([900])]);
        let details = check_with(&property, &params, &global(10)).await.unwrap();

        assert_eq!(details.counterexample, Some(json!([900])));
        assert_eq!(details.num_shrinks, 0);
        assert_eq!(details.num_runs, 1);
    }

    #[tokio::test]
    async fn test_malformed_example_is_a_configuration_error() {
        let property = Property::new(vec![constant(1)], Predicate::new(|_: &Value| true));
        let params = Parameters::new().with_examples(vec![json!(1)]);
        let err = check_with(&property, &params, &global(10)).await.unwrap_err();
        assert!(matches!(err, PropertyFailure::Configuration(_)));
    }

    #[tokio::test]
    async fn test_same_seed_gives_same_samples() {
        let property = Property::new(vec![integer(0..=1_000_000)], Predicate::new(|_: &Value| true));
        let first = check_with(&property, &Parameters::new(), &global(20)).await.unwrap();
        let second = check_with(&property, &Parameters::new(), &global(20)).await.unwrap();
        assert_eq!(first.execution_summary, second.execution_summary);
        assert_eq!(first.seed, 7);
    }

    #[tokio::test]
    async fn test_custom_reporter_replaces_default() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let property = Property::new(vec![constant(1)], Predicate::new(|_: &Value| false));
        let params = Parameters::new().with_reporter(move |details| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert!(details.failed);
            Ok(())
        });

        assert!(assert_with(&property, &params, &global(5)).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reporter_error_fails_the_run() {
        let property = Property::new(vec![constant(1)], Predicate::new(|_: &Value| true));
        let params = Parameters::new().with_reporter(|_| anyhow::bail!("rejected by reporter"));
        let err = assert_with(&property, &params, &global(5)).await.unwrap_err();
        assert_eq!(err.to_string(), "rejected by reporter");
    }

    #[tokio::test]
    async fn test_async_reporter_is_awaited() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let property = Property::new(vec![constant(1)], Predicate::new(|_: &Value| true));
        let params = Parameters::new().with_async_reporter(move |details| {
            let counter = counter.clone();
            async move {
                tokio::task::yield_now().await;
                counter.fetch_add(details.num_runs, Ordering::SeqCst);
                Ok(())
            }
        });

        assert_with(&property, &params, &global(3)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_async_samples_run_sequentially() {
        let in_flight = Arc::new(AtomicU32::new(0));
        let tracker = in_flight.clone();
        let property = Property::new(
            vec![integer(0..=10)],
            Predicate::future(move |_| {
                let tracker = tracker.clone();
                async move {
                    let concurrent = tracker.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    tracker.fetch_sub(1, Ordering::SeqCst);
                    concurrent == 0
                }
            }),
        );
        let details = check_with(&property, &Parameters::new(), &global(20)).await.unwrap();
        assert!(details.passed());
    }

    #[tokio::test]
    async fn test_time_limit_interrupts_sampling() {
        let property = Property::new(
            vec![constant(1)],
            Predicate::future(|_| async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                true
            }),
        );
        let params = Parameters::new()
            .with_num_runs(10_000)
            .with_interrupt_after_time_limit(Duration::from_millis(20));
        let details = check_with(&property, &params, &global(0)).await.unwrap();

        assert!(details.interrupted);
        assert!(!details.failed);
        assert!(details.num_runs < 10_000);
    }

    #[tokio::test]
    async fn test_time_limit_interrupts_shrinking() {
        let property = Property::new(
            vec![integer(1_000..=1_000_000)],
            Predicate::future(|_| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                false
            }),
        );
        let params = Parameters::new().with_interrupt_after_time_limit(Duration::from_millis(25));
        let details = check_with(&property, &params, &global(10)).await.unwrap();

        assert!(details.failed);
        assert!(details.interrupted);
        assert!(details.counterexample.is_some());
        assert!(details.num_shrinks <= 2);
    }

    #[tokio::test]
    async fn test_interrupt_marked_as_failure() {
        let property = Property::new(vec![constant(1)], Predicate::new(|_: &Value| true));
        let params = Parameters::new()
            .with_interrupt_after_time_limit(Duration::ZERO)
            .with_mark_interrupt_as_failure(true);
        let err = assert_with(&property, &params, &global(10)).await.unwrap_err();
        assert!(matches!(err, PropertyFailure::Interrupted { num_runs: 0, .. }));
    }

    #[test]
    fn test_attach_follows_path() {
        let mut roots = vec![ExecutionTree::leaf(ExecutionStatus::Failure, json!(1))];
        assert_eq!(
            attach(&mut roots, &[0], ExecutionTree::leaf(ExecutionStatus::Failure, json!(2))),
            Some(0)
        );
        assert_eq!(
            attach(&mut roots, &[0, 0], ExecutionTree::leaf(ExecutionStatus::Success, json!(3))),
            Some(0)
        );
        assert_eq!(roots[0].children[0].children[0].value, json!(3));
        assert_eq!(attach(&mut roots, &[4], ExecutionTree::leaf(ExecutionStatus::Success, json!(0))), None);
    }
}
