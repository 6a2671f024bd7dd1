//! Translation between record-shaped inputs and the singleton tuples the
//! engine samples.
//!
//! A record property runs as a one-element tuple property. Going in, record
//! examples are wrapped into `[example]` and reporters are wrapped so they
//! see record-shaped details. Coming out, every tuple-shaped value in the
//! run details is unwrapped again: the counterexample, each failure, every
//! node of the execution summary and the examples of the run configuration.

use std::sync::Arc;

use propit_engine::{ExecutionTree, Parameters, RunDetails};
use serde_json::Value;

use crate::error::{PropError, Result};

/// `[value]`.
pub fn wrap(value: Value) -> Value {
    Value::Array(vec![value])
}

/// `[value]` becomes `value`; anything else is returned unchanged.
pub fn unwrap(value: Value) -> Value {
    match value {
        Value::Array(items) if items.len() == 1 => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    }
}

/// Parameters for the singleton-tuple property built from a record.
///
/// Examples must be objects. Reporters are replaced by wrappers that
/// translate run details back with [`adapt_run_details`] before calling the
/// caller's reporter. Everything else passes through.
pub fn wrap_parameters(params: Parameters) -> Result<Parameters> {
    let examples = match &params.examples {
        Some(examples) => Some(
            examples
                .iter()
                .map(|example| match example {
                    Value::Object(_) => Ok(wrap(example.clone())),
                    other => Err(PropError::MalformedExample(other.clone())),
                })
                .collect::<Result<Vec<_>>>()?,
        ),
        None => None,
    };

    let original = Arc::new(params.clone());
    let reporter = params.reporter.clone().map(|reporter| {
        let original = original.clone();
        Arc::new(move |details: &RunDetails| {
            reporter(&adapt_run_details(details.clone(), &original))
        }) as propit_engine::Reporter
    });
    let async_reporter = params.async_reporter.clone().map(|reporter| {
        let original = original.clone();
        Arc::new(move |details: RunDetails| reporter(adapt_run_details(details, &original)))
            as propit_engine::AsyncReporter
    });

    Ok(Parameters {
        examples,
        reporter,
        async_reporter,
        ..params
    })
}

/// Run configuration as the caller sees it: the engine's resolved values,
/// unwrapped examples and the caller's own reporters.
pub fn adapt_parameters(params: &Parameters, original: &Parameters) -> Parameters {
    Parameters {
        examples: params
            .examples
            .as_ref()
            .map(|examples| examples.iter().cloned().map(unwrap).collect()),
        reporter: original.reporter.clone(),
        async_reporter: original.async_reporter.clone(),
        ..params.clone()
    }
}

/// Unwrap every node value, recursively.
pub fn adapt_execution_tree(trees: Vec<ExecutionTree>) -> Vec<ExecutionTree> {
    trees
        .into_iter()
        .map(|tree| ExecutionTree {
            value: unwrap(tree.value),
            children: adapt_execution_tree(tree.children),
            ..tree
        })
        .collect()
}

/// Record-shaped run details.
pub fn adapt_run_details(details: RunDetails, original: &Parameters) -> RunDetails {
    RunDetails {
        counterexample: details.counterexample.map(unwrap),
        failures: details.failures.into_iter().map(unwrap).collect(),
        execution_summary: adapt_execution_tree(details.execution_summary),
        run_configuration: adapt_parameters(&details.run_configuration, original),
        ..details
    }
}
