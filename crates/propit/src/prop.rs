//! `.prop`: register one property test on a declarator.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use propit_engine::{
    Arbitrary, Parameters, Predicate, Property, PropertyEngine, PropertyFailure,
};
use propit_runner::{TestBody, TestFailure, TestFn};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::Result;
use crate::record;

/// Inputs of a property: positional or named.
#[derive(Debug, Clone)]
pub enum Arbitraries {
    /// The predicate receives a JSON array, one element per arbitrary.
    Tuple(Vec<Arbitrary>),
    /// The predicate receives a JSON object with these fields.
    Record(IndexMap<String, Arbitrary>),
}

impl Arbitraries {
    /// Positional inputs.
    pub fn tuple(arbitraries: impl IntoIterator<Item = Arbitrary>) -> Self {
        Self::Tuple(arbitraries.into_iter().collect())
    }

    /// Named inputs, in field order.
    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Arbitrary)>) -> Self {
        Self::Record(
            fields
                .into_iter()
                .map(|(name, arbitrary)| (name.into(), arbitrary))
                .collect(),
        )
    }
}

impl From<Vec<Arbitrary>> for Arbitraries {
    fn from(arbitraries: Vec<Arbitrary>) -> Self {
        Self::Tuple(arbitraries)
    }
}

impl<const N: usize> From<[Arbitrary; N]> for Arbitraries {
    fn from(arbitraries: [Arbitrary; N]) -> Self {
        Self::tuple(arbitraries)
    }
}

impl From<IndexMap<String, Arbitrary>> for Arbitraries {
    fn from(fields: IndexMap<String, Arbitrary>) -> Self {
        Self::Record(fields)
    }
}

/// The `.prop` capability of one declarator.
#[derive(Clone)]
pub struct PropFn {
    target: TestFn,
    engine: Arc<dyn PropertyEngine>,
}

impl PropFn {
    pub(crate) fn new(target: TestFn, engine: Arc<dyn PropertyEngine>) -> Self {
        Self { target, engine }
    }

    /// The declarator property tests are registered on.
    pub fn target(&self) -> &TestFn {
        &self.target
    }

    /// Bind inputs and parameters.
    pub fn call(&self, arbitraries: impl Into<Arbitraries>, params: Option<Parameters>) -> PropertyCase {
        PropertyCase {
            target: self.target.clone(),
            engine: self.engine.clone(),
            arbitraries: arbitraries.into(),
            params,
        }
    }
}

impl fmt::Debug for PropFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropFn").field("target", &self.target).finish()
    }
}

/// A property waiting for its name and predicate.
pub struct PropertyCase {
    target: TestFn,
    engine: Arc<dyn PropertyEngine>,
    arbitraries: Arbitraries,
    params: Option<Parameters>,
}

impl PropertyCase {
    /// Register the property as one test named `name`.
    ///
    /// In record mode the arbitraries are combined into one record
    /// arbitrary and run as a singleton tuple; `predicate` still receives
    /// the bare object. Record examples that are not objects are rejected
    /// here, before anything is registered.
    pub fn register(self, name: &str, predicate: Predicate, timeout: Option<Duration>) -> Result<()> {
        let record_mode = matches!(self.arbitraries, Arbitraries::Record(_));
        let (property, params) = match self.arbitraries {
            Arbitraries::Tuple(arbitraries) => (
                Property::new(arbitraries, predicate),
                self.params.unwrap_or_default(),
            ),
            Arbitraries::Record(fields) => {
                let params = match self.params {
                    Some(params) => record::wrap_parameters(params)?,
                    None => Parameters::default(),
                };
                let generator = self.engine.record(fields);
                let predicate = predicate.contramap(|input: &Value| input[0].clone());
                (Property::new(vec![generator], predicate), params)
            }
        };

        debug!(
            test = name,
            target = self.target.name(),
            record_mode,
            arity = property.arity(),
            "registering property"
        );

        let engine = self.engine;
        self.target.call(
            name,
            TestBody::future(move || async move {
                engine
                    .assert(property, params)
                    .await
                    .map_err(|failure| into_test_failure(failure, record_mode))
            }),
            timeout,
        );
        Ok(())
    }
}

/// Failing property runs become assertion failures whose detail carries the
/// counterexample in the caller's shape.
fn into_test_failure(failure: PropertyFailure, record_mode: bool) -> TestFailure {
    let failure = match failure {
        PropertyFailure::Counterexample {
            counterexample,
            seed,
            path,
            num_runs,
            num_shrinks,
            message,
        } if record_mode => PropertyFailure::Counterexample {
            counterexample: record::unwrap(counterexample),
            seed,
            path,
            num_runs,
            num_shrinks,
            message,
        },
        other => other,
    };

    let detail = match &failure {
        PropertyFailure::Counterexample {
            counterexample,
            seed,
            path,
            num_runs,
            num_shrinks,
            message,
        } => Some(json!({
            "counterexample": counterexample,
            "seed": seed,
            "path": path,
            "numRuns": num_runs,
            "numShrinks": num_shrinks,
            "error": message,
        })),
        PropertyFailure::Interrupted { num_runs, seed } => Some(json!({
            "interrupted": true,
            "seed": seed,
            "numRuns": num_runs,
        })),
        _ => None,
    };

    TestFailure::Assertion {
        message: failure.to_string(),
        detail,
    }
}
