//! Arbitraries: shareable generators of JSON values.
//!
//! Every arbitrary is backed by a proptest strategy, so generation and
//! shrinking come from proptest's value trees. Values are carried as
//! [`serde_json::Value`] so that positional (tuple) and named (record)
//! inputs can be assembled at run time.

use std::ops::{Range, RangeInclusive};

use proptest::prelude::*;
use proptest::strategy::{NewTree, SBoxedStrategy, Union, ValueTree};
use proptest::test_runner::TestRunner;
use serde::Serialize;
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// A generator of JSON values with shrinking support.
#[derive(Debug, Clone)]
pub struct Arbitrary {
    label: String,
    strategy: SBoxedStrategy<Value>,
}

impl Arbitrary {
    /// Wrap a proptest strategy that already produces JSON values.
    pub fn new<S>(label: impl Into<String>, strategy: S) -> Self
    where
        S: Strategy<Value = Value> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            strategy: strategy.sboxed(),
        }
    }

    /// Short description used in logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Transform every generated value. Shrinking still operates on the
    /// source value.
    pub fn map<F>(self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self {
            label: format!("map({})", self.label),
            strategy: self.strategy.prop_map(f).sboxed(),
        }
    }
}

impl Strategy for Arbitrary {
    type Tree = Box<dyn ValueTree<Value = Value>>;
    type Value = Value;

    fn new_tree(&self, runner: &mut TestRunner) -> NewTree<Self> {
        self.strategy.new_tree(runner)
    }
}

/// Always produces `value`.
pub fn constant(value: impl Into<Value>) -> Arbitrary {
    Arbitrary::new("constant", Just(value.into()))
}

/// `true` or `false`, shrinking towards `false`.
pub fn boolean() -> Arbitrary {
    Arbitrary::new("boolean", any::<bool>().prop_map(Value::Bool))
}

/// Integers in `range`, shrinking towards zero (or the bound nearest to it).
pub fn integer(range: RangeInclusive<i64>) -> Arbitrary {
    Arbitrary::new("integer", range.prop_map(|n| Value::from(n)))
}

/// Natural numbers up to and including `max`.
pub fn nat(max: u32) -> Arbitrary {
    Arbitrary::new("nat", (0..=max).prop_map(|n| Value::from(n)))
}

/// Arbitrary unicode strings.
pub fn string() -> Arbitrary {
    Arbitrary::new("string", any::<String>().prop_map(Value::String))
}

/// Strings matching a regular expression.
pub fn string_matching(pattern: &str) -> EngineResult<Arbitrary> {
    let strategy = proptest::string::string_regex(pattern).map_err(|e| EngineError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    Ok(Arbitrary::new(
        format!("string_matching({pattern})"),
        strategy.prop_map(Value::String),
    ))
}

/// Arrays of `element` values with a length in `len`.
pub fn array(element: Arbitrary, len: Range<usize>) -> Arbitrary {
    let label = format!("array({})", element.label);
    Arbitrary::new(
        label,
        proptest::collection::vec(element.strategy, len).prop_map(Value::Array),
    )
}

/// Picks one of `choices` uniformly, then generates from it.
pub fn one_of(choices: Vec<Arbitrary>) -> EngineResult<Arbitrary> {
    if choices.is_empty() {
        return Err(EngineError::EmptyChoice);
    }
    let union = Union::new(choices.into_iter().map(|choice| choice.strategy));
    Ok(Arbitrary::new("one_of", union))
}

/// Lift any proptest strategy whose values serialize to JSON.
///
/// Values that fail to serialize (maps with non-string keys, for instance)
/// are generated as `null`.
pub fn from_strategy<S>(strategy: S) -> Arbitrary
where
    S: Strategy + Send + Sync + 'static,
    S::Value: Serialize,
{
    Arbitrary::new(
        "from_strategy",
        strategy.prop_map(|value| serde_json::to_value(value).unwrap_or(Value::Null)),
    )
}
