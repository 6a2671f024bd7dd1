//! Properties: a tuple of arbitraries paired with a predicate.

use serde_json::Value;

use crate::arbitrary::Arbitrary;
use crate::combinators::tuple;
use crate::error::PropertyFailure;
use crate::predicate::Predicate;

/// A property over positional inputs.
///
/// The predicate receives every sample as a JSON array holding one value
/// per arbitrary, in declaration order.
#[derive(Debug, Clone)]
pub struct Property {
    arity: usize,
    generator: Arbitrary,
    predicate: Predicate,
}

impl Property {
    /// Build a property from positional arbitraries.
    pub fn new(arbitraries: Vec<Arbitrary>, predicate: Predicate) -> Self {
        Self {
            arity: arbitraries.len(),
            generator: tuple(arbitraries),
            predicate,
        }
    }

    /// Number of positional inputs.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Generator of whole input tuples.
    pub fn generator(&self) -> &Arbitrary {
        &self.generator
    }

    /// The predicate under test.
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Reject examples that cannot be fed to the predicate.
    pub fn validate_example(&self, example: &Value) -> Result<(), PropertyFailure> {
        match example.as_array() {
            Some(values) if values.len() == self.arity => Ok(()),
            Some(values) => Err(PropertyFailure::Configuration(format!(
                "example {example} has {} value(s), expected {}",
                values.len(),
                self.arity
            ))),
            None => Err(PropertyFailure::Configuration(format!(
                "example {example} is not an array of {} value(s)",
                self.arity
            ))),
        }
    }
}
