//! Propit Engine
//!
//! Generation, sampling and shrinking for property tests. Arbitraries are
//! proptest strategies over JSON values; a [`Property`] pairs a tuple of
//! them with a [`Predicate`], and [`check`] / [`assert`] run it.

pub mod arbitrary;
pub mod combinators;
pub mod details;
pub mod engine;
pub mod error;
pub mod global;
pub mod params;
pub mod predicate;
pub mod property;
pub mod sampler;

pub use arbitrary::{
    array, boolean, constant, from_strategy, integer, nat, one_of, string, string_matching,
    Arbitrary,
};
pub use combinators::{record, tuple};
pub use details::{ExecutionStatus, ExecutionTree, RunDetails};
pub use engine::{PropertyEngine, ProptestEngine};
pub use error::{EngineError, EngineResult, PropertyFailure};
pub use global::{configure_global, read_configure_global, reset_configure_global, GlobalParameters};
pub use params::{AsyncReporter, Parameters, Reporter};
pub use predicate::{IntoVerdict, Predicate, Verdict, RETURNED_FALSE};
pub use property::Property;
pub use sampler::{assert, assert_with, check, check_with, report};
