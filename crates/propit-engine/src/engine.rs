//! The engine seam used by callers that build properties on demand.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::arbitrary::Arbitrary;
use crate::combinators;
use crate::error::PropertyFailure;
use crate::global::{self, GlobalParameters};
use crate::params::Parameters;
use crate::property::Property;
use crate::sampler;

/// The primitives a caller needs to turn arbitraries and a predicate into a
/// checked property.
///
/// Futures returned by [`PropertyEngine::assert`] hold proptest value trees
/// and are therefore not `Send`; drive them on a current-thread runtime.
#[async_trait(?Send)]
pub trait PropertyEngine: Send + Sync {
    /// Combine named arbitraries into one arbitrary of objects.
    fn record(&self, fields: IndexMap<String, Arbitrary>) -> Arbitrary;

    /// Sample, shrink and report a property.
    async fn assert(&self, property: Property, params: Parameters) -> Result<(), PropertyFailure>;

    /// Defaults for parameters the caller left unset.
    fn read_configure_global(&self) -> GlobalParameters;
}

/// The proptest-backed engine.
#[derive(Debug, Clone, Default)]
pub struct ProptestEngine {
    global: Option<GlobalParameters>,
}

impl ProptestEngine {
    /// Engine reading the process-wide configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine pinned to `global`, ignoring the process-wide configuration.
    pub fn with_global(global: GlobalParameters) -> Self {
        Self {
            global: Some(global),
        }
    }
}

#[async_trait(?Send)]
impl PropertyEngine for ProptestEngine {
    fn record(&self, fields: IndexMap<String, Arbitrary>) -> Arbitrary {
        combinators::record(fields)
    }

    async fn assert(&self, property: Property, params: Parameters) -> Result<(), PropertyFailure> {
        let global = self.read_configure_global();
        sampler::assert_with(&property, &params, &global).await
    }

    fn read_configure_global(&self) -> GlobalParameters {
        match &self.global {
            Some(global) => global.clone(),
            None => global::read_configure_global(),
        }
    }
}
