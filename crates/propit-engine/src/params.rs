//! Run parameters.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

use crate::details::RunDetails;
use crate::global::GlobalParameters;

/// Synchronous reporter; replaces the default failure reporting.
pub type Reporter = Arc<dyn Fn(&RunDetails) -> anyhow::Result<()> + Send + Sync>;

/// Asynchronous reporter; awaited after the run completes.
pub type AsyncReporter =
    Arc<dyn Fn(RunDetails) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Per-run parameters. Unset fields fall back to the global configuration.
///
/// Examples are full predicate inputs: for a property over a tuple of
/// arbitraries, each example is a JSON array with one element per
/// arbitrary.
#[derive(Clone, Default)]
pub struct Parameters {
    /// Seed of the random source.
    pub seed: Option<u64>,
    /// Number of random samples.
    pub num_runs: Option<u32>,
    /// Upper bound on shrink attempts.
    pub max_shrinks: Option<u32>,
    /// Report the first failure as is, without shrinking.
    pub end_on_failure: Option<bool>,
    /// Inputs checked before any random sample.
    pub examples: Option<Vec<Value>>,
    /// Custom reporter.
    pub reporter: Option<Reporter>,
    /// Custom asynchronous reporter.
    pub async_reporter: Option<AsyncReporter>,
    /// Stop sampling once this much time has elapsed.
    pub interrupt_after_time_limit: Option<Duration>,
    /// Treat an interrupted run as failed.
    pub mark_interrupt_as_failure: Option<bool>,
}

impl Parameters {
    /// Empty parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the number of random samples.
    pub fn with_num_runs(mut self, num_runs: u32) -> Self {
        self.num_runs = Some(num_runs);
        self
    }

    /// Bound the shrink phase.
    pub fn with_max_shrinks(mut self, max_shrinks: u32) -> Self {
        self.max_shrinks = Some(max_shrinks);
        self
    }

    /// Skip shrinking.
    pub fn with_end_on_failure(mut self, end_on_failure: bool) -> Self {
        self.end_on_failure = Some(end_on_failure);
        self
    }

    /// Inputs to check before random sampling.
    pub fn with_examples(mut self, examples: Vec<Value>) -> Self {
        self.examples = Some(examples);
        self
    }

    /// Replace the default reporter.
    pub fn with_reporter<F>(mut self, reporter: F) -> Self
    where
        F: Fn(&RunDetails) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Replace the default reporter with an asynchronous one.
    pub fn with_async_reporter<F, Fut>(mut self, reporter: F) -> Self
    where
        F: Fn(RunDetails) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.async_reporter = Some(Arc::new(move |details: RunDetails| reporter(details).boxed()));
        self
    }

    /// Stop sampling after `limit`.
    pub fn with_interrupt_after_time_limit(mut self, limit: Duration) -> Self {
        self.interrupt_after_time_limit = Some(limit);
        self
    }

    /// Count an interrupted run as a failure.
    pub fn with_mark_interrupt_as_failure(mut self, mark: bool) -> Self {
        self.mark_interrupt_as_failure = Some(mark);
        self
    }

    /// Whether a custom reporter of either kind is installed.
    pub fn has_custom_reporter(&self) -> bool {
        self.reporter.is_some() || self.async_reporter.is_some()
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameters")
            .field("seed", &self.seed)
            .field("num_runs", &self.num_runs)
            .field("max_shrinks", &self.max_shrinks)
            .field("end_on_failure", &self.end_on_failure)
            .field("examples", &self.examples)
            .field("reporter", &self.reporter.as_ref().map(|_| "<reporter>"))
            .field(
                "async_reporter",
                &self.async_reporter.as_ref().map(|_| "<async reporter>"),
            )
            .field("interrupt_after_time_limit", &self.interrupt_after_time_limit)
            .field("mark_interrupt_as_failure", &self.mark_interrupt_as_failure)
            .finish()
    }
}

/// Fully resolved settings of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub seed: u64,
    pub num_runs: u32,
    pub max_shrinks: u32,
    pub end_on_failure: bool,
    pub interrupt_after_time_limit: Option<Duration>,
    pub mark_interrupt_as_failure: bool,
}

impl Settings {
    /// Per-run values win over global ones; a missing seed is drawn at random.
    pub fn resolve(params: &Parameters, global: &GlobalParameters) -> Self {
        Self {
            seed: params
                .seed
                .or(global.seed)
                .unwrap_or_else(rand::random::<u64>),
            num_runs: params.num_runs.unwrap_or(global.num_runs),
            max_shrinks: params.max_shrinks.unwrap_or(global.max_shrinks),
            end_on_failure: params.end_on_failure.unwrap_or(global.end_on_failure),
            interrupt_after_time_limit: params
                .interrupt_after_time_limit
                .or(global.interrupt_after_time_limit_ms.map(Duration::from_millis)),
            mark_interrupt_as_failure: params
                .mark_interrupt_as_failure
                .unwrap_or(global.mark_interrupt_as_failure),
        }
    }

    /// The configuration reported back in run details: resolved values plus
    /// the caller's examples and reporters.
    pub fn to_parameters(&self, params: &Parameters) -> Parameters {
        Parameters {
            seed: Some(self.seed),
            num_runs: Some(self.num_runs),
            max_shrinks: Some(self.max_shrinks),
            end_on_failure: Some(self.end_on_failure),
            examples: params.examples.clone(),
            reporter: params.reporter.clone(),
            async_reporter: params.async_reporter.clone(),
            interrupt_after_time_limit: self.interrupt_after_time_limit,
            mark_interrupt_as_failure: Some(self.mark_interrupt_as_failure),
        }
    }
}
