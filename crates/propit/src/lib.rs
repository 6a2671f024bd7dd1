//! Propit
//!
//! Property-based tests on top of `test` / `it` declarators. Every
//! declarator reachable from the two entry points, variants and
//! conditional variants included, gains a `.prop`:
//!
//! ```no_run
//! use propit::fc;
//!
//! propit::test()
//!     .prop([fc::integer(0..=100), fc::integer(0..=100)], None)?
//!     .register(
//!         "addition commutes",
//!         fc::Predicate::new(|args: &serde_json::Value| {
//!             let (a, b) = (args[0].as_i64(), args[1].as_i64());
//!             a.zip(b).map(|(a, b)| a + b) == b.zip(a).map(|(b, a)| b + a)
//!         }),
//!         None,
//!     )?;
//!
//! let report = propit::run()?;
//! assert!(report.is_success());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod enrich;
pub mod error;
pub mod prop;
pub mod record;

use std::sync::Arc;

use once_cell::sync::Lazy;
use propit_engine::ProptestEngine;
use propit_runner::{Suite, TestReport};
use tracing_subscriber::EnvFilter;

pub use enrich::{build_test, Capability, EnrichedConditional, EnrichedTest, EACH, VARIANTS};
pub use error::{PropError, Result};
pub use prop::{Arbitraries, PropFn, PropertyCase};
pub use propit_engine as fc;
pub use propit_runner as runner;

static SUITE: Lazy<Suite> = Lazy::new(|| Suite::new("propit"));

static TEST: Lazy<EnrichedTest> =
    Lazy::new(|| build_test(&SUITE.test(), Arc::new(ProptestEngine::new())));

static IT: Lazy<EnrichedTest> =
    Lazy::new(|| build_test(&SUITE.it(), Arc::new(ProptestEngine::new())));

/// Initialize tracing for test runs
pub fn init() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,propit=debug"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .try_init()
            .ok();
    });

    Lazy::force(&INIT);
}

/// The process-wide suite behind [`test`] and [`it`].
pub fn suite() -> &'static Suite {
    &SUITE
}

/// The enriched `test` entry point.
pub fn test() -> &'static EnrichedTest {
    &TEST
}

/// The enriched `it` entry point.
pub fn it() -> &'static EnrichedTest {
    &IT
}

/// Scope registrations made by `f`.
pub fn describe<F: FnOnce()>(name: &str, f: F) {
    SUITE.describe(name, f)
}

/// Run every test registered through [`test`] and [`it`] so far.
pub fn run() -> std::result::Result<TestReport, runner::RunnerError> {
    SUITE.run()
}
