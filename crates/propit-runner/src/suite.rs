//! The in-process test registry.
//!
//! A [`Suite`] collects registrations from the declarators it hands out and
//! runs them in registration order, one at a time.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::callable::{Conditional, Invoke, Slot, TestBody, TestFn, TestOutcome};
use crate::error::{Result, TestFailure};
use crate::report::{TestReport, TestResult};
use crate::table::Table;

/// Time budget for tests registered without one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How a registered test takes part in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Runs normally.
    Run,
    /// Runs; every non-`Only` test in the suite is skipped.
    Only,
    /// Reported as skipped, never executed.
    Skip,
    /// Reported as todo, never executed.
    Todo,
    /// Runs and passes only if its body fails.
    Failing,
}

struct Registration {
    name: String,
    classname: String,
    mode: Mode,
    body: TestBody,
    timeout: Option<Duration>,
}

#[derive(Default)]
struct State {
    registrations: Vec<Registration>,
    scope: Vec<String>,
}

struct Inner {
    name: String,
    default_timeout: Duration,
    state: Mutex<State>,
}

/// Pops the innermost describe scope, also when the scope body panics.
struct ScopeGuard<'a>(&'a Suite);

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.0.inner.state.lock().scope.pop();
    }
}

/// A registry of tests.
#[derive(Clone)]
pub struct Suite {
    inner: Arc<Inner>,
}

impl Suite {
    /// An empty suite with the default time budget.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_timeout(name, DEFAULT_TIMEOUT)
    }

    /// An empty suite with a custom default time budget.
    pub fn with_timeout(name: impl Into<String>, default_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                default_timeout,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Record a test under the current describe scope.
    pub fn register(&self, mode: Mode, name: &str, body: TestBody, timeout: Option<Duration>) {
        let mut state = self.inner.state.lock();
        let classname = std::iter::once(self.inner.name.as_str())
            .chain(state.scope.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" > ");
        debug!(test = name, ?mode, %classname, "registered test");
        state.registrations.push(Registration {
            name: name.to_string(),
            classname,
            mode,
            body,
            timeout,
        });
    }

    /// A delegate registering tests with `mode`.
    pub fn invoker(&self, mode: Mode) -> Invoke {
        let suite = self.clone();
        Arc::new(move |name: &str, body: TestBody, timeout: Option<Duration>| {
            suite.register(mode, name, body, timeout)
        })
    }

    /// A table helper registering tests with `mode`.
    pub fn table(&self, mode: Mode) -> Table {
        Table::new(self.invoker(mode))
    }

    /// Scope every registration made by `f` under `name`.
    pub fn describe<F: FnOnce()>(&self, name: &str, f: F) {
        self.inner.state.lock().scope.push(name.to_string());
        let _scope = ScopeGuard(self);
        f();
    }

    /// Number of tests waiting to run.
    pub fn len(&self) -> usize {
        self.inner.state.lock().registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `test` declarator.
    pub fn test(&self) -> TestFn {
        self.declarator("test")
    }

    /// The `it` declarator; same shape as [`Suite::test`].
    pub fn it(&self) -> TestFn {
        self.declarator("it")
    }

    fn declarator(&self, name: &str) -> TestFn {
        let mut root = TestFn::from_invoke(name, self.invoker(Mode::Run));
        for (slot, mode) in [
            ("only", Mode::Only),
            ("skip", Mode::Skip),
            ("todo", Mode::Todo),
            ("failing", Mode::Failing),
        ] {
            let variant = self.variant(format!("{name}.{slot}"), mode);
            root = root.with_slot(slot, Slot::Callable(variant));
        }

        root.with_slot(
            "if",
            self.conditional(name, "if", |c| if c { Mode::Run } else { Mode::Skip }),
        )
        .with_slot(
            "skipIf",
            self.conditional(name, "skipIf", |c| if c { Mode::Skip } else { Mode::Run }),
        )
        .with_slot(
            "todoIf",
            self.conditional(name, "todoIf", |c| if c { Mode::Todo } else { Mode::Run }),
        )
        .with_slot("each", Slot::Table(self.table(Mode::Run)))
        .with_slot("name", Slot::Value(json!(name)))
        .with_slot("length", Slot::Value(json!(3)))
    }

    fn variant(&self, name: String, mode: Mode) -> TestFn {
        TestFn::from_invoke(name, self.invoker(mode)).with_slot("each", Slot::Table(self.table(mode)))
    }

    fn conditional(&self, name: &str, slot: &str, select: fn(bool) -> Mode) -> Slot {
        let suite = self.clone();
        let prefix = format!("{name}.{slot}");
        Slot::Conditional(Conditional::new(move |condition| {
            suite.variant(format!("{prefix}({condition})"), select(condition))
        }))
    }

    /// Run every pending test on a fresh current-thread runtime.
    ///
    /// Must not be called from within an async context; use
    /// [`Suite::run_async`] there.
    pub fn run(&self) -> Result<TestReport> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.run_async()))
    }

    /// Run every pending test, in registration order. Pending tests are
    /// consumed; a second run only sees tests registered since.
    pub async fn run_async(&self) -> TestReport {
        let registrations = std::mem::take(&mut self.inner.state.lock().registrations);
        let focused = registrations.iter().any(|r| r.mode == Mode::Only);
        info!(suite = %self.inner.name, tests = registrations.len(), focused, "running suite");

        let mut results = Vec::with_capacity(registrations.len());
        for registration in registrations {
            results.push(self.execute(registration, focused).await);
        }

        let report = TestReport::from_results(self.inner.name.clone(), results);
        info!(
            suite = %self.inner.name,
            passed = report.passed(),
            failed = report.failures,
            skipped = report.skipped,
            todo = report.todo,
            "suite finished"
        );
        report
    }

    async fn execute(&self, registration: Registration, focused: bool) -> TestResult {
        let Registration {
            name,
            classname,
            mode,
            body,
            timeout,
        } = registration;

        let mode = if focused && mode != Mode::Only {
            Mode::Skip
        } else {
            mode
        };

        match mode {
            Mode::Skip => {
                debug!(test = %name, "skipped");
                return TestResult::skipped(&name, &classname);
            }
            Mode::Todo => {
                debug!(test = %name, "todo");
                return TestResult::todo(&name, &classname);
            }
            Mode::Run | Mode::Only | Mode::Failing => {}
        }

        let limit = timeout.unwrap_or(self.inner.default_timeout);
        let started = Instant::now();
        let mut outcome = run_body(body, limit).await;
        if mode == Mode::Failing {
            outcome = match outcome {
                Ok(()) => Err(TestFailure::UnexpectedPass),
                Err(_) => Ok(()),
            };
        }
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                info!(test = %name, duration_ms, "passed");
                TestResult::passed(&name, &classname, duration_ms)
            }
            Err(failure) => {
                warn!(test = %name, duration_ms, error = %failure, "failed");
                TestResult::failed(&name, &classname, duration_ms, &failure)
            }
        }
    }
}

async fn run_body(body: TestBody, limit: Duration) -> TestOutcome {
    let guarded = AssertUnwindSafe(async move { body.into_future().await }).catch_unwind();
    match tokio::time::timeout(limit, guarded).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(payload)) => Err(TestFailure::Panic(panic_message(payload.as_ref()))),
        Err(_) => Err(TestFailure::Timeout(limit)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
