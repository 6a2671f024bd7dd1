//! Test declarators and their named slots.
//!
//! A [`TestFn`] is an invocation delegate plus an ordered map of named
//! [`Slot`]s. The delegate registers one test; the slots carry variants
//! (`only`, `skip`, ...), conditional factories (`if`, `skipIf`, ...), the
//! `each` table helper and plain values such as `name`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::TestFailure;
use crate::table::Table;

/// Outcome of a test body.
pub type TestOutcome = Result<(), TestFailure>;

/// Registers a named test body with an optional time budget.
pub type Invoke = Arc<dyn Fn(&str, TestBody, Option<Duration>) + Send + Sync>;

type BodyFn = Box<dyn FnOnce() -> LocalBoxFuture<'static, TestOutcome> + Send>;

/// A one-shot test body.
///
/// The body itself is `Send` so it can sit in a shared registry; the future
/// it produces is driven on the runner's current-thread runtime and need not
/// be.
pub struct TestBody {
    run: BodyFn,
}

impl TestBody {
    /// A synchronous body.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> TestOutcome + Send + 'static,
    {
        Self {
            run: Box::new(move || async move { f() }.boxed_local()),
        }
    }

    /// An asynchronous body.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = TestOutcome> + 'static,
    {
        Self {
            run: Box::new(move || f().boxed_local()),
        }
    }

    /// Start the body.
    pub fn into_future(self) -> LocalBoxFuture<'static, TestOutcome> {
        (self.run)()
    }
}

impl fmt::Debug for TestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TestBody")
    }
}

/// A conditional factory: `if(cond)`, `skipIf(cond)`, `todoIf(cond)`.
#[derive(Clone)]
pub struct Conditional {
    factory: Arc<dyn Fn(bool) -> TestFn + Send + Sync>,
}

impl Conditional {
    /// Wrap a factory.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(bool) -> TestFn + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// Build the declarator selected by `condition`.
    pub fn call(&self, condition: bool) -> TestFn {
        (self.factory)(condition)
    }

    /// Whether both handles share the same factory.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.factory, &other.factory)
    }
}

impl fmt::Debug for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Conditional")
    }
}

/// A named member of a declarator.
#[derive(Debug, Clone)]
pub enum Slot {
    /// A nested declarator, such as a variant.
    Callable(TestFn),
    /// A factory taking a condition.
    Conditional(Conditional),
    /// A data-table helper.
    Table(Table),
    /// A non-function value.
    Value(Value),
}

impl Slot {
    /// Everything except plain values is function-valued.
    pub fn is_function(&self) -> bool {
        !matches!(self, Self::Value(_))
    }

    /// Whether both slots hold the very same underlying object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Callable(a), Self::Callable(b)) => a.ptr_eq(b),
            (Self::Conditional(a), Self::Conditional(b)) => a.ptr_eq(b),
            (Self::Table(a), Self::Table(b)) => a.ptr_eq(b),
            (Self::Value(a), Self::Value(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Clone)]
struct Inner {
    name: String,
    invoke: Invoke,
    slots: IndexMap<String, Slot>,
}

/// A test declarator.
///
/// Cloning is cheap and keeps identity: clones compare equal under
/// [`TestFn::ptr_eq`].
#[derive(Clone)]
pub struct TestFn {
    inner: Arc<Inner>,
}

impl TestFn {
    /// A declarator with no slots.
    pub fn new<F>(name: impl Into<String>, invoke: F) -> Self
    where
        F: Fn(&str, TestBody, Option<Duration>) + Send + Sync + 'static,
    {
        Self::from_invoke(name, Arc::new(invoke))
    }

    /// A declarator with no slots around an existing delegate.
    pub fn from_invoke(name: impl Into<String>, invoke: Invoke) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                invoke,
                slots: IndexMap::new(),
            }),
        }
    }

    /// Add or replace a slot. Clones made earlier are unaffected.
    pub fn with_slot(self, name: impl Into<String>, slot: Slot) -> Self {
        let mut inner = Arc::try_unwrap(self.inner).unwrap_or_else(|shared| (*shared).clone());
        inner.slots.insert(name.into(), slot);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Diagnostic name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Register a test.
    pub fn call(&self, name: &str, body: TestBody, timeout: Option<Duration>) {
        (self.inner.invoke)(name, body, timeout)
    }

    /// The invocation delegate.
    pub fn invoker(&self) -> Invoke {
        self.inner.invoke.clone()
    }

    /// All slots, in declaration order.
    pub fn slots(&self) -> &IndexMap<String, Slot> {
        &self.inner.slots
    }

    /// One slot by name.
    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.inner.slots.get(name)
    }

    /// A nested declarator by slot name.
    pub fn callable(&self, name: &str) -> Option<&TestFn> {
        match self.slot(name)? {
            Slot::Callable(test) => Some(test),
            _ => None,
        }
    }

    /// Call the conditional factory under `name`.
    pub fn conditional(&self, name: &str, condition: bool) -> Option<TestFn> {
        match self.slot(name)? {
            Slot::Conditional(factory) => Some(factory.call(condition)),
            _ => None,
        }
    }

    /// The `each` table helper, if this declarator has one.
    pub fn each(&self) -> Option<&Table> {
        match self.slot("each")? {
            Slot::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Whether both handles share the same declarator.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for TestFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestFn")
            .field("name", &self.inner.name)
            .field("slots", &self.inner.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}
