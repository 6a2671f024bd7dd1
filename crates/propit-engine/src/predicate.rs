//! Predicates and their verdicts.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

/// Message used when a predicate returns `false`.
pub const RETURNED_FALSE: &str = "Property failed by returning false";

/// Outcome of evaluating a predicate on one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The sample satisfied the property.
    Pass,
    /// The sample falsified the property.
    Fail(String),
}

impl Verdict {
    /// Whether the sample falsified the property.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail(_))
    }
}

/// Conversion from predicate return values into a [`Verdict`].
pub trait IntoVerdict {
    /// Convert into a verdict.
    fn into_verdict(self) -> Verdict;
}

impl IntoVerdict for Verdict {
    fn into_verdict(self) -> Verdict {
        self
    }
}

impl IntoVerdict for bool {
    fn into_verdict(self) -> Verdict {
        if self {
            Verdict::Pass
        } else {
            Verdict::Fail(RETURNED_FALSE.to_string())
        }
    }
}

impl IntoVerdict for () {
    fn into_verdict(self) -> Verdict {
        Verdict::Pass
    }
}

impl<E: fmt::Display> IntoVerdict for Result<(), E> {
    fn into_verdict(self) -> Verdict {
        match self {
            Ok(()) => Verdict::Pass,
            Err(e) => Verdict::Fail(e.to_string()),
        }
    }
}

impl<E: fmt::Display> IntoVerdict for Result<bool, E> {
    fn into_verdict(self) -> Verdict {
        match self {
            Ok(holds) => holds.into_verdict(),
            Err(e) => Verdict::Fail(e.to_string()),
        }
    }
}

type SyncFn = dyn Fn(&Value) -> Verdict + Send + Sync;
type AsyncFn = dyn Fn(Value) -> BoxFuture<'static, Verdict> + Send + Sync;

#[derive(Clone)]
enum Kind {
    Sync(Arc<SyncFn>),
    Async(Arc<AsyncFn>),
}

/// The function checked against every generated sample.
///
/// A sample fails when the function returns `false` or an `Err`, panics, or
/// (for async predicates) resolves to one of those.
#[derive(Clone)]
pub struct Predicate {
    kind: Kind,
}

impl Predicate {
    /// A synchronous predicate.
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&Value) -> R + Send + Sync + 'static,
        R: IntoVerdict,
    {
        Self {
            kind: Kind::Sync(Arc::new(move |input: &Value| f(input).into_verdict())),
        }
    }

    /// An asynchronous predicate; each sample is awaited before the next one
    /// is generated.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoVerdict,
    {
        Self {
            kind: Kind::Async(Arc::new(move |input: Value| {
                let fut = f(input);
                async move { fut.await.into_verdict() }.boxed()
            })),
        }
    }

    /// Whether samples are evaluated asynchronously.
    pub fn is_async(&self) -> bool {
        matches!(self.kind, Kind::Async(_))
    }

    /// Adapt the input before it reaches this predicate.
    pub fn contramap<F>(self, adapt: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        let adapt = Arc::new(adapt);
        let kind = match self.kind {
            Kind::Sync(inner) => {
                Kind::Sync(Arc::new(move |input: &Value| inner(&adapt(input))) as Arc<SyncFn>)
            }
            Kind::Async(inner) => {
                Kind::Async(Arc::new(move |input: Value| inner(adapt(&input))) as Arc<AsyncFn>)
            }
        };
        Self { kind }
    }

    /// Evaluate the predicate on one sample. Panics become failing verdicts.
    pub async fn evaluate(&self, input: &Value) -> Verdict {
        match &self.kind {
            Kind::Sync(f) => panic::catch_unwind(AssertUnwindSafe(|| f(input)))
                .unwrap_or_else(|payload| Verdict::Fail(panic_message(payload.as_ref()))),
            Kind::Async(f) => {
                let fut = match panic::catch_unwind(AssertUnwindSafe(|| f(input.clone()))) {
                    Ok(fut) => fut,
                    Err(payload) => return Verdict::Fail(panic_message(payload.as_ref())),
                };
                AssertUnwindSafe(fut)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Verdict::Fail(panic_message(payload.as_ref())))
            }
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("async", &self.is_async())
            .finish()
    }
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "predicate panicked".to_string()
    }
}
