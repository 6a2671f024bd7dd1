//! Enrichment: give every declarator reachable from a root its own `.prop`.
//!
//! The walk visits the named slots of a [`TestFn`]:
//!
//! * variants (`only`, `skip`, `todo`) are shallow-copied and given `.prop`;
//! * conditional variants (`if`, `skipIf`, `todoIf`) are wrapped so that
//!   every call decorates the declarator the factory returns;
//! * `each` is carried over as is;
//! * any other function-valued slot is enriched recursively, with its name
//!   added to the names already visited on the way down.
//!
//! A slot whose name was visited by an ancestor is left out. A declarator
//! with no eligible slot is returned unchanged.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use propit_engine::{Parameters, PropertyEngine};
use propit_runner::{Conditional, Slot, Table, TestBody, TestFn};
use tracing::debug;

use crate::error::{PropError, Result};
use crate::prop::{Arbitraries, PropFn, PropertyCase};

/// Slot names that get `.prop` directly.
pub const VARIANTS: [&str; 6] = ["only", "skip", "todo", "if", "skipIf", "todoIf"];

/// Slot name of the table helper.
pub const EACH: &str = "each";

/// A declarator after enrichment.
#[derive(Clone)]
pub enum EnrichedTest {
    /// Nothing to enrich; the original declarator.
    Plain(TestFn),
    /// A composite delegating to the original declarator.
    Enriched(Arc<Enriched>),
}

/// Delegate, capabilities and `.prop` of an enriched declarator.
pub struct Enriched {
    base: TestFn,
    capabilities: IndexMap<String, Capability>,
    prop: Option<PropFn>,
}

/// A named member of an enriched declarator.
#[derive(Clone)]
pub enum Capability {
    /// An enriched nested declarator or variant.
    Test(EnrichedTest),
    /// A conditional variant; decorates on every call.
    Conditional(EnrichedConditional),
    /// A slot carried over untouched.
    Raw(Slot),
}

/// A conditional factory whose results carry `.prop`.
#[derive(Clone)]
pub struct EnrichedConditional {
    factory: Conditional,
    engine: Arc<dyn PropertyEngine>,
}

impl EnrichedConditional {
    /// Call the original factory, then decorate its declarator.
    pub fn call(&self, condition: bool) -> EnrichedTest {
        decorate(self.factory.call(condition), &self.engine)
    }

    /// The original factory.
    pub fn factory(&self) -> &Conditional {
        &self.factory
    }
}

/// Enrich `test` and everything reachable from it.
pub fn build_test(test: &TestFn, engine: Arc<dyn PropertyEngine>) -> EnrichedTest {
    enrich(test, &engine, &HashSet::new())
}

fn enrich(test: &TestFn, engine: &Arc<dyn PropertyEngine>, ancestors: &HashSet<String>) -> EnrichedTest {
    let mut capabilities = IndexMap::new();
    let mut eligible = false;

    for (name, slot) in test.slots() {
        if ancestors.contains(name) {
            continue;
        }
        if !slot.is_function() {
            capabilities.insert(name.clone(), Capability::Raw(slot.clone()));
            continue;
        }
        eligible = true;

        let capability = if VARIANTS.contains(&name.as_str()) {
            match slot {
                Slot::Conditional(factory) => Capability::Conditional(EnrichedConditional {
                    factory: factory.clone(),
                    engine: engine.clone(),
                }),
                Slot::Callable(variant) => Capability::Test(decorate(variant.clone(), engine)),
                other => Capability::Raw(other.clone()),
            }
        } else if name == EACH {
            Capability::Raw(slot.clone())
        } else {
            match slot {
                Slot::Callable(nested) => {
                    let mut visited = ancestors.clone();
                    visited.insert(name.clone());
                    Capability::Test(enrich(nested, engine, &visited))
                }
                other => Capability::Raw(other.clone()),
            }
        };
        capabilities.insert(name.clone(), capability);
    }

    if !eligible {
        debug!(test = test.name(), "nothing to enrich");
        return EnrichedTest::Plain(test.clone());
    }

    let prop = test
        .slot(EACH)
        .map(|_| PropFn::new(test.clone(), engine.clone()));
    debug!(
        test = test.name(),
        capabilities = capabilities.len(),
        prop = prop.is_some(),
        "enriched declarator"
    );

    EnrichedTest::Enriched(Arc::new(Enriched {
        base: test.clone(),
        capabilities,
        prop,
    }))
}

/// Shallow copy with `.prop`: every slot carried over untouched.
fn decorate(test: TestFn, engine: &Arc<dyn PropertyEngine>) -> EnrichedTest {
    let capabilities = test
        .slots()
        .iter()
        .map(|(name, slot)| (name.clone(), Capability::Raw(slot.clone())))
        .collect();
    let prop = PropFn::new(test.clone(), engine.clone());
    EnrichedTest::Enriched(Arc::new(Enriched {
        base: test,
        capabilities,
        prop: Some(prop),
    }))
}

impl EnrichedTest {
    /// The declarator calls are delegated to.
    pub fn base(&self) -> &TestFn {
        match self {
            Self::Plain(test) => test,
            Self::Enriched(enriched) => &enriched.base,
        }
    }

    pub fn is_enriched(&self) -> bool {
        matches!(self, Self::Enriched(_))
    }

    /// Register a test exactly as the original declarator would.
    pub fn call(&self, name: &str, body: TestBody, timeout: Option<Duration>) {
        self.base().call(name, body, timeout)
    }

    /// A named member. Plain declarators expose their slots as raw
    /// capabilities.
    pub fn capability(&self, name: &str) -> Option<Capability> {
        match self {
            Self::Plain(test) => test.slot(name).cloned().map(Capability::Raw),
            Self::Enriched(enriched) => enriched.capabilities.get(name).cloned(),
        }
    }

    /// Names of every member, in order.
    pub fn capability_names(&self) -> Vec<String> {
        match self {
            Self::Plain(test) => test.slots().keys().cloned().collect(),
            Self::Enriched(enriched) => enriched.capabilities.keys().cloned().collect(),
        }
    }

    /// The `.prop` capability, if this declarator has one.
    pub fn prop_fn(&self) -> Option<&PropFn> {
        match self {
            Self::Plain(_) => None,
            Self::Enriched(enriched) => enriched.prop.as_ref(),
        }
    }

    /// `.prop(arbitraries, params)`.
    pub fn prop(&self, arbitraries: impl Into<Arbitraries>, params: Option<Parameters>) -> Result<PropertyCase> {
        self.prop_fn()
            .map(|prop| prop.call(arbitraries, params))
            .ok_or_else(|| PropError::missing("prop", "prop"))
    }

    /// A nested declarator or variant.
    pub fn nested(&self, name: &str) -> Result<EnrichedTest> {
        match self.capability(name) {
            Some(Capability::Test(test)) => Ok(test),
            _ => Err(PropError::missing(name, "test")),
        }
    }

    pub fn only(&self) -> Result<EnrichedTest> {
        self.nested("only")
    }

    pub fn skip(&self) -> Result<EnrichedTest> {
        self.nested("skip")
    }

    pub fn todo(&self) -> Result<EnrichedTest> {
        self.nested("todo")
    }

    pub fn failing(&self) -> Result<EnrichedTest> {
        self.nested("failing")
    }

    /// Call a conditional variant.
    pub fn conditional(&self, name: &str, condition: bool) -> Result<EnrichedTest> {
        match self.capability(name) {
            Some(Capability::Conditional(factory)) => Ok(factory.call(condition)),
            _ => Err(PropError::missing(name, "conditional")),
        }
    }

    /// `.if(condition)`
    pub fn run_if(&self, condition: bool) -> Result<EnrichedTest> {
        self.conditional("if", condition)
    }

    /// `.skipIf(condition)`
    pub fn skip_if(&self, condition: bool) -> Result<EnrichedTest> {
        self.conditional("skipIf", condition)
    }

    /// `.todoIf(condition)`
    pub fn todo_if(&self, condition: bool) -> Result<EnrichedTest> {
        self.conditional("todoIf", condition)
    }

    /// The `each` table helper.
    pub fn each(&self) -> Result<Table> {
        match self.capability(EACH) {
            Some(Capability::Raw(Slot::Table(table))) => Ok(table),
            _ => Err(PropError::missing(EACH, "table")),
        }
    }

    /// Whether both handles share the same enriched value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Plain(a), Self::Plain(b)) => a.ptr_eq(b),
            (Self::Enriched(a), Self::Enriched(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for EnrichedTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(test) => f.debug_tuple("Plain").field(test).finish(),
            Self::Enriched(enriched) => f
                .debug_struct("Enriched")
                .field("base", &enriched.base)
                .field("capabilities", &enriched.capabilities.keys().collect::<Vec<_>>())
                .field("prop", &enriched.prop.is_some())
                .finish(),
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Test(test) => f.debug_tuple("Test").field(test).finish(),
            Self::Conditional(_) => f.write_str("Conditional"),
            Self::Raw(slot) => f.debug_tuple("Raw").field(slot).finish(),
        }
    }
}
