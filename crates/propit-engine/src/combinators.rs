//! Tuple and record combinators.
//!
//! Both combine a list of component arbitraries into one generator and
//! shrink component by component: the first component is simplified until
//! it can go no further, then the next, and so on. `complicate` only ever
//! undoes the most recent simplification.

use indexmap::IndexMap;
use proptest::strategy::{NewTree, Strategy, ValueTree};
use proptest::test_runner::TestRunner;
use serde_json::Value;

use crate::arbitrary::Arbitrary;

#[derive(Debug, Clone)]
enum Layout {
    Tuple,
    Record(Vec<String>),
}

#[derive(Debug, Clone)]
struct CompositeStrategy {
    layout: Layout,
    parts: Vec<Arbitrary>,
}

impl Strategy for CompositeStrategy {
    type Tree = CompositeTree;
    type Value = Value;

    fn new_tree(&self, runner: &mut TestRunner) -> NewTree<Self> {
        let trees = self
            .parts
            .iter()
            .map(|part| part.new_tree(runner))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompositeTree {
            layout: self.layout.clone(),
            trees,
            shrinker: 0,
            prev_shrinker: None,
        })
    }
}

struct CompositeTree {
    layout: Layout,
    trees: Vec<Box<dyn ValueTree<Value = Value>>>,
    shrinker: usize,
    prev_shrinker: Option<usize>,
}

impl ValueTree for CompositeTree {
    type Value = Value;

    fn current(&self) -> Value {
        let values = self.trees.iter().map(|tree| tree.current());
        match &self.layout {
            Layout::Tuple => Value::Array(values.collect()),
            Layout::Record(keys) => Value::Object(keys.iter().cloned().zip(values).collect()),
        }
    }

    fn simplify(&mut self) -> bool {
        while self.shrinker < self.trees.len() {
            if self.trees[self.shrinker].simplify() {
                self.prev_shrinker = Some(self.shrinker);
                return true;
            }
            self.shrinker += 1;
        }
        false
    }

    fn complicate(&mut self) -> bool {
        match self.prev_shrinker {
            Some(index) if self.trees[index].complicate() => true,
            Some(_) => {
                self.prev_shrinker = None;
                false
            }
            None => false,
        }
    }
}

/// Combine arbitraries positionally; values are JSON arrays with one
/// element per component, in order.
pub fn tuple(parts: Vec<Arbitrary>) -> Arbitrary {
    let label = format!(
        "tuple({})",
        parts.iter().map(Arbitrary::label).collect::<Vec<_>>().join(", ")
    );
    Arbitrary::new(
        label,
        CompositeStrategy {
            layout: Layout::Tuple,
            parts,
        },
    )
}

/// Combine named arbitraries; values are JSON objects with the same field
/// names, in declaration order.
pub fn record(fields: IndexMap<String, Arbitrary>) -> Arbitrary {
    let keys: Vec<String> = fields.keys().cloned().collect();
    let label = format!("record({})", keys.join(", "));
    Arbitrary::new(
        label,
        CompositeStrategy {
            layout: Layout::Record(keys),
            parts: fields.into_values().collect(),
        },
    )
}
