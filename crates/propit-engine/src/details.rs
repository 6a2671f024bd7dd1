//! Run details handed to reporters.

use serde::Serialize;
use serde_json::Value;

use crate::params::Parameters;

/// Status of one evaluated input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// The input satisfied the property.
    Success,
    /// The input falsified the property.
    Failure,
}

/// One evaluated input and the shrink attempts derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionTree {
    /// Outcome for `value`.
    pub status: ExecutionStatus,
    /// The input given to the predicate.
    pub value: Value,
    /// Shrink attempts tried from this input, in order.
    pub children: Vec<ExecutionTree>,
}

impl ExecutionTree {
    /// A node without children.
    pub fn leaf(status: ExecutionStatus, value: Value) -> Self {
        Self {
            status,
            value,
            children: Vec::new(),
        }
    }

    /// Total number of nodes in this subtree.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(ExecutionTree::len).sum::<usize>()
    }

    /// Always false: a tree holds at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Everything known about a finished run.
#[derive(Debug, Clone)]
pub struct RunDetails {
    /// Whether the property is considered failed.
    pub failed: bool,
    /// Whether sampling stopped on the time limit.
    pub interrupted: bool,
    /// Inputs evaluated before shrinking, examples included.
    pub num_runs: u32,
    /// Successful shrink steps.
    pub num_shrinks: u32,
    /// Seed of the run.
    pub seed: u64,
    /// Minimal failing input.
    pub counterexample: Option<Value>,
    /// Position of the counterexample in `execution_summary`, as
    /// `run:shrink:shrink...` indexes.
    pub counterexample_path: Option<String>,
    /// Failure message for the counterexample.
    pub error: Option<String>,
    /// Every failing input encountered, initial failure first.
    pub failures: Vec<Value>,
    /// Evaluated inputs; shrink attempts nest under the failure they came from.
    pub execution_summary: Vec<ExecutionTree>,
    /// The resolved configuration of the run.
    pub run_configuration: Parameters,
}

impl RunDetails {
    /// Whether the run succeeded.
    pub fn passed(&self) -> bool {
        !self.failed
    }
}
