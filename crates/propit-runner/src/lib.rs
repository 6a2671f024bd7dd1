//! Propit Runner
//!
//! A small in-process test runner. Declarators ([`TestFn`]) register tests
//! into a [`Suite`]; each declarator carries named slots for its variants
//! (`only`, `skip`, `todo`, `failing`), conditional factories (`if`,
//! `skipIf`, `todoIf`) and the `each` table helper.

pub mod callable;
pub mod error;
pub mod report;
pub mod suite;
pub mod table;

pub use callable::{Conditional, Invoke, Slot, TestBody, TestFn, TestOutcome};
pub use error::{Result, RunnerError, TestFailure};
pub use report::{TestReport, TestResult, TestStatus, TestSuite};
pub use suite::{Mode, Suite, DEFAULT_TIMEOUT};
pub use table::{format_title, RowBody, Rows, Table};
