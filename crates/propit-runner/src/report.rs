//! Test reports.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TestFailure;

/// Test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    Todo,
}

/// Individual test result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub classname: String,
    pub status: TestStatus,
    pub duration_ms: u64,
    pub message: Option<String>,
    /// Structured failure data, such as a property counterexample.
    pub detail: Option<Value>,
}

impl TestResult {
    fn with_status(name: &str, classname: &str, status: TestStatus, duration_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            classname: classname.to_string(),
            status,
            duration_ms,
            message: None,
            detail: None,
        }
    }

    pub fn passed(name: &str, classname: &str, duration_ms: u64) -> Self {
        Self::with_status(name, classname, TestStatus::Passed, duration_ms)
    }

    pub fn failed(name: &str, classname: &str, duration_ms: u64, failure: &TestFailure) -> Self {
        Self {
            message: Some(failure.to_string()),
            detail: failure.detail().cloned(),
            ..Self::with_status(name, classname, TestStatus::Failed, duration_ms)
        }
    }

    pub fn skipped(name: &str, classname: &str) -> Self {
        Self::with_status(name, classname, TestStatus::Skipped, 0)
    }

    pub fn todo(name: &str, classname: &str) -> Self {
        Self::with_status(name, classname, TestStatus::Todo, 0)
    }
}

/// Results sharing one describe path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite {
    pub name: String,
    pub tests: u32,
    pub failures: u32,
    pub skipped: u32,
    pub todo: u32,
    pub time_ms: u64,
    pub timestamp: String,
    pub test_cases: Vec<TestResult>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: 0,
            failures: 0,
            skipped: 0,
            todo: 0,
            time_ms: 0,
            timestamp: chrono::Utc::now().to_rfc3339(),
            test_cases: Vec::new(),
        }
    }

    /// Record one result
    pub fn add(&mut self, result: TestResult) {
        self.tests += 1;
        match result.status {
            TestStatus::Failed => self.failures += 1,
            TestStatus::Skipped => self.skipped += 1,
            TestStatus::Todo => self.todo += 1,
            TestStatus::Passed => {}
        }
        self.time_ms += result.duration_ms;
        self.test_cases.push(result);
    }
}

/// Full test report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub name: String,
    pub tests: u32,
    pub failures: u32,
    pub skipped: u32,
    pub todo: u32,
    pub time_ms: u64,
    pub suites: Vec<TestSuite>,
}

impl TestReport {
    /// Create a new empty report
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: 0,
            failures: 0,
            skipped: 0,
            todo: 0,
            time_ms: 0,
            suites: Vec::new(),
        }
    }

    /// Group results by classname, keeping first-seen order
    pub fn from_results(name: impl Into<String>, results: Vec<TestResult>) -> Self {
        let mut suites: IndexMap<String, TestSuite> = IndexMap::new();
        for result in results {
            suites
                .entry(result.classname.clone())
                .or_insert_with(|| TestSuite::new(result.classname.clone()))
                .add(result);
        }

        let mut report = Self::new(name);
        for suite in suites.into_values() {
            report.add_suite(suite);
        }
        report
    }

    /// Add a test suite
    pub fn add_suite(&mut self, suite: TestSuite) {
        self.tests += suite.tests;
        self.failures += suite.failures;
        self.skipped += suite.skipped;
        self.todo += suite.todo;
        self.time_ms += suite.time_ms;
        self.suites.push(suite);
    }

    pub fn passed(&self) -> u32 {
        self.tests - self.failures - self.skipped - self.todo
    }

    /// No failures
    pub fn is_success(&self) -> bool {
        self.failures == 0
    }

    /// Every result, in run order within each suite
    pub fn results(&self) -> impl Iterator<Item = &TestResult> {
        self.suites.iter().flat_map(|suite| suite.test_cases.iter())
    }

    /// First result with this test name
    pub fn result(&self, name: &str) -> Option<&TestResult> {
        self.results().find(|result| result.name == name)
    }
}
