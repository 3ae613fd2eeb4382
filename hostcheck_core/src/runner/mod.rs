//! # Assertion runner
//!
//! Declarative case accounting for one suite: each parametrized case records
//! its own independent outcome; one failing case never aborts its siblings.
//! Probe execution failures are recorded as hard failures, never skips.

pub mod report;

use serde::{Deserialize, Serialize};

use crate::expect::{compare, Comparison, Expected};
use crate::probes::ProbeError;

/// Final disposition of one assertion case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Actual matched expected
    Pass,
    /// Actual did not match expected
    Fail,
    /// The probe itself could not run
    Error,
    /// A tracked regression failed, as recorded
    ExpectedFail,
    /// A tracked regression passed; flagged so silent fixes are noticed
    UnexpectedPass,
}

impl Outcome {
    /// Whether this outcome fails the run
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail | Self::Error | Self::UnexpectedPass)
    }
}

/// One assertion result with its diagnostic context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    pub suite: String,
    pub name: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    pub message: String,
}

/// A checked probe result ready for recording
#[derive(Debug, Clone)]
pub struct Checked {
    pub passed: bool,
    pub expected: String,
    pub actual: String,
}

impl Checked {
    pub fn new(passed: bool, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            passed,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Check a boolean condition, describing both sides for diagnosis
    pub fn is_true(
        condition: bool,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(condition, expected, actual)
    }
}

impl From<Comparison> for Checked {
    fn from(c: Comparison) -> Self {
        Self {
            passed: c.matched,
            expected: c.expected,
            actual: c.actual,
        }
    }
}

/// Collects the independent case records of one suite run
#[derive(Debug)]
pub struct CaseSet {
    suite: String,
    records: Vec<CaseRecord>,
}

impl CaseSet {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            records: Vec::new(),
        }
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn records(&self) -> &[CaseRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CaseRecord> {
        self.records
    }

    /// Record one checked result; probe errors become hard failures.
    pub fn record(&mut self, name: impl Into<String>, result: Result<Checked, ProbeError>) {
        let name = name.into();
        let record = match result {
            Ok(checked) => {
                let outcome = if checked.passed {
                    Outcome::Pass
                } else {
                    Outcome::Fail
                };
                let message = if checked.passed {
                    String::new()
                } else {
                    format!("expected {}, got {}", checked.expected, checked.actual)
                };
                CaseRecord {
                    suite: self.suite.clone(),
                    name,
                    outcome,
                    expected: Some(checked.expected),
                    actual: Some(checked.actual),
                    message,
                }
            }
            Err(e) => CaseRecord {
                suite: self.suite.clone(),
                name,
                outcome: Outcome::Error,
                expected: None,
                actual: None,
                message: format!("probe failed: {e}"),
            },
        };

        match record.outcome {
            Outcome::Pass => log::debug!("[{}] {} passed", record.suite, record.name),
            _ => log::warn!(
                "[{}] {} {:?}: {}",
                record.suite,
                record.name,
                record.outcome,
                record.message
            ),
        }
        self.records.push(record);
    }

    /// Record a probe whose value is compared to a declared expectation.
    pub fn record_cmp(
        &mut self,
        name: impl Into<String>,
        actual: Result<String, ProbeError>,
        expected: &Expected,
    ) {
        let result = actual.and_then(|value| {
            compare(&value, expected)
                .map(Checked::from)
                .map_err(ProbeError::from)
        });
        self.record(name, result);
    }

    /// Record a case with a known, tracked regression (strict expected
    /// failure): a failure is recorded as expected, but a pass is flagged as
    /// a failure so silent fixes do not go undetected.
    pub fn record_xfail(
        &mut self,
        name: impl Into<String>,
        reason: &str,
        result: Result<Checked, ProbeError>,
    ) {
        let name = name.into();
        let record = match result {
            Ok(checked) if checked.passed => CaseRecord {
                suite: self.suite.clone(),
                name,
                outcome: Outcome::UnexpectedPass,
                expected: Some(checked.expected),
                actual: Some(checked.actual),
                message: format!("unexpectedly passed (tracked regression: {reason})"),
            },
            Ok(checked) => CaseRecord {
                suite: self.suite.clone(),
                name,
                outcome: Outcome::ExpectedFail,
                expected: Some(checked.expected),
                actual: Some(checked.actual),
                message: format!("expected failure: {reason}"),
            },
            Err(e) => CaseRecord {
                suite: self.suite.clone(),
                name,
                outcome: Outcome::ExpectedFail,
                expected: None,
                actual: None,
                message: format!("expected failure: {reason} (probe: {e})"),
            },
        };
        self.records.push(record);
    }

    /// Record a probe error for a named case without running a comparison
    pub fn error(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.records.push(CaseRecord {
            suite: self.suite.clone(),
            name: name.into(),
            outcome: Outcome::Error,
            expected: None,
            actual: None,
            message: message.into(),
        });
    }

    /// Whether any case in this set fails the run
    pub fn failed(&self) -> bool {
        self.records.iter().any(|r| r.outcome.is_failure())
    }
}
