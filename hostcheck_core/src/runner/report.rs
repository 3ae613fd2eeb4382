//! # Run report
//!
//! Aggregated result of one compliance run against one host, designed for
//! JSON serialization and CI consumption. Every assertion failure stays
//! individually attributable (suite + case name + both values).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CaseRecord, CaseSet, Outcome};

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every case passed (expected failures included)
    Compliant,
    /// At least one case failed or unexpectedly passed
    NonCompliant,
    /// At least one probe could not execute
    Error,
}

/// Where the suite ran from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerContext {
    pub hostname: String,
    pub os_info: String,
}

impl ScannerContext {
    pub fn from_system() -> Self {
        Self {
            hostname: hostname::get()
                .unwrap_or_else(|_| std::ffi::OsString::from("unknown"))
                .to_string_lossy()
                .to_string(),
            os_info: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }
}

/// Summary counters over all cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub errors: u32,
    pub expected_failures: u32,
    pub unexpected_passes: u32,
    pub pass_percentage: f32,
    pub status: RunStatus,
}

/// Complete result of one compliance run
#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier for this run
    pub run_id: String,

    /// Inventory role of the target host
    pub role: String,

    /// Connection target description
    pub target: String,

    /// Machine the suite executed from
    pub scanner: ScannerContext,

    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub duration_ms: u64,

    pub summary: Summary,
    pub cases: Vec<CaseRecord>,
}

impl RunReport {
    pub fn new(role: impl Into<String>, target: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            role: role.into(),
            target: target.into(),
            scanner: ScannerContext::from_system(),
            started: now,
            finished: now,
            duration_ms: 0,
            summary: Summary {
                total: 0,
                passed: 0,
                failed: 0,
                errors: 0,
                expected_failures: 0,
                unexpected_passes: 0,
                pass_percentage: 0.0,
                status: RunStatus::Error,
            },
            cases: Vec::new(),
        }
    }

    /// Absorb one suite's case set
    pub fn push_set(&mut self, set: CaseSet) {
        self.cases.extend(set.into_records());
    }

    /// Close out the run: compute timing and summary counters
    pub fn finalize(&mut self) {
        self.finished = Utc::now();
        self.duration_ms = (self.finished - self.started).num_milliseconds().max(0) as u64;

        let summary = &mut self.summary;
        summary.total = self.cases.len() as u32;
        summary.passed = count(&self.cases, Outcome::Pass);
        summary.failed = count(&self.cases, Outcome::Fail);
        summary.errors = count(&self.cases, Outcome::Error);
        summary.expected_failures = count(&self.cases, Outcome::ExpectedFail);
        summary.unexpected_passes = count(&self.cases, Outcome::UnexpectedPass);

        if summary.total > 0 {
            let passing = summary.passed + summary.expected_failures;
            summary.pass_percentage = (passing as f32 / summary.total as f32) * 100.0;
        }

        summary.status = if summary.errors > 0 {
            RunStatus::Error
        } else if summary.failed > 0 || summary.unexpected_passes > 0 {
            RunStatus::NonCompliant
        } else {
            RunStatus::Compliant
        };
    }

    /// Whether the run passed; drives the process exit code
    pub fn passed(&self) -> bool {
        matches!(self.summary.status, RunStatus::Compliant)
    }

    /// Cases that fail the run, for reporting
    pub fn failing_cases(&self) -> impl Iterator<Item = &CaseRecord> {
        self.cases.iter().filter(|c| c.outcome.is_failure())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn count(cases: &[CaseRecord], outcome: Outcome) -> u32 {
    cases.iter().filter(|c| c.outcome == outcome).count() as u32
}
