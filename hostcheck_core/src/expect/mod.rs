//! # Expectations
//!
//! An `Expected` value is pure data declared alongside a probe; `compare`
//! evaluates one probe result against it and keeps both sides for the
//! diagnostic record. Exact-set assertions are expressed as membership per
//! element plus a total count match, which catches both missing and
//! unexpectedly-added entries.

pub mod extract;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The declared correct outcome of a probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expected {
    /// Exact string equality (after trailing-newline trim)
    Exact(String),
    /// Substring membership
    Contains(String),
    /// Regex match anywhere in the value (multi-line aware)
    Regex(String),
    /// The value parses as an integer equal to this count
    Count(usize),
    /// Typed integer equality
    Int(i64),
    /// The value parses as an integer >= this bound
    AtLeast(i64),
}

impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "== {s:?}"),
            Self::Contains(s) => write!(f, "contains {s:?}"),
            Self::Regex(s) => write!(f, "matches /{s}/"),
            Self::Count(n) => write!(f, "count == {n}"),
            Self::Int(n) => write!(f, "== {n}"),
            Self::AtLeast(n) => write!(f, ">= {n}"),
        }
    }
}

/// Outcome of comparing one actual value to one expectation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub matched: bool,
    pub expected: String,
    pub actual: String,
}

/// Compare an actual probe value against an expectation.
///
/// Returns `Err` only when the expectation itself is malformed (bad regex);
/// a value that fails to parse for a numeric mode is a non-match, with the
/// raw value preserved for diagnosis.
pub fn compare(actual: &str, expected: &Expected) -> Result<Comparison, regex::Error> {
    let actual_norm = actual.trim_end_matches('\n');
    let matched = match expected {
        Expected::Exact(want) => actual_norm == want,
        Expected::Contains(want) => actual_norm.contains(want.as_str()),
        Expected::Regex(pattern) => {
            let re = Regex::new(&format!("(?m){pattern}"))?;
            re.is_match(actual_norm)
        }
        Expected::Count(want) => actual_norm
            .trim()
            .parse::<usize>()
            .is_ok_and(|n| n == *want),
        Expected::Int(want) => actual_norm.trim().parse::<i64>().is_ok_and(|n| n == *want),
        Expected::AtLeast(bound) => actual_norm
            .trim()
            .parse::<i64>()
            .is_ok_and(|n| n >= *bound),
    };

    Ok(Comparison {
        matched,
        expected: expected.to_string(),
        actual: actual_norm.to_string(),
    })
}
