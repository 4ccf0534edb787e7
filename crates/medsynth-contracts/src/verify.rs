//! Dataset verification report types.
//!
//! The verifier runs every consistency rule over a generated dataset and
//! collects all failures before returning, so one report shows the full
//! picture.

use serde::{Deserialize, Serialize};

/// The result of running all rules against a dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// True only if every rule passed.
    pub passed: bool,
    /// Identifiers of the rules that ran, in evaluation order.
    pub rules_run: Vec<String>,
    /// All failures collected during this run. Empty on pass.
    pub failures: Vec<VerificationFailure>,
}

impl VerificationReport {
    /// Failures reported by one rule.
    pub fn failures_for<'a>(&'a self, rule_id: &'a str) -> impl Iterator<Item = &'a VerificationFailure> {
        self.failures.iter().filter(move |f| f.rule_id == rule_id)
    }
}

/// A single rule failure within a `VerificationReport`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFailure {
    /// The id of the rule that failed.
    pub rule_id: String,
    /// Human-readable explanation, naming the offending record.
    pub message: String,
}
