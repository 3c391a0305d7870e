//! Engine configuration.

use domain::{HoldPolicy, SubmissionRules};

/// Tunable engine behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Which reservations block new requests.
    pub hold_policy: HoldPolicy,

    /// Minimum motive length in characters.
    pub min_motive_length: usize,

    /// How many times a validate-then-commit cycle is attempted before a
    /// concurrency conflict is surfaced as a storage error.
    pub max_commit_attempts: u32,

    /// Refuse submissions and amendments dated before today.
    pub reject_past_dates: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hold_policy: HoldPolicy::Soft,
            min_motive_length: 10,
            max_commit_attempts: 3,
            reject_past_dates: true,
        }
    }
}

impl EngineConfig {
    pub fn with_hold_policy(mut self, policy: HoldPolicy) -> Self {
        self.hold_policy = policy;
        self
    }

    pub fn with_min_motive_length(mut self, length: usize) -> Self {
        self.min_motive_length = length;
        self
    }

    /// Values below 1 are treated as 1.
    pub fn with_max_commit_attempts(mut self, attempts: u32) -> Self {
        self.max_commit_attempts = attempts.max(1);
        self
    }

    pub fn with_reject_past_dates(mut self, reject: bool) -> Self {
        self.reject_past_dates = reject;
        self
    }

    pub fn submission_rules(&self) -> SubmissionRules {
        SubmissionRules {
            min_motive_length: self.min_motive_length,
            reject_past_dates: self.reject_past_dates,
        }
    }
}
