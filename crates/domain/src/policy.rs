//! Configurable scheduling rules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::reservation::ReservationStatus;
use crate::text_enum::text_enum;

/// Which reservations hold space-time and stock against new requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldPolicy {
    /// Pending and approved reservations both block conflicting requests.
    #[default]
    Soft,
    /// Only approved reservations block; pending ones may overlap until
    /// one of them is approved.
    Hard,
}

text_enum!(HoldPolicy, "hold policy" {
    Soft => "soft",
    Hard => "hard",
});

impl HoldPolicy {
    /// Returns true if a reservation in `status` counts against the schedule.
    pub fn counts(&self, status: ReservationStatus) -> bool {
        match self {
            HoldPolicy::Soft => status.holds_resources(),
            HoldPolicy::Hard => status == ReservationStatus::Approved,
        }
    }
}

/// Input rules applied to submissions and amendments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionRules {
    pub min_motive_length: usize,
    pub reject_past_dates: bool,
}

impl Default for SubmissionRules {
    fn default() -> Self {
        Self {
            min_motive_length: 10,
            reject_past_dates: true,
        }
    }
}

impl SubmissionRules {
    /// Motive length is counted in characters after trimming whitespace.
    pub fn check_motive(&self, motive: &str) -> Result<(), ValidationError> {
        let actual = motive.trim().chars().count();
        if actual < self.min_motive_length {
            return Err(ValidationError::MotiveTooShort {
                min: self.min_motive_length,
                actual,
            });
        }
        Ok(())
    }

    pub fn check_date(&self, date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
        if self.reject_past_dates && date < today {
            return Err(ValidationError::DateInPast { date });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_hold_counts_pending_and_approved() {
        let policy = HoldPolicy::Soft;
        assert!(policy.counts(ReservationStatus::Pending));
        assert!(policy.counts(ReservationStatus::Approved));
        assert!(!policy.counts(ReservationStatus::Rejected));
        assert!(!policy.counts(ReservationStatus::Cancelled));
    }

    #[test]
    fn hard_hold_counts_only_approved() {
        let policy = HoldPolicy::Hard;
        assert!(!policy.counts(ReservationStatus::Pending));
        assert!(policy.counts(ReservationStatus::Approved));
        assert!(!policy.counts(ReservationStatus::Cancelled));
    }

    #[test]
    fn motive_minimum_counts_trimmed_characters() {
        let rules = SubmissionRules::default();
        assert!(rules.check_motive("Class on optics").is_ok());
        assert_eq!(
            rules.check_motive("   short   "),
            Err(ValidationError::MotiveTooShort { min: 10, actual: 5 })
        );
        // Multi-byte characters count once each.
        assert!(rules.check_motive("añoñañoñañ").is_ok());
    }

    #[test]
    fn past_dates_rejected_only_when_enabled() {
        let today: NaiveDate = "2025-11-10".parse().unwrap();
        let yesterday: NaiveDate = "2025-11-09".parse().unwrap();

        let strict = SubmissionRules::default();
        assert!(strict.check_date(today, today).is_ok());
        assert_eq!(
            strict.check_date(yesterday, today),
            Err(ValidationError::DateInPast { date: yesterday })
        );

        let lenient = SubmissionRules {
            reject_past_dates: false,
            ..SubmissionRules::default()
        };
        assert!(lenient.check_date(yesterday, today).is_ok());
    }
}
