//! Tax standing of an apartment, derived from its unpaid invoices.
//!
//! The resolver is pure: it reads the invoice list and the clock, never
//! mutates, and is the single authority the engines and direct actions use
//! to decide what an apartment may do.

use crate::apartment::InvoiceLedger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;


/// Escalation stage, ordered by severity
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxStatus {
    Active,
    /// Income accrual suspended; still owned and enterable
    Overdue,
    /// Everything frozen except payment
    Inactive,
    /// Reclaimed on the next tax tick
    Repossession,
}

impl TaxStatus {
    pub fn accrues_income(self) -> bool {
        self == TaxStatus::Active
    }

    pub fn is_frozen(self) -> bool {
        self >= TaxStatus::Inactive
    }

    /// Teleport, sale and rating
    pub fn allows_interaction(self) -> bool {
        !self.is_frozen()
    }
}

impl fmt::Display for TaxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaxStatus::Active => "ACTIVE",
            TaxStatus::Overdue => "OVERDUE",
            TaxStatus::Inactive => "INACTIVE",
            TaxStatus::Repossession => "REPOSSESSION",
        };
        f.write_str(name)
    }
}

/// Day-count boundaries between stages.
///
/// An unpaid invoice aged `d` whole days is:
/// - ACTIVE while `d <= overdue_days`
/// - OVERDUE while `overdue_days < d < inactive_days`
/// - INACTIVE while `inactive_days <= d < repossess_days`
/// - REPOSSESSION once `d >= repossess_days`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusThresholds {
    #[serde(default = "default_overdue_days")]
    pub overdue_days: i64,
    #[serde(default = "default_inactive_days")]
    pub inactive_days: i64,
    #[serde(default = "default_repossess_days")]
    pub repossess_days: i64,
}

fn default_overdue_days() -> i64 {
    0
}

fn default_inactive_days() -> i64 {
    3
}

fn default_repossess_days() -> i64 {
    5
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            overdue_days: default_overdue_days(),
            inactive_days: default_inactive_days(),
            repossess_days: default_repossess_days(),
        }
    }
}

impl StatusThresholds {
    pub fn new(overdue_days: i64, inactive_days: i64, repossess_days: i64) -> Result<Self, ThresholdError> {
        let thresholds = Self {
            overdue_days,
            inactive_days,
            repossess_days,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Thresholds must be non-negative and strictly increasing
    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.overdue_days < 0 {
            return Err(ThresholdError::Negative(self.overdue_days));
        }
        if self.overdue_days >= self.inactive_days || self.inactive_days >= self.repossess_days {
            return Err(ThresholdError::NotIncreasing {
                overdue: self.overdue_days,
                inactive: self.inactive_days,
                repossess: self.repossess_days,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdError {
    Negative(i64),
    NotIncreasing {
        overdue: i64,
        inactive: i64,
        repossess: i64,
    },
}

impl fmt::Display for ThresholdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdError::Negative(days) => {
                write!(f, "status thresholds must be non-negative, got {}", days)
            }
            ThresholdError::NotIncreasing {
                overdue,
                inactive,
                repossess,
            } => write!(
                f,
                "status thresholds must satisfy overdue < inactive < repossess, got {} / {} / {}",
                overdue, inactive, repossess
            ),
        }
    }
}

impl std::error::Error for ThresholdError {}

/// Maps (now, invoices) to a [`TaxStatus`]
#[derive(Clone, Copy, Debug, Default)]
pub struct StatusResolver {
    thresholds: StatusThresholds,
}

impl StatusResolver {
    pub fn new(thresholds: StatusThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> StatusThresholds {
        self.thresholds
    }

    pub fn resolve(&self, now: DateTime<Utc>, invoices: &InvoiceLedger) -> TaxStatus {
        match Self::oldest_unpaid_age_days(now, invoices) {
            None => TaxStatus::Active,
            Some(age) => self.classify(age),
        }
    }

    /// Stage for an unpaid invoice that is `age_days` whole days old
    pub fn classify(&self, age_days: i64) -> TaxStatus {
        let t = &self.thresholds;
        if age_days >= t.repossess_days {
            TaxStatus::Repossession
        } else if age_days >= t.inactive_days {
            TaxStatus::Inactive
        } else if age_days > t.overdue_days {
            TaxStatus::Overdue
        } else {
            TaxStatus::Active
        }
    }

    /// Age in whole days of the oldest unpaid invoice; None if nothing is unpaid.
    /// Invoices dated in the future count as age 0.
    pub fn oldest_unpaid_age_days(now: DateTime<Utc>, invoices: &InvoiceLedger) -> Option<i64> {
        invoices
            .unpaid()
            .map(|i| (now - i.created_at()).num_days().max(0))
            .max()
    }
}
