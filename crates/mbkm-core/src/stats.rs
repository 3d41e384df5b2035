//! # Aggregate Statistics
//!
//! Pure folds over registrations and logbook entries, built on the status
//! classifier and the completion scorer.
//!
//! Rates and averages are fixed-point integers ([`Tenths`], [`Hundredths`])
//! rounded half-up, so a fold over the same records always yields the same
//! bytes.

use crate::completion::Completion;
use crate::status::RegistrationStatus;
use crate::types::{Gender, LogbookEntry, Registrant, RegistrationId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// `round(numerator / denominator * scale)`, halves up. 0 when the
/// denominator is 0.
#[must_use]
pub fn scaled_ratio(numerator: u64, denominator: u64, scale: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    let doubled = numerator.saturating_mul(scale).saturating_mul(2);
    doubled.saturating_add(denominator) / denominator.saturating_mul(2)
}

// =============================================================================
// FIXED-POINT VALUES
// =============================================================================

/// A value with one decimal place, stored as tenths. `500` is `50.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tenths(pub u64);

/// A value with two decimal places, stored as hundredths. `6667` is `66.67`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hundredths(pub u64);

impl Tenths {
    /// `numerator / denominator` to one decimal place.
    #[must_use]
    pub fn ratio(numerator: u64, denominator: u64) -> Self {
        Self(scaled_ratio(numerator, denominator, 10))
    }

    /// `numerator / denominator * 100` to one decimal place.
    #[must_use]
    pub fn percent(numerator: u64, denominator: u64) -> Self {
        Self(scaled_ratio(numerator, denominator, 1000))
    }
}

impl Hundredths {
    /// `numerator / denominator * 100` to two decimal places.
    #[must_use]
    pub fn percent(numerator: u64, denominator: u64) -> Self {
        Self(scaled_ratio(numerator, denominator, 10_000))
    }
}

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

impl fmt::Display for Hundredths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// REGISTRATION STATISTICS
// =============================================================================

/// Counts over a set of registrants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationStats {
    pub total: usize,
    pub male: usize,
    pub female: usize,
    pub unknown_gender: usize,
    /// Distinct non-empty placements.
    pub partners: usize,
    pub awaiting_payment: usize,
    pub active: usize,
    pub awaiting_assessment: usize,
    pub completed: usize,
}

impl RegistrationStats {
    /// Fold a collection of registrants.
    pub fn fold<'a, I>(registrants: I) -> Self
    where
        I: IntoIterator<Item = &'a Registrant>,
    {
        let mut stats = Self::default();
        let mut placements: BTreeSet<&str> = BTreeSet::new();

        for registrant in registrants {
            stats.total += 1;
            match registrant.gender() {
                Gender::Male => stats.male += 1,
                Gender::Female => stats.female += 1,
                Gender::Unknown => stats.unknown_gender += 1,
            }
            if let Some(placement) = registrant.registration.placement.as_deref() {
                let placement = placement.trim();
                if !placement.is_empty() {
                    placements.insert(placement);
                }
            }
            match RegistrationStatus::classify(&registrant.registration) {
                RegistrationStatus::AwaitingPayment => stats.awaiting_payment += 1,
                RegistrationStatus::Active => stats.active += 1,
                RegistrationStatus::AwaitingAssessment => stats.awaiting_assessment += 1,
                RegistrationStatus::Completed => stats.completed += 1,
            }
        }

        stats.partners = placements.len();
        stats
    }

    /// Number of registrants carrying `status`.
    #[must_use]
    pub fn count(&self, status: RegistrationStatus) -> usize {
        match status {
            RegistrationStatus::AwaitingPayment => self.awaiting_payment,
            RegistrationStatus::Active => self.active,
            RegistrationStatus::AwaitingAssessment => self.awaiting_assessment,
            RegistrationStatus::Completed => self.completed,
        }
    }

    /// Share of completed registrants, in percent.
    #[must_use]
    pub fn completion_rate(&self) -> Hundredths {
        Hundredths::percent(self.completed as u64, self.total as u64)
    }

    /// Share of registrants past the payment step, in percent.
    #[must_use]
    pub fn payment_rate(&self) -> Hundredths {
        let paid = self.total.saturating_sub(self.awaiting_payment);
        Hundredths::percent(paid as u64, self.total as u64)
    }

    /// Headline numbers for the dashboard header.
    #[must_use]
    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            total: self.total,
            active: self.active,
            completed: self.completed,
            awaiting_payment: self.awaiting_payment,
            completion_rate: self.completion_rate(),
        }
    }

    /// Counts per status with completion and payment rates.
    #[must_use]
    pub fn breakdown(&self) -> StatusBreakdown {
        StatusBreakdown {
            total: self.total,
            awaiting_payment: self.awaiting_payment,
            active: self.active,
            awaiting_assessment: self.awaiting_assessment,
            completed: self.completed,
            completion_rate: self.completion_rate(),
            payment_rate: self.payment_rate(),
        }
    }
}

/// Registrant statistics page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub total: usize,
    pub awaiting_payment: usize,
    pub active: usize,
    pub awaiting_assessment: usize,
    pub completed: usize,
    pub completion_rate: Hundredths,
    pub payment_rate: Hundredths,
}

/// Headline numbers for the dashboard header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub awaiting_payment: usize,
    pub completion_rate: Hundredths,
}

/// Registrations per activity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTypeSummary {
    /// Raw activity code; empty when the registration has none.
    pub code: String,
    pub total: usize,
    /// Registrations past the payment step.
    pub paid: usize,
    pub completed: usize,
}

/// Group registrants by activity code, ordered by code.
pub fn activity_type_summaries<'a, I>(registrants: I) -> Vec<ActivityTypeSummary>
where
    I: IntoIterator<Item = &'a Registrant>,
{
    let mut groups: BTreeMap<String, ActivityTypeSummary> = BTreeMap::new();
    for registrant in registrants {
        let code = registrant
            .registration
            .activity_type
            .clone()
            .unwrap_or_default();
        let entry = groups
            .entry(code.clone())
            .or_insert_with(|| ActivityTypeSummary {
                code,
                ..ActivityTypeSummary::default()
            });
        entry.total += 1;
        match RegistrationStatus::classify(&registrant.registration) {
            RegistrationStatus::AwaitingPayment => {}
            RegistrationStatus::Completed => {
                entry.paid += 1;
                entry.completed += 1;
            }
            _ => entry.paid += 1,
        }
    }
    groups.into_values().collect()
}

// =============================================================================
// LOGBOOK STATISTICS
// =============================================================================

/// Completion statistics over one registration's logbook entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogbookStats {
    pub total: usize,
    /// Entries at 100%.
    pub completed: usize,
    /// Entries strictly between 0% and 100%.
    pub partial: usize,
    /// Entries at 0%.
    pub incomplete: usize,
    /// Mean completion percentage.
    pub average_completion: Tenths,
    /// Share of complete entries, in percent.
    pub completion_rate: Tenths,
    /// Distinct week numbers among the entries.
    pub weeks_covered: usize,
    /// Latest activity date. Entries without a date are ignored.
    pub latest_entry: Option<NaiveDate>,
}

impl LogbookStats {
    pub fn fold<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a LogbookEntry>,
    {
        let mut stats = Self::default();
        let mut percentage_sum: u64 = 0;
        let mut weeks: BTreeSet<u32> = BTreeSet::new();

        for entry in entries {
            let completion = Completion::of(entry);
            stats.total += 1;
            percentage_sum += completion.percentage as u64;
            if completion.is_complete() {
                stats.completed += 1;
            } else if completion.is_partial() {
                stats.partial += 1;
            } else {
                stats.incomplete += 1;
            }
            if let Some(week) = entry.week {
                weeks.insert(week);
            }
            if entry.activity_date > stats.latest_entry {
                stats.latest_entry = entry.activity_date;
            }
        }

        stats.average_completion = Tenths::ratio(percentage_sum, stats.total as u64);
        stats.completion_rate = Tenths::percent(stats.completed as u64, stats.total as u64);
        stats.weeks_covered = weeks.len();
        stats
    }
}

/// Logbook statistics across all registrations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalLogbookStats {
    pub total_logbooks: usize,
    /// Registrations with at least one entry.
    pub total_students: usize,
    pub average_entries_per_student: Tenths,
    pub completed_logbooks: usize,
    pub completion_rate: Tenths,
    pub latest_entry_date: Option<NaiveDate>,
    pub total_weeks_covered: usize,
}

impl GlobalLogbookStats {
    pub fn fold<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a LogbookEntry>,
    {
        let mut stats = Self::default();
        let mut registrations: BTreeSet<RegistrationId> = BTreeSet::new();
        let mut weeks: BTreeSet<u32> = BTreeSet::new();

        for entry in entries {
            stats.total_logbooks += 1;
            registrations.insert(entry.registration_id);
            if Completion::of(entry).is_complete() {
                stats.completed_logbooks += 1;
            }
            if let Some(week) = entry.week {
                weeks.insert(week);
            }
            if entry.activity_date > stats.latest_entry_date {
                stats.latest_entry_date = entry.activity_date;
            }
        }

        stats.total_students = registrations.len();
        stats.average_entries_per_student =
            Tenths::ratio(stats.total_logbooks as u64, stats.total_students as u64);
        stats.completion_rate =
            Tenths::percent(stats.completed_logbooks as u64, stats.total_logbooks as u64);
        stats.total_weeks_covered = weeks.len();
        stats
    }
}

// =============================================================================
// TESTS
// =============================================================================
