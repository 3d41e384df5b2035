//! # Logbook Completion
//!
//! Scores a logbook entry on its four free-text fields and assigns the week
//! number of new entries. Every list row, detail page, statistic and export
//! reads completion from [`Completion::of`].
//!
//! Percentages are integers. With four fields the only reachable values are
//! 0, 25, 50, 75 and 100, and the label thresholds sit exactly on those
//! steps.

use crate::primitives::{COMPLETION_FIELD_COUNT, SUMMARY_MAX_CHARS};
use crate::status::Severity;
use crate::types::LogbookEntry;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `true` when the field holds something other than whitespace.
#[inline]
#[must_use]
pub fn is_filled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// `round(filled / total * 100)` with halves rounded up, in integers.
///
/// Returns 0 when `total` is 0.
#[must_use]
pub fn percentage_of(filled: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let filled = filled.min(total) as u64;
    let total = total as u64;
    ((filled * 200 + total) / (2 * total)) as u32
}

// =============================================================================
// COMPLETION STATUS
// =============================================================================

/// Completion label, derived from the percentage alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Incomplete,
    Partial,
    NearlyComplete,
    Complete,
}

impl CompletionStatus {
    /// Thresholds, evaluated top-down: 100, 75, 50.
    #[must_use]
    pub fn from_percentage(percentage: u32) -> Self {
        if percentage >= 100 {
            CompletionStatus::Complete
        } else if percentage >= 75 {
            CompletionStatus::NearlyComplete
        } else if percentage >= 50 {
            CompletionStatus::Partial
        } else {
            CompletionStatus::Incomplete
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            CompletionStatus::Complete => "Complete",
            CompletionStatus::NearlyComplete => "Nearly Complete",
            CompletionStatus::Partial => "Partial",
            CompletionStatus::Incomplete => "Incomplete",
        }
    }

    /// Badge tag for logbook rows.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            CompletionStatus::Complete => Severity::Success,
            CompletionStatus::NearlyComplete => Severity::Warning,
            CompletionStatus::Partial => Severity::Info,
            CompletionStatus::Incomplete => Severity::Danger,
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// COMPLETION
// =============================================================================

/// Completion of one logbook entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Number of filled fields, `0..=4`.
    pub filled: u32,
    /// Integer percentage, one of 0/25/50/75/100.
    pub percentage: u32,
    pub status: CompletionStatus,
}

impl Completion {
    /// Score from the four raw fields.
    #[must_use]
    pub fn from_fields(
        activity_name: Option<&str>,
        objective: Option<&str>,
        notes: Option<&str>,
        conclusion: Option<&str>,
    ) -> Self {
        let filled = [activity_name, objective, notes, conclusion]
            .into_iter()
            .filter(|f| is_filled(*f))
            .count() as u32;
        let percentage = percentage_of(filled, COMPLETION_FIELD_COUNT);
        Self {
            filled,
            percentage,
            status: CompletionStatus::from_percentage(percentage),
        }
    }

    /// Score a logbook entry. Week and dates are ignored.
    #[must_use]
    pub fn of(entry: &LogbookEntry) -> Self {
        Self::from_fields(
            entry.activity_name.as_deref(),
            entry.objective.as_deref(),
            entry.notes.as_deref(),
            entry.conclusion.as_deref(),
        )
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.percentage >= 100
    }

    /// Some but not all fields filled.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.percentage > 0 && self.percentage < 100
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.percentage == 0
    }
}

// =============================================================================
// WEEK ASSIGNMENT
// =============================================================================

/// Week number of an entry whose submitter left the week unset.
///
/// Whole elapsed weeks between the registration date and the activity date,
/// plus one. Activities dated before the registration land in week 1.
#[must_use]
pub fn assign_week(registered_at: NaiveDateTime, activity_date: NaiveDate) -> u32 {
    let days = activity_date
        .signed_duration_since(registered_at.date())
        .num_days();
    if days <= 0 {
        return 1;
    }
    u32::try_from(days / 7)
        .unwrap_or(u32::MAX)
        .saturating_add(1)
}

// =============================================================================
// TEXT FORMATTING
// =============================================================================

/// Trim and upper-case the first character. Applied to activity names and
/// objectives on write.
#[must_use]
pub fn capitalize_first(value: &str) -> String {
    let trimmed = value.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// First characters of the activity name, or a placeholder.
#[must_use]
pub fn activity_summary(activity_name: Option<&str>) -> String {
    match activity_name {
        Some(name) if !name.trim().is_empty() => {
            if name.chars().count() > SUMMARY_MAX_CHARS {
                let head: String = name.chars().take(SUMMARY_MAX_CHARS).collect();
                format!("{}...", head)
            } else {
                name.to_string()
            }
        }
        _ => "No activity recorded".to_string(),
    }
}

/// "Week N", or "-" for entries without a week.
#[must_use]
pub fn week_name(week: Option<u32>) -> String {
    match week {
        Some(w) => format!("Week {}", w),
        None => "-".to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(8, 30, 0))
            .expect("valid datetime")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn quantized_percentages() {
        assert_eq!(percentage_of(0, 4), 0);
        assert_eq!(percentage_of(1, 4), 25);
        assert_eq!(percentage_of(2, 4), 50);
        assert_eq!(percentage_of(3, 4), 75);
        assert_eq!(percentage_of(4, 4), 100);
    }

    #[test]
    fn percentage_rounds_half_up() {
        // 1/3 = 33.33, 2/3 = 66.67, 1/8 = 12.5
        assert_eq!(percentage_of(1, 3), 33);
        assert_eq!(percentage_of(2, 3), 67);
        assert_eq!(percentage_of(1, 8), 13);
        assert_eq!(percentage_of(1, 0), 0);
    }

    #[test]
    fn thresholds() {
        assert_eq!(CompletionStatus::from_percentage(100), CompletionStatus::Complete);
        assert_eq!(
            CompletionStatus::from_percentage(75),
            CompletionStatus::NearlyComplete
        );
        assert_eq!(CompletionStatus::from_percentage(50), CompletionStatus::Partial);
        assert_eq!(CompletionStatus::from_percentage(25), CompletionStatus::Incomplete);
        assert_eq!(CompletionStatus::from_percentage(0), CompletionStatus::Incomplete);
    }

    #[test]
    fn whitespace_counts_as_empty() {
        let c = Completion::from_fields(Some("Rapat"), Some("   "), Some(""), None);
        assert_eq!(c.filled, 1);
        assert_eq!(c.percentage, 25);
        assert_eq!(c.status, CompletionStatus::Incomplete);
    }

    #[test]
    fn week_assignment() {
        let registered = datetime(2024, 8, 1);
        assert_eq!(assign_week(registered, date(2024, 8, 1)), 1);
        assert_eq!(assign_week(registered, date(2024, 8, 7)), 1);
        assert_eq!(assign_week(registered, date(2024, 8, 8)), 2);
        assert_eq!(assign_week(registered, date(2024, 9, 1)), 5);
        assert_eq!(assign_week(registered, date(2024, 7, 1)), 1);
    }

    #[test]
    fn capitalize_trims_and_uppercases() {
        assert_eq!(capitalize_first("  observasi kelas "), "Observasi kelas");
        assert_eq!(capitalize_first("ékspor"), "Ékspor");
        assert_eq!(capitalize_first("   "), "");
    }

    #[test]
    fn summary_truncates_on_chars() {
        let long = "a".repeat(120);
        let summary = activity_summary(Some(&long));
        assert_eq!(summary.chars().count(), 103);
        assert!(summary.ends_with("..."));
        assert_eq!(activity_summary(None), "No activity recorded");
        assert_eq!(activity_summary(Some("Rapat")), "Rapat");
        assert_eq!(week_name(Some(3)), "Week 3");
    }
}
