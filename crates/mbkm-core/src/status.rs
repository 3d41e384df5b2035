//! # Registration Lifecycle
//!
//! The single classifier that maps a registration's nullable columns to its
//! lifecycle label. List rows, detail pages, filters, statistics and exports
//! all call [`RegistrationStatus::classify`], so a filter can never match a
//! row that displays a different status.
//!
//! ## Priority
//!
//! Highest first:
//! 1. score present → `Completed`
//! 2. report present → `AwaitingAssessment`
//! 3. payment proof present → `Active`
//! 4. otherwise → `AwaitingPayment`
//!
//! "Present" means non-null and non-empty.

use crate::MbkmError;
use crate::types::Registration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `true` when the column holds a non-empty value.
#[inline]
#[must_use]
pub fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

// =============================================================================
// SEVERITY
// =============================================================================

/// Badge tag shown next to a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Primary,
    Info,
    Warning,
    Danger,
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Primary => "primary",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// REGISTRATION STATUS
// =============================================================================

/// Lifecycle label of a registration. Exactly one applies at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    AwaitingPayment,
    Active,
    AwaitingAssessment,
    Completed,
}

impl RegistrationStatus {
    /// All labels, lowest priority first.
    pub const ALL: [RegistrationStatus; 4] = [
        RegistrationStatus::AwaitingPayment,
        RegistrationStatus::Active,
        RegistrationStatus::AwaitingAssessment,
        RegistrationStatus::Completed,
    ];

    /// Classify from the three raw columns.
    #[must_use]
    pub fn from_fields(
        payment_proof: Option<&str>,
        report: Option<&str>,
        score: Option<&str>,
    ) -> Self {
        if is_present(score) {
            RegistrationStatus::Completed
        } else if is_present(report) {
            RegistrationStatus::AwaitingAssessment
        } else if is_present(payment_proof) {
            RegistrationStatus::Active
        } else {
            RegistrationStatus::AwaitingPayment
        }
    }

    /// Classify a registration.
    #[must_use]
    pub fn classify(registration: &Registration) -> Self {
        Self::from_fields(
            registration.payment_proof.as_deref(),
            registration.report.as_deref(),
            registration.score.as_deref(),
        )
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            RegistrationStatus::AwaitingPayment => "Awaiting Payment",
            RegistrationStatus::Active => "Active",
            RegistrationStatus::AwaitingAssessment => "Awaiting Assessment",
            RegistrationStatus::Completed => "Completed",
        }
    }

    /// Machine key used in URLs and filter parameters.
    #[must_use]
    pub fn slug(&self) -> &'static str {
        match self {
            RegistrationStatus::AwaitingPayment => "awaiting_payment",
            RegistrationStatus::Active => "active",
            RegistrationStatus::AwaitingAssessment => "awaiting_assessment",
            RegistrationStatus::Completed => "completed",
        }
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            RegistrationStatus::Completed => Severity::Success,
            RegistrationStatus::Active => Severity::Primary,
            RegistrationStatus::AwaitingAssessment => Severity::Warning,
            RegistrationStatus::AwaitingPayment => Severity::Danger,
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RegistrationStatus {
    type Err = MbkmError;

    /// Accepts the slug, the display label, or the legacy Indonesian keys.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "awaiting_payment" | "pending_payment" | "menunggu_pembayaran" => {
                Ok(RegistrationStatus::AwaitingPayment)
            }
            "active" | "aktif" => Ok(RegistrationStatus::Active),
            "awaiting_assessment" | "pending_assessment" | "menunggu_penilaian" => {
                Ok(RegistrationStatus::AwaitingAssessment)
            }
            "completed" | "selesai" => Ok(RegistrationStatus::Completed),
            _ => Err(MbkmError::InvalidFilter(format!("unknown status '{}'", s))),
        }
    }
}

// =============================================================================
// SUB-STATUSES
// =============================================================================

/// Payment state shown in detail rows and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Submitted,
    Verified,
}

impl PaymentStatus {
    #[must_use]
    pub fn of(registration: &Registration) -> Self {
        if !is_present(registration.payment_proof.as_deref()) {
            PaymentStatus::Unpaid
        } else if registration.payment_verified {
            PaymentStatus::Verified
        } else {
            PaymentStatus::Submitted
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::Submitted => "Paid",
            PaymentStatus::Verified => "Verified",
        }
    }
}

/// State of the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    NotSubmitted,
    Submitted,
    Approved,
}

impl ReportStatus {
    /// A scored registration counts as approved even when the report
    /// reference was later removed.
    #[must_use]
    pub fn of(registration: &Registration) -> Self {
        if is_present(registration.score.as_deref()) {
            ReportStatus::Approved
        } else if is_present(registration.report.as_deref()) {
            ReportStatus::Submitted
        } else {
            ReportStatus::NotSubmitted
        }
    }

    #[must_use]
    pub fn slug(&self) -> &'static str {
        match self {
            ReportStatus::NotSubmitted => "not_submitted",
            ReportStatus::Submitted => "submitted",
            ReportStatus::Approved => "approved",
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ReportStatus::NotSubmitted => "Not Submitted",
            ReportStatus::Submitted => "Submitted",
            ReportStatus::Approved => "Approved",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order() {
        use RegistrationStatus::*;
        assert_eq!(RegistrationStatus::from_fields(None, None, None), AwaitingPayment);
        assert_eq!(
            RegistrationStatus::from_fields(Some("proof.png"), None, None),
            Active
        );
        assert_eq!(
            RegistrationStatus::from_fields(Some("proof.png"), Some("report.pdf"), None),
            AwaitingAssessment
        );
        assert_eq!(
            RegistrationStatus::from_fields(None, None, Some("A")),
            Completed
        );
        assert_eq!(
            RegistrationStatus::from_fields(None, Some("report.pdf"), Some("B")),
            Completed
        );
    }

    #[test]
    fn empty_string_is_absent() {
        assert_eq!(
            RegistrationStatus::from_fields(Some(""), Some(""), Some("")),
            RegistrationStatus::AwaitingPayment
        );
        assert_eq!(
            RegistrationStatus::from_fields(Some("proof.png"), Some(""), Some("")),
            RegistrationStatus::Active
        );
    }

    #[test]
    fn severity_table() {
        assert_eq!(RegistrationStatus::Completed.severity().as_str(), "success");
        assert_eq!(RegistrationStatus::Active.severity().as_str(), "primary");
        assert_eq!(
            RegistrationStatus::AwaitingAssessment.severity().as_str(),
            "warning"
        );
        assert_eq!(
            RegistrationStatus::AwaitingPayment.severity().as_str(),
            "danger"
        );
    }

    #[test]
    fn parse_accepts_slug_label_and_legacy_keys() {
        for status in RegistrationStatus::ALL {
            assert_eq!(status.slug().parse::<RegistrationStatus>().ok(), Some(status));
            assert_eq!(status.label().parse::<RegistrationStatus>().ok(), Some(status));
        }
        assert_eq!(
            "pending_payment".parse::<RegistrationStatus>().ok(),
            Some(RegistrationStatus::AwaitingPayment)
        );
        assert!("archived".parse::<RegistrationStatus>().is_err());
    }
}
