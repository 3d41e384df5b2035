//! # Core Type Definitions
//!
//! This module contains the record types read and written by the dashboard:
//! - Identifiers (`RegistrationId`, `LogbookId`)
//! - Records (`Student`, `Registration`, `LogbookEntry`)
//! - Mutation inputs (`NewRegistration`, `RegistrationUpdate`, `NewLogbookEntry`)
//! - Error types (`MbkmError`)
//!
//! ## Nullability
//!
//! Every column that the source tables allow to be NULL is an `Option` here.
//! Absent values are never errors: the status and completion rules treat them
//! as a defined branch.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Primary key of a registration row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(pub u64);

/// Primary key of a logbook entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogbookId(pub u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LogbookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// GENDER
// =============================================================================

/// Gender derived from the student's `L`/`P` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// Map a raw gender code. Anything other than `L` or `P` is `Unknown`.
    #[must_use]
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("L") => Gender::Male,
            Some("P") => Gender::Female,
            _ => Gender::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SEMESTER
// =============================================================================

/// Academic semester. The source data only ever holds `Ganjil` (odd) and
/// `Genap` (even).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Semester {
    Ganjil,
    Genap,
}

impl Semester {
    pub const ALL: [Semester; 2] = [Semester::Ganjil, Semester::Genap];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::Ganjil => "Ganjil",
            Semester::Genap => "Genap",
        }
    }

    /// English label used in filter dropdowns.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Semester::Ganjil => "Odd Semester",
            Semester::Genap => "Even Semester",
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Semester {
    type Err = MbkmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ganjil" | "odd" => Ok(Semester::Ganjil),
            "genap" | "even" => Ok(Semester::Genap),
            other => Err(MbkmError::InvalidFilter(format!("unknown semester '{}'", other))),
        }
    }
}

// =============================================================================
// STUDENT
// =============================================================================

/// A student, keyed by NIM. Owned by the university enrollment process;
/// this system only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub nim: String,
    pub full_name: Option<String>,
    /// Raw gender code: `L` or `P`.
    pub gender_code: Option<String>,
    /// Study-program (prodi) reference.
    pub prodi_id: Option<u32>,
    pub email: Option<String>,
}

impl Student {
    #[must_use]
    pub fn new(nim: impl Into<String>) -> Self {
        Self {
            nim: nim.into(),
            full_name: None,
            gender_code: None,
            prodi_id: None,
            email: None,
        }
    }

    #[must_use]
    pub fn gender(&self) -> Gender {
        Gender::from_code(self.gender_code.as_deref())
    }
}

// =============================================================================
// REGISTRATION
// =============================================================================

/// One student's enrollment in one MBKM activity cycle.
///
/// There is no stored status column: the lifecycle label is always derived
/// from `payment_proof`, `report` and `score` (see [`crate::status`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub nim: String,
    /// Activity code such as `magang` or `kkn`.
    pub activity_type: Option<String>,
    /// Free-text placement (partner institution / location).
    pub placement: Option<String>,
    pub academic_year: Option<String>,
    pub semester: Option<Semester>,
    pub phone: Option<String>,
    /// Stored file reference of the payment proof.
    pub payment_proof: Option<String>,
    /// Stored file reference of the final report.
    pub report: Option<String>,
    pub video_url: Option<String>,
    /// Grade. Present means the registration is assessed.
    pub score: Option<String>,
    pub payment_verified: bool,
    pub payment_verified_at: Option<NaiveDateTime>,
    pub payment_rejection_reason: Option<String>,
    pub rejection_reason: Option<String>,
    pub approved_at: Option<NaiveDateTime>,
    pub rejected_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Registration {
    /// Create a registration with every optional column absent.
    #[must_use]
    pub fn new(id: RegistrationId, nim: impl Into<String>, created_at: NaiveDateTime) -> Self {
        Self {
            id,
            nim: nim.into(),
            activity_type: None,
            placement: None,
            academic_year: None,
            semester: None,
            phone: None,
            payment_proof: None,
            report: None,
            video_url: None,
            score: None,
            payment_verified: false,
            payment_verified_at: None,
            payment_rejection_reason: None,
            rejection_reason: None,
            approved_at: None,
            rejected_at: None,
            created_at,
            updated_at: created_at,
        }
    }
}

// =============================================================================
// LOGBOOK ENTRY
// =============================================================================

/// A weekly self-reported activity record tied to a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogbookEntry {
    pub id: LogbookId,
    pub registration_id: RegistrationId,
    /// Week number. Assigned at creation time when the submitter left it unset.
    pub week: Option<u32>,
    pub activity_date: Option<NaiveDate>,
    pub activity_name: Option<String>,
    pub objective: Option<String>,
    pub notes: Option<String>,
    pub conclusion: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl LogbookEntry {
    /// Create an entry with every text field absent.
    #[must_use]
    pub fn new(id: LogbookId, registration_id: RegistrationId) -> Self {
        Self {
            id,
            registration_id,
            week: None,
            activity_date: None,
            activity_name: None,
            objective: None,
            notes: None,
            conclusion: None,
            created_at: None,
        }
    }
}

// =============================================================================
// REGISTRANT
// =============================================================================

/// A registration joined with its student, when the student row exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registrant {
    pub registration: Registration,
    pub student: Option<Student>,
}

impl Registrant {
    #[must_use]
    pub fn new(registration: Registration, student: Option<Student>) -> Self {
        Self {
            registration,
            student,
        }
    }

    /// Student name, or "Unknown" when the student row is missing.
    #[must_use]
    pub fn name(&self) -> &str {
        self.student
            .as_ref()
            .and_then(|s| s.full_name.as_deref())
            .unwrap_or("Unknown")
    }

    #[must_use]
    pub fn gender(&self) -> Gender {
        self.student
            .as_ref()
            .map(Student::gender)
            .unwrap_or(Gender::Unknown)
    }

    #[must_use]
    pub fn prodi_id(&self) -> Option<u32> {
        self.student.as_ref().and_then(|s| s.prodi_id)
    }
}

// =============================================================================
// MUTATION INPUTS
// =============================================================================

/// Fields accepted when creating a registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewRegistration {
    pub nim: String,
    pub activity_type: Option<String>,
    pub placement: Option<String>,
    pub academic_year: Option<String>,
    pub semester: Option<Semester>,
    pub phone: Option<String>,
    pub payment_proof: Option<String>,
}

/// Partial update of a registration. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationUpdate {
    pub activity_type: Option<String>,
    pub placement: Option<String>,
    pub academic_year: Option<String>,
    pub semester: Option<Semester>,
    pub phone: Option<String>,
    pub payment_proof: Option<String>,
    pub score: Option<String>,
}

impl RegistrationUpdate {
    /// Apply the set fields onto `registration`.
    pub fn apply(self, registration: &mut Registration) {
        if let Some(v) = self.activity_type {
            registration.activity_type = Some(v);
        }
        if let Some(v) = self.placement {
            registration.placement = Some(v);
        }
        if let Some(v) = self.academic_year {
            registration.academic_year = Some(v);
        }
        if let Some(v) = self.semester {
            registration.semester = Some(v);
        }
        if let Some(v) = self.phone {
            registration.phone = Some(v);
        }
        if let Some(v) = self.payment_proof {
            registration.payment_proof = Some(v);
        }
        if let Some(v) = self.score {
            registration.score = Some(v);
        }
    }
}

/// Fields accepted when a student submits a logbook entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewLogbookEntry {
    pub week: Option<u32>,
    pub activity_date: Option<NaiveDate>,
    pub activity_name: Option<String>,
    pub objective: Option<String>,
    pub notes: Option<String>,
    pub conclusion: Option<String>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the dashboard.
///
/// The lifecycle, completion and statistics rules never produce these; they
/// come from lookups, input validation and storage.
#[derive(Debug, Error)]
pub enum MbkmError {
    /// No registration with this id.
    #[error("Registration not found: {0}")]
    RegistrationNotFound(RegistrationId),

    /// No logbook entry with this id.
    #[error("Logbook entry not found: {0}")]
    LogbookNotFound(LogbookId),

    /// A mutation input failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A filter parameter could not be interpreted.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// The operation does not apply to the record in its current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_from_code() {
        assert_eq!(Gender::from_code(Some("L")), Gender::Male);
        assert_eq!(Gender::from_code(Some("P")), Gender::Female);
        assert_eq!(Gender::from_code(Some("l")), Gender::Unknown);
        assert_eq!(Gender::from_code(None), Gender::Unknown);
    }

    #[test]
    fn semester_parses_both_spellings() {
        assert_eq!("Ganjil".parse::<Semester>().ok(), Some(Semester::Ganjil));
        assert_eq!(" genap ".parse::<Semester>().ok(), Some(Semester::Genap));
        assert_eq!("odd".parse::<Semester>().ok(), Some(Semester::Ganjil));
        assert!("summer".parse::<Semester>().is_err());
    }

    #[test]
    fn update_only_touches_set_fields() {
        let created = NaiveDate::from_ymd_opt(2024, 8, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .expect("valid datetime");
        let mut reg = Registration::new(RegistrationId(1), "E1E120001", created);
        reg.placement = Some("Dinas Kominfo Kendari".to_string());

        RegistrationUpdate {
            score: Some("B".to_string()),
            ..RegistrationUpdate::default()
        }
        .apply(&mut reg);

        assert_eq!(reg.score.as_deref(), Some("B"));
        assert_eq!(reg.placement.as_deref(), Some("Dinas Kominfo Kendari"));
    }
}
