//! # Read Models
//!
//! Rows and detail records rendered by the dashboard. Each one is built from
//! stored records plus the [`Catalog`], and reads status and completion
//! through the shared classifier and scorer.

use crate::catalog::Catalog;
use crate::completion::{Completion, CompletionStatus, activity_summary, week_name};
use crate::export::strip_html;
use crate::filter::{FilterOptions, Page};
use crate::stats::{GlobalLogbookStats, LogbookStats, RegistrationStats};
use crate::status::{PaymentStatus, RegistrationStatus, ReportStatus, Severity};
use crate::types::{
    Gender, LogbookEntry, LogbookId, Registrant, Registration, RegistrationId, Semester,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Long date format, e.g. `05 September 2024`.
pub const LONG_DATE_FORMAT: &str = "%d %B %Y";

/// File name part of a stored reference.
fn base_name(reference: &str) -> &str {
    reference.rsplit(['/', '\\']).next().unwrap_or(reference)
}

// =============================================================================
// REGISTRANTS
// =============================================================================

/// One row of the dashboard and registrant tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrantRow {
    pub id: RegistrationId,
    pub nim: String,
    pub name: String,
    pub study_program: String,
    pub academic_year: Option<String>,
    pub semester: Option<Semester>,
    pub activity_type: Option<String>,
    pub activity_type_name: String,
    pub placement: Option<String>,
    pub location: String,
    pub phone: Option<String>,
    pub status: RegistrationStatus,
    pub status_label: String,
    pub status_color: Severity,
    pub payment_status: PaymentStatus,
    pub report_status: ReportStatus,
    pub score: Option<String>,
    pub gender: Gender,
    pub registered_at: NaiveDate,
}

impl RegistrantRow {
    #[must_use]
    pub fn build(registrant: &Registrant, catalog: &Catalog) -> Self {
        let reg = &registrant.registration;
        let status = RegistrationStatus::classify(reg);
        Self {
            id: reg.id,
            nim: reg.nim.clone(),
            name: registrant.name().to_string(),
            study_program: catalog.study_program_name(registrant.prodi_id()).to_string(),
            academic_year: reg.academic_year.clone(),
            semester: reg.semester,
            activity_type: reg.activity_type.clone(),
            activity_type_name: catalog.activity_type_name(reg.activity_type.as_deref()),
            placement: reg.placement.clone(),
            location: catalog.location(reg.placement.as_deref()).to_string(),
            phone: reg.phone.clone(),
            status,
            status_label: status.label().to_string(),
            status_color: status.severity(),
            payment_status: PaymentStatus::of(reg),
            report_status: ReportStatus::of(reg),
            score: reg.score.clone(),
            gender: registrant.gender(),
            registered_at: reg.created_at.date(),
        }
    }
}

/// A registrant with every stored column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrantDetail {
    #[serde(flatten)]
    pub row: RegistrantRow,
    pub email: Option<String>,
    pub payment_proof: Option<String>,
    pub report_document: Option<String>,
    pub video_url: Option<String>,
    pub payment_verified: bool,
    pub payment_verified_at: Option<NaiveDateTime>,
    pub payment_rejection_reason: Option<String>,
    pub approved_at: Option<NaiveDateTime>,
    pub rejected_at: Option<NaiveDateTime>,
    pub rejection_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RegistrantDetail {
    #[must_use]
    pub fn build(registrant: &Registrant, catalog: &Catalog) -> Self {
        let reg = &registrant.registration;
        Self {
            row: RegistrantRow::build(registrant, catalog),
            email: registrant.student.as_ref().and_then(|s| s.email.clone()),
            payment_proof: reg.payment_proof.clone(),
            report_document: reg.report.clone(),
            video_url: reg.video_url.clone(),
            payment_verified: reg.payment_verified,
            payment_verified_at: reg.payment_verified_at,
            payment_rejection_reason: reg.payment_rejection_reason.clone(),
            approved_at: reg.approved_at,
            rejected_at: reg.rejected_at,
            rejection_reason: reg.rejection_reason.clone(),
            created_at: reg.created_at,
            updated_at: reg.updated_at,
        }
    }
}

/// Detail page: the registrant, its logbook rows and their statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrantPage {
    pub registrant: RegistrantDetail,
    /// Week descending, then activity date descending.
    pub logbooks: Vec<LogbookRow>,
    pub statistics: LogbookStats,
}

/// Quick-search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: RegistrationId,
    pub nim: String,
    pub name: String,
    pub placement: Option<String>,
    pub status: RegistrationStatus,
    pub status_label: String,
}

impl SearchHit {
    #[must_use]
    pub fn build(registrant: &Registrant) -> Self {
        let status = RegistrationStatus::classify(&registrant.registration);
        Self {
            id: registrant.registration.id,
            nim: registrant.registration.nim.clone(),
            name: registrant.name().to_string(),
            placement: registrant.registration.placement.clone(),
            status,
            status_label: status.label().to_string(),
        }
    }
}

/// Final report of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportView {
    pub registration_id: RegistrationId,
    pub document: Option<String>,
    pub document_name: Option<String>,
    pub video_url: Option<String>,
    pub submission_date: Option<NaiveDate>,
    pub status: ReportStatus,
}

impl ReportView {
    #[must_use]
    pub fn build(registration: &Registration) -> Self {
        let document = registration.report.clone().filter(|r| !r.is_empty());
        let submission_date = document.as_ref().map(|_| registration.updated_at.date());
        Self {
            registration_id: registration.id,
            document_name: document.as_deref().map(|d| base_name(d).to_string()),
            document,
            video_url: registration.video_url.clone(),
            submission_date,
            status: ReportStatus::of(registration),
        }
    }
}

/// Dashboard table with statistics over the whole filtered set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardData {
    pub students: Page<RegistrantRow>,
    pub statistics: RegistrationStats,
    pub filters: FilterOptions,
}

// =============================================================================
// LOGBOOKS
// =============================================================================

/// Name, program and placement of the registrant owning a logbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: RegistrationId,
    pub nim: String,
    pub name: String,
    pub study_program: String,
    pub academic_year: Option<String>,
    pub semester: Option<Semester>,
    pub activity_type: Option<String>,
    pub placement: Option<String>,
}

impl StudentSummary {
    #[must_use]
    pub fn build(registrant: &Registrant, catalog: &Catalog) -> Self {
        let reg = &registrant.registration;
        Self {
            id: reg.id,
            nim: reg.nim.clone(),
            name: registrant.name().to_string(),
            study_program: catalog.study_program_name(registrant.prodi_id()).to_string(),
            academic_year: reg.academic_year.clone(),
            semester: reg.semester,
            activity_type: reg.activity_type.clone(),
            placement: reg.placement.clone(),
        }
    }
}

/// A logbook entry with its completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogbookRow {
    pub id: LogbookId,
    pub registration_id: RegistrationId,
    pub week: Option<u32>,
    pub week_name: String,
    pub activity_date: Option<NaiveDate>,
    pub activity_date_formatted: Option<String>,
    pub activity_name: Option<String>,
    pub objective: Option<String>,
    pub notes: Option<String>,
    pub conclusion: Option<String>,
    pub activity_summary: String,
    pub completion_status: CompletionStatus,
    pub completion_label: String,
    pub completion_color: Severity,
    pub completion_percentage: u32,
    pub created_at: Option<NaiveDateTime>,
}

impl LogbookRow {
    #[must_use]
    pub fn build(entry: &LogbookEntry) -> Self {
        let completion = Completion::of(entry);
        Self {
            id: entry.id,
            registration_id: entry.registration_id,
            week: entry.week,
            week_name: week_name(entry.week),
            activity_date: entry.activity_date,
            activity_date_formatted: entry
                .activity_date
                .map(|d| d.format(LONG_DATE_FORMAT).to_string()),
            activity_name: entry.activity_name.clone(),
            objective: entry.objective.clone(),
            notes: entry.notes.clone(),
            conclusion: entry.conclusion.clone(),
            activity_summary: activity_summary(entry.activity_name.as_deref()),
            completion_status: completion.status,
            completion_label: completion.status.label().to_string(),
            completion_color: completion.status.severity(),
            completion_percentage: completion.percentage,
            created_at: entry.created_at,
        }
    }
}

/// Compact entry shown in overview cards. Text is stripped of markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentLogbook {
    pub id: LogbookId,
    pub week: Option<u32>,
    pub date: Option<NaiveDate>,
    pub activity_name: Option<String>,
    pub objective: Option<String>,
    pub notes: Option<String>,
    pub completion_percentage: u32,
}

impl RecentLogbook {
    #[must_use]
    pub fn build(entry: &LogbookEntry) -> Self {
        Self {
            id: entry.id,
            week: entry.week,
            date: entry.activity_date,
            activity_name: entry.activity_name.as_deref().map(strip_html),
            objective: entry.objective.as_deref().map(strip_html),
            notes: entry.notes.as_deref().map(strip_html),
            completion_percentage: Completion::of(entry).percentage,
        }
    }
}

/// One registrant card of the logbook overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogbookOverviewRow {
    pub student: StudentSummary,
    pub status: RegistrationStatus,
    pub logbook_stats: LogbookStats,
    pub recent_logbooks: Vec<RecentLogbook>,
}

/// Logbook overview page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogbookOverview {
    pub students: Page<LogbookOverviewRow>,
    pub statistics: GlobalLogbookStats,
    pub filters: FilterOptions,
}

/// All logbooks of one registrant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentLogbooks {
    pub student: StudentSummary,
    pub logbooks: Vec<LogbookRow>,
    pub statistics: LogbookStats,
}

/// One logbook entry with its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogbookDetail {
    pub logbook: LogbookRow,
    pub student: StudentSummary,
}

/// Order entries week descending, then activity date descending.
pub fn sort_logbooks_desc(entries: &mut [LogbookEntry]) {
    entries.sort_by(|a, b| {
        b.week
            .cmp(&a.week)
            .then_with(|| b.activity_date.cmp(&a.activity_date))
            .then_with(|| b.id.cmp(&a.id))
    });
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Student;

    fn created() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, 1)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .expect("valid datetime")
    }

    #[test]
    fn row_uses_catalog_and_classifier() {
        let mut reg = Registration::new(RegistrationId(4), "E1E120004", created());
        reg.activity_type = Some("Magang".to_string());
        reg.placement = Some("Kendari".to_string());
        reg.payment_proof = Some("payments/4.png".to_string());
        let mut student = Student::new("E1E120004");
        student.full_name = Some("Rahmat".to_string());
        student.gender_code = Some("L".to_string());
        student.prodi_id = Some(3);

        let row = RegistrantRow::build(&Registrant::new(reg, Some(student)), &Catalog::new());
        assert_eq!(row.study_program, "Pendidikan Fisika");
        assert_eq!(row.activity_type_name, "Internship/Work Practice");
        assert_eq!(row.location, "Kendari");
        assert_eq!(row.status, RegistrationStatus::Active);
        assert_eq!(row.status_label, "Active");
        assert_eq!(row.payment_status, PaymentStatus::Submitted);
        assert_eq!(row.gender, Gender::Male);
    }

    #[test]
    fn missing_student_is_unknown() {
        let reg = Registration::new(RegistrationId(1), "X", created());
        let row = RegistrantRow::build(&Registrant::new(reg, None), &Catalog::new());
        assert_eq!(row.name, "Unknown");
        assert_eq!(row.gender, Gender::Unknown);
        assert_eq!(row.status, RegistrationStatus::AwaitingPayment);
        assert_eq!(row.status_color.as_str(), "danger");
    }

    #[test]
    fn report_view_states() {
        let mut reg = Registration::new(RegistrationId(1), "X", created());
        assert_eq!(ReportView::build(&reg).status, ReportStatus::NotSubmitted);

        reg.report = Some("reports/final_report.pdf".to_string());
        let view = ReportView::build(&reg);
        assert_eq!(view.status, ReportStatus::Submitted);
        assert_eq!(view.document_name.as_deref(), Some("final_report.pdf"));

        reg.score = Some("A".to_string());
        assert_eq!(ReportView::build(&reg).status.slug(), "approved");
    }

    #[test]
    fn logbook_row_formats_date_and_completion() {
        let mut entry = LogbookEntry::new(LogbookId(1), RegistrationId(1));
        entry.week = Some(2);
        entry.activity_date = NaiveDate::from_ymd_opt(2024, 9, 5);
        entry.activity_name = Some("Observasi".to_string());
        entry.objective = Some("Mengenal sekolah".to_string());
        entry.notes = Some("Catatan".to_string());

        let row = LogbookRow::build(&entry);
        assert_eq!(row.week_name, "Week 2");
        assert_eq!(row.activity_date_formatted.as_deref(), Some("05 September 2024"));
        assert_eq!(row.completion_percentage, 75);
        assert_eq!(row.completion_label, "Nearly Complete");
        assert_eq!(row.completion_color, Severity::Warning);
    }

    #[test]
    fn recent_logbook_strips_markup() {
        let mut entry = LogbookEntry::new(LogbookId(1), RegistrationId(1));
        entry.notes = Some("<p>Rapat <b>guru</b></p>".to_string());
        let recent = RecentLogbook::build(&entry);
        assert_eq!(recent.notes.as_deref(), Some("Rapat guru"));
        assert_eq!(recent.completion_percentage, 25);
    }

    #[test]
    fn logbooks_sort_week_then_date_desc() {
        let mut a = LogbookEntry::new(LogbookId(1), RegistrationId(1));
        a.week = Some(1);
        let mut b = LogbookEntry::new(LogbookId(2), RegistrationId(1));
        b.week = Some(2);
        b.activity_date = NaiveDate::from_ymd_opt(2024, 8, 9);
        let mut c = LogbookEntry::new(LogbookId(3), RegistrationId(1));
        c.week = Some(2);
        c.activity_date = NaiveDate::from_ymd_opt(2024, 8, 12);

        let mut entries = vec![a, b, c];
        sort_logbooks_desc(&mut entries);
        let ids: Vec<u64> = entries.iter().map(|e| e.id.0).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
