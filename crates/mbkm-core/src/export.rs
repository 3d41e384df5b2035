//! # Delimited-Text Export
//!
//! CSV exports of registrants and logbook entries.
//!
//! Status, completion label and percentage are taken from the same
//! classifier and scorer as the on-screen rows, so an exported value always
//! equals the displayed one.
//!
//! ## Format
//!
//! - The header row is written unquoted and always present.
//! - Every data value is wrapped in `"` with embedded quotes doubled.
//! - Lines end with `\n`.
//! - Each export carries a BLAKE3 checksum of its content.

use crate::catalog::Catalog;
use crate::completion::Completion;
use crate::status::{PaymentStatus, RegistrationStatus, ReportStatus};
use crate::types::{LogbookEntry, Registrant};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Column names of the registrant export.
pub const REGISTRANT_COLUMNS: [&str; 13] = [
    "NIM",
    "Name",
    "Study Program",
    "Academic Year",
    "Semester",
    "Activity Type",
    "Placement",
    "Phone",
    "Status",
    "Payment Status",
    "Report Status",
    "Score",
    "Registered At",
];

/// Column names of the logbook export.
pub const LOGBOOK_COLUMNS: [&str; 12] = [
    "NIM",
    "Nama",
    "Program Studi",
    "Tahun Akademik",
    "Minggu",
    "Tanggal Kegiatan",
    "Nama Kegiatan",
    "Tujuan Kegiatan",
    "Catatan",
    "Kesimpulan",
    "Status Kelengkapan",
    "Persentase Kelengkapan",
];

const FILENAME_TIMESTAMP: &str = "%Y_%m_%d_%H_%M_%S";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// =============================================================================
// TEXT HELPERS
// =============================================================================

/// Remove markup tags, keeping the text between them.
#[must_use]
pub fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Quote one value: `"` around, inner quotes doubled.
#[must_use]
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn push_row(out: &mut String, values: &[String]) {
    let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
    out.push_str(&quoted.join(","));
    out.push('\n');
}

fn header(columns: &[&str]) -> String {
    let mut line = columns.join(",");
    line.push('\n');
    line
}

/// BLAKE3 hex digest.
#[must_use]
pub fn checksum(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

// =============================================================================
// EXPORT VALUE
// =============================================================================

/// A finished export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
    /// Data rows, header excluded.
    pub rows: usize,
    /// BLAKE3 hex digest of `content`.
    pub checksum: String,
    /// Human-readable descriptions of the filters the rows were selected
    /// with. Empty for an unfiltered export.
    #[serde(default)]
    pub filters: Vec<String>,
}

impl CsvExport {
    fn new(prefix: &str, content: String, rows: usize, now: NaiveDateTime) -> Self {
        let checksum = checksum(content.as_bytes());
        Self {
            filename: format!("{}_{}.csv", prefix, now.format(FILENAME_TIMESTAMP)),
            content,
            rows,
            checksum,
            filters: Vec::new(),
        }
    }

    /// Attach the filter descriptions. The content and checksum are
    /// unchanged.
    #[must_use]
    pub fn with_filters(mut self, filters: Vec<String>) -> Self {
        self.filters = filters;
        self
    }

    /// `true` when `checksum` matches the content.
    #[must_use]
    pub fn verify(&self) -> bool {
        checksum(self.content.as_bytes()) == self.checksum
    }
}

// =============================================================================
// EXPORTS
// =============================================================================

/// Registrant export, one row per registration in the given order.
#[must_use]
pub fn registrants_csv(
    registrants: &[Registrant],
    catalog: &Catalog,
    now: NaiveDateTime,
) -> CsvExport {
    let mut content = header(&REGISTRANT_COLUMNS);
    for registrant in registrants {
        let reg = &registrant.registration;
        let payment = match PaymentStatus::of(reg) {
            PaymentStatus::Unpaid => "Unpaid",
            _ => "Paid",
        };
        let report = match ReportStatus::of(reg) {
            ReportStatus::NotSubmitted => "Not Submitted",
            _ => "Submitted",
        };
        push_row(
            &mut content,
            &[
                reg.nim.clone(),
                registrant.name().to_string(),
                catalog.study_program_name(registrant.prodi_id()).to_string(),
                reg.academic_year.clone().unwrap_or_default(),
                reg.semester.map(|s| s.as_str().to_string()).unwrap_or_default(),
                reg.activity_type.clone().unwrap_or_default(),
                reg.placement.clone().unwrap_or_default(),
                reg.phone.clone().unwrap_or_default(),
                RegistrationStatus::classify(reg).label().to_string(),
                payment.to_string(),
                report.to_string(),
                reg.score.clone().unwrap_or_default(),
                reg.created_at.format(DATETIME_FORMAT).to_string(),
            ],
        );
    }
    CsvExport::new("registrants_export", content, registrants.len(), now)
}

/// Logbook export, one row per entry. Entries follow their registrant in
/// the given order.
#[must_use]
pub fn logbooks_csv(
    groups: &[(Registrant, Vec<LogbookEntry>)],
    catalog: &Catalog,
    now: NaiveDateTime,
) -> CsvExport {
    let mut content = header(&LOGBOOK_COLUMNS);
    let mut rows = 0;
    for (registrant, entries) in groups {
        let reg = &registrant.registration;
        for entry in entries {
            let completion = Completion::of(entry);
            let text = |v: &Option<String>| v.as_deref().map(strip_html).unwrap_or_default();
            push_row(
                &mut content,
                &[
                    reg.nim.clone(),
                    registrant.name().to_string(),
                    catalog.study_program_name(registrant.prodi_id()).to_string(),
                    reg.academic_year.clone().unwrap_or_default(),
                    entry.week.map(|w| w.to_string()).unwrap_or_default(),
                    entry
                        .activity_date
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default(),
                    text(&entry.activity_name),
                    text(&entry.objective),
                    text(&entry.notes),
                    text(&entry.conclusion),
                    completion.status.label().to_string(),
                    format!("{}%", completion.percentage),
                ],
            );
            rows += 1;
        }
    }
    CsvExport::new("logbooks_export", content, rows, now)
}

// =============================================================================
// TESTS
// =============================================================================
