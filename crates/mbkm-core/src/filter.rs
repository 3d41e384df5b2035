//! # Filters and Pagination
//!
//! Query parameters of the listing operations and the pagination envelope.
//!
//! Every filter uses `None` for "all". [`parse_choice`] turns the raw
//! request value (where `"all"` and the empty string both mean no filter)
//! into that form. The status filter goes through the lifecycle classifier,
//! never through raw column checks.

use crate::MbkmError;
use crate::primitives::{DEFAULT_PER_PAGE, MAX_PER_PAGE, MAX_SEARCH_LENGTH};
use crate::status::RegistrationStatus;
use crate::types::{Registrant, Semester};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Parse a filter value. `None`, `""` and `"all"` mean no filter.
pub fn parse_choice<T>(raw: Option<&str>) -> Result<Option<T>, MbkmError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("all") => Ok(None),
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|e| MbkmError::InvalidFilter(e.to_string())),
    }
}

/// Normalize a search term. Blank terms mean no search.
pub fn normalize_search(raw: Option<&str>) -> Result<Option<String>, MbkmError> {
    let Some(term) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if term.chars().count() > MAX_SEARCH_LENGTH {
        return Err(MbkmError::InvalidFilter(format!(
            "search term longer than {} characters",
            MAX_SEARCH_LENGTH
        )));
    }
    Ok(Some(term.to_lowercase()))
}

fn contains_ci(haystack: Option<&str>, needle_lower: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle_lower))
}

/// Case-insensitive substring match on NIM, student name and placement.
/// `term` must already be lower-cased.
#[must_use]
pub fn matches_search(registrant: &Registrant, term: &str) -> bool {
    contains_ci(Some(&registrant.registration.nim), term)
        || contains_ci(
            registrant.student.as_ref().and_then(|s| s.full_name.as_deref()),
            term,
        )
        || contains_ci(registrant.registration.placement.as_deref(), term)
}

/// Case-insensitive substring match on NIM and student name only.
#[must_use]
pub fn matches_student(registrant: &Registrant, term: &str) -> bool {
    contains_ci(Some(&registrant.registration.nim), term)
        || contains_ci(
            registrant.student.as_ref().and_then(|s| s.full_name.as_deref()),
            term,
        )
}

fn matches_exact(value: Option<&str>, wanted: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(w) => value == Some(w),
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Requested page. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    /// Clamp raw values: page at least 1, page size within `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn new(page: Option<usize>, per_page: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        }
    }

    /// Slice `items` to this page.
    #[must_use]
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let per_page = self.per_page.max(1);
        let last_page = total.div_ceil(per_page).max(1);
        let offset = self.page.saturating_sub(1).saturating_mul(per_page);
        let data: Vec<T> = items.into_iter().skip(offset).take(per_page).collect();
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            (Some(offset + 1), Some(offset + data.len()))
        };
        Page {
            data,
            pagination: Pagination {
                current_page: self.page,
                last_page,
                per_page,
                total,
                from,
                to,
            },
        }
    }
}

/// Pagination envelope of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: usize,
    pub last_page: usize,
    pub per_page: usize,
    pub total: usize,
    /// 1-based index of the first item on the page; `None` on an empty page.
    pub from: Option<usize>,
    pub to: Option<usize>,
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Transform the items, keeping the envelope.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

// =============================================================================
// QUERIES
// =============================================================================

/// Filters of the main dashboard table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardQuery {
    pub academic_year: Option<String>,
    /// Compared against the trimmed stored placement.
    pub placement: Option<String>,
    pub semester: Option<Semester>,
    pub prodi: Option<u32>,
    /// Lower-cased search term over NIM, name and placement.
    pub search: Option<String>,
    pub page: PageRequest,
}

impl DashboardQuery {
    /// Filters only; pagination does not affect matching.
    #[must_use]
    pub fn matches(&self, registrant: &Registrant) -> bool {
        let reg = &registrant.registration;
        matches_exact(reg.academic_year.as_deref(), self.academic_year.as_deref())
            && matches_exact(
                reg.placement.as_deref().map(str::trim),
                self.placement.as_deref().map(str::trim),
            )
            && self.semester.is_none_or(|s| reg.semester == Some(s))
            && self.prodi.is_none_or(|p| registrant.prodi_id() == Some(p))
            && self
                .search
                .as_deref()
                .is_none_or(|term| matches_search(registrant, term))
    }

    /// `true` when any filter is set.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        self.academic_year.is_some()
            || self.placement.is_some()
            || self.semester.is_some()
            || self.prodi.is_some()
            || self.search.is_some()
    }
}

/// Filters of the registrant management table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrantQuery {
    pub search: Option<String>,
    pub status: Option<RegistrationStatus>,
    pub activity_type: Option<String>,
    pub academic_year: Option<String>,
    pub semester: Option<Semester>,
    pub prodi: Option<u32>,
    pub page: PageRequest,
}

impl RegistrantQuery {
    #[must_use]
    pub fn matches(&self, registrant: &Registrant) -> bool {
        let reg = &registrant.registration;
        self.status
            .is_none_or(|s| RegistrationStatus::classify(reg) == s)
            && self.activity_type.as_deref().is_none_or(|wanted| {
                reg.activity_type
                    .as_deref()
                    .is_some_and(|code| code.eq_ignore_ascii_case(wanted))
            })
            && matches_exact(reg.academic_year.as_deref(), self.academic_year.as_deref())
            && self.semester.is_none_or(|s| reg.semester == Some(s))
            && self.prodi.is_none_or(|p| registrant.prodi_id() == Some(p))
            && self
                .search
                .as_deref()
                .is_none_or(|term| matches_search(registrant, term))
    }
}

/// Filters of the logbook overview and the logbook export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogbookQuery {
    /// Lower-cased search term over NIM and name.
    pub search: Option<String>,
    pub academic_year: Option<String>,
    pub prodi: Option<u32>,
    pub page: PageRequest,
}

impl LogbookQuery {
    #[must_use]
    pub fn matches(&self, registrant: &Registrant) -> bool {
        matches_exact(
            registrant.registration.academic_year.as_deref(),
            self.academic_year.as_deref(),
        ) && self.prodi.is_none_or(|p| registrant.prodi_id() == Some(p))
            && self
                .search
                .as_deref()
                .is_none_or(|term| matches_student(registrant, term))
    }
}

// =============================================================================
// FILTER OPTIONS
// =============================================================================

/// One entry of a filter dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

impl FilterOption {
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// The leading "all" entry of a dropdown.
    #[must_use]
    pub fn all(label: impl Into<String>) -> Self {
        Self::new("all", label)
    }
}

/// Every dropdown of the dashboard and registrant tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Distinct academic years, newest first.
    pub academic_years: Vec<FilterOption>,
    /// Distinct non-empty placements, ascending.
    pub placements: Vec<FilterOption>,
    pub semesters: Vec<FilterOption>,
    pub statuses: Vec<FilterOption>,
    pub activity_types: Vec<FilterOption>,
    pub study_programs: Vec<FilterOption>,
}

// =============================================================================
// TESTS
// =============================================================================
