//! # Dashboard Module
//!
//! The administrator-facing service: listings, detail pages, statistics,
//! exports and the review actions on registrations.
//!
//! ## Storage Backends
//!
//! A dashboard runs on one of two backends:
//! - `InMemory`: `MemoryStore` (fast, volatile)
//! - `Persistent`: `RedbStore` (disk-backed, ACID)
//!
//! ## Caching
//!
//! The heavier read models go through a [`ReadThroughCache`]. Every mutating
//! operation clears all caches before it returns, failed ones included, so a
//! read after a write always reflects what the store holds.

use crate::cache::{CacheStats, ReadThroughCache, cache_key};
use crate::catalog::Catalog;
use crate::completion::{assign_week, capitalize_first};
use crate::export::{CsvExport, logbooks_csv, registrants_csv};
use crate::filter::{
    DashboardQuery, FilterOption, FilterOptions, LogbookQuery, Page, RegistrantQuery,
    matches_search, normalize_search,
};
use crate::primitives::{
    CACHE_TTL_SECS, DEFAULT_GRADE, FILTER_OPTIONS_TTL_FACTOR, MAX_BULK_IDS, MAX_REASON_LENGTH,
    RECENT_LOGBOOKS, SEARCH_LIMIT,
};
use crate::stats::{
    ActivityTypeSummary, DashboardSummary, GlobalLogbookStats, LogbookStats, RegistrationStats,
    StatusBreakdown, activity_type_summaries,
};
use crate::status::{RegistrationStatus, is_present};
use crate::storage::{MemoryStore, RedbStore, Store};
use crate::types::{
    LogbookEntry, LogbookId, NewLogbookEntry, NewRegistration, Registrant, Registration,
    RegistrationId, RegistrationUpdate, Semester, Student,
};
use crate::view::{
    DashboardData, LogbookDetail, LogbookOverview, LogbookOverviewRow, LogbookRow,
    RecentLogbook, RegistrantDetail, RegistrantPage, RegistrantRow, ReportView, SearchHit,
    StudentLogbooks, StudentSummary, sort_logbooks_desc,
};
use crate::MbkmError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for a Dashboard.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
    /// Any other [`Store`] implementation.
    Custom(Box<dyn Store + Send + Sync>),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    fn store(&self) -> &dyn Store {
        match self {
            StorageBackend::InMemory(s) => s,
            StorageBackend::Persistent(s) => s,
            StorageBackend::Custom(s) => s.as_ref(),
        }
    }

    fn store_mut(&mut self) -> &mut dyn Store {
        match self {
            StorageBackend::InMemory(s) => s,
            StorageBackend::Persistent(s) => s,
            StorageBackend::Custom(s) => s.as_mut(),
        }
    }
}

// =============================================================================
// RESULT TYPES
// =============================================================================

/// Outcome of deleting a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRegistrant {
    pub id: RegistrationId,
    pub logbooks_removed: usize,
    /// Stored file references (report, payment proof) left for cleanup.
    pub files: Vec<String>,
}

/// Outcome of a bulk delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeletion {
    pub deleted: usize,
    pub logbooks_removed: usize,
    pub files: Vec<String>,
}

/// A report submission. Absent fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportUpload {
    pub report: Option<String>,
    pub video_url: Option<String>,
}

/// Outcome of a report upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportChange {
    pub report: ReportView,
    /// Previous document reference when it was replaced.
    pub replaced: Option<String>,
}

/// Records loaded in one batch, e.g. from a JSON seed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub students: Vec<Student>,
    pub registrations: Vec<Registration>,
    pub logbooks: Vec<LogbookEntry>,
}

/// Counts of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub students: usize,
    pub registrations: usize,
    pub logbooks: usize,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Trim a rejection reason. Blank reasons and reasons over
/// `MAX_REASON_LENGTH` characters are rejected.
pub fn validate_reason(reason: &str) -> Result<String, MbkmError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(MbkmError::InvalidInput("reason is required".to_string()));
    }
    if reason.chars().count() > MAX_REASON_LENGTH {
        return Err(MbkmError::InvalidInput(format!(
            "reason longer than {} characters",
            MAX_REASON_LENGTH
        )));
    }
    Ok(reason.to_string())
}

fn validate_ids(ids: &[RegistrationId]) -> Result<(), MbkmError> {
    if ids.is_empty() {
        return Err(MbkmError::InvalidInput("no registrations selected".to_string()));
    }
    if ids.len() > MAX_BULK_IDS {
        return Err(MbkmError::InvalidInput(format!(
            "at most {} registrations per bulk action",
            MAX_BULK_IDS
        )));
    }
    Ok(())
}

/// Trimmed non-empty text, or `None`.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn capitalized(value: Option<String>) -> Option<String> {
    clean(value).map(|v| capitalize_first(&v))
}

// =============================================================================
// CACHES
// =============================================================================

const DASHBOARD_PREFIX: &str = "dashboard";
const SUMMARY_PREFIX: &str = "summary";
const REGISTRANT_STATS_PREFIX: &str = "registrant_stats";
const FILTER_OPTIONS_PREFIX: &str = "filter_options";
const LOGBOOK_OVERVIEW_PREFIX: &str = "logbook_overview";
const LOGBOOK_STATS_PREFIX: &str = "logbook_stats";

#[derive(Debug)]
struct Caches {
    dashboard: ReadThroughCache<DashboardData>,
    summary: ReadThroughCache<DashboardSummary>,
    registrant_stats: ReadThroughCache<StatusBreakdown>,
    filter_options: ReadThroughCache<FilterOptions>,
    logbook_overview: ReadThroughCache<LogbookOverview>,
    logbook_stats: ReadThroughCache<GlobalLogbookStats>,
}

impl Caches {
    fn new(ttl: Duration) -> Self {
        Self {
            dashboard: ReadThroughCache::new(ttl),
            summary: ReadThroughCache::new(ttl),
            registrant_stats: ReadThroughCache::new(ttl),
            filter_options: ReadThroughCache::new(ttl),
            logbook_overview: ReadThroughCache::new(ttl),
            logbook_stats: ReadThroughCache::new(ttl),
        }
    }

    fn clear(&self) {
        self.dashboard.clear();
        self.summary.clear();
        self.registrant_stats.clear();
        self.filter_options.clear();
        self.logbook_overview.clear();
        self.logbook_stats.clear();
    }

    fn stats(&self) -> CacheStats {
        [
            self.dashboard.stats(),
            self.summary.stats(),
            self.registrant_stats.stats(),
            self.filter_options.stats(),
            self.logbook_overview.stats(),
            self.logbook_stats.stats(),
        ]
        .into_iter()
        .fold(CacheStats::default(), |acc, s| CacheStats {
            hits: acc.hits + s.hits,
            misses: acc.misses + s.misses,
            entries: acc.entries + s.entries,
        })
    }
}

// =============================================================================
// DASHBOARD
// =============================================================================

/// The dashboard service over one storage backend.
///
/// Reads take `&self`; anything that writes records takes `&mut self`.
#[derive(Debug)]
pub struct Dashboard {
    backend: StorageBackend,
    catalog: Catalog,
    caches: Caches,
    ttl: Duration,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::with_backend(StorageBackend::default())
    }
}

impl Dashboard {
    /// Create an empty dashboard with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dashboard over the given backend with the default catalog
    /// and cache lifetime.
    #[must_use]
    pub fn with_backend(backend: StorageBackend) -> Self {
        let ttl = Duration::from_secs(CACHE_TTL_SECS);
        Self {
            backend,
            catalog: Catalog::default(),
            caches: Caches::new(ttl),
            ttl,
        }
    }

    /// Create a dashboard with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, MbkmError> {
        let store = RedbStore::open(path)?;
        Ok(Self::with_backend(StorageBackend::Persistent(store)))
    }

    /// Replace the catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self.caches.clear();
        self
    }

    /// Replace the cache lifetime. Zero disables caching.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self.caches = Caches::new(ttl);
        self
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.caches.stats()
    }

    /// Drop every cached read model.
    pub fn invalidate_caches(&self) {
        self.caches.clear();
    }

    pub fn registration_count(&self) -> Result<usize, MbkmError> {
        self.backend.store().registration_count()
    }

    pub fn logbook_count(&self) -> Result<usize, MbkmError> {
        self.backend.store().logbook_count()
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Every registration joined with its student, newest first.
    fn load_registrants(&self) -> Result<Vec<Registrant>, MbkmError> {
        let store = self.backend.store();
        let students: BTreeMap<String, Student> = store
            .students()?
            .into_iter()
            .map(|s| (s.nim.clone(), s))
            .collect();
        let mut registrants: Vec<Registrant> = store
            .registrations()?
            .into_iter()
            .map(|r| {
                let student = students.get(&r.nim).cloned();
                Registrant::new(r, student)
            })
            .collect();
        registrants.sort_by(|a, b| {
            b.registration
                .created_at
                .cmp(&a.registration.created_at)
                .then_with(|| b.registration.id.cmp(&a.registration.id))
        });
        Ok(registrants)
    }

    fn load_registrant(&self, id: RegistrationId) -> Result<Registrant, MbkmError> {
        let store = self.backend.store();
        let registration = store
            .registration(id)?
            .ok_or(MbkmError::RegistrationNotFound(id))?;
        let student = store.student(&registration.nim)?;
        Ok(Registrant::new(registration, student))
    }

    fn load_registration(&self, id: RegistrationId) -> Result<Registration, MbkmError> {
        self.backend
            .store()
            .registration(id)?
            .ok_or(MbkmError::RegistrationNotFound(id))
    }

    /// Entries of one registration, week descending then date descending.
    fn sorted_logbooks(&self, id: RegistrationId) -> Result<Vec<LogbookEntry>, MbkmError> {
        let mut entries = self.backend.store().logbooks_for(id)?;
        sort_logbooks_desc(&mut entries);
        Ok(entries)
    }

    // -------------------------------------------------------------------------
    // Dashboard
    // -------------------------------------------------------------------------

    /// Main dashboard table. Statistics cover the whole filtered set, not
    /// only the current page.
    pub fn dashboard_data(&self, query: &DashboardQuery) -> Result<DashboardData, MbkmError> {
        let key = cache_key(DASHBOARD_PREFIX, query)?;
        self.caches.dashboard.get_or_try_insert_with(&key, || {
            let all = self.load_registrants()?;
            let filters = self.dashboard_filter_options(&all);
            let matching: Vec<Registrant> =
                all.into_iter().filter(|r| query.matches(r)).collect();
            let statistics = RegistrationStats::fold(&matching);
            let students = query
                .page
                .paginate(matching)
                .map(|r| RegistrantRow::build(&r, &self.catalog));
            Ok(DashboardData {
                students,
                statistics,
                filters,
            })
        })
    }

    pub fn dashboard_summary(&self) -> Result<DashboardSummary, MbkmError> {
        let key = cache_key(SUMMARY_PREFIX, &())?;
        self.caches.summary.get_or_try_insert_with(&key, || {
            Ok(RegistrationStats::fold(&self.load_registrants()?).summary())
        })
    }

    /// Registrants currently carrying `status`, newest first.
    pub fn students_by_status(
        &self,
        status: RegistrationStatus,
    ) -> Result<Vec<RegistrantRow>, MbkmError> {
        Ok(self
            .load_registrants()?
            .iter()
            .filter(|r| RegistrationStatus::classify(&r.registration) == status)
            .map(|r| RegistrantRow::build(r, &self.catalog))
            .collect())
    }

    pub fn activity_types_summary(&self) -> Result<Vec<ActivityTypeSummary>, MbkmError> {
        Ok(activity_type_summaries(&self.load_registrants()?))
    }

    fn dashboard_filter_options(&self, registrants: &[Registrant]) -> FilterOptions {
        let placements: BTreeSet<&str> = registrants
            .iter()
            .filter_map(|r| r.registration.placement.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        FilterOptions {
            academic_years: academic_year_options(registrants, "Semua Tahun Akademik"),
            placements: std::iter::once(FilterOption::all("Semua Penempatan"))
                .chain(placements.into_iter().map(|p| FilterOption::new(p, p)))
                .collect(),
            semesters: std::iter::once(FilterOption::all("Semua Semester"))
                .chain(
                    Semester::ALL
                        .iter()
                        .map(|s| FilterOption::new(s.as_str(), s.as_str())),
                )
                .collect(),
            ..FilterOptions::default()
        }
    }

    // -------------------------------------------------------------------------
    // Registrants
    // -------------------------------------------------------------------------

    /// Registrant management table.
    pub fn registrants(&self, query: &RegistrantQuery) -> Result<Page<RegistrantRow>, MbkmError> {
        let matching: Vec<Registrant> = self
            .load_registrants()?
            .into_iter()
            .filter(|r| query.matches(r))
            .collect();
        Ok(query
            .page
            .paginate(matching)
            .map(|r| RegistrantRow::build(&r, &self.catalog)))
    }

    /// Detail page with the registrant's logbook rows and their statistics.
    pub fn registrant_detail(&self, id: RegistrationId) -> Result<RegistrantPage, MbkmError> {
        let registrant = self.load_registrant(id)?;
        let entries = self.sorted_logbooks(id)?;
        Ok(RegistrantPage {
            registrant: RegistrantDetail::build(&registrant, &self.catalog),
            statistics: LogbookStats::fold(&entries),
            logbooks: entries.iter().map(LogbookRow::build).collect(),
        })
    }

    pub fn registrant_statistics(&self) -> Result<StatusBreakdown, MbkmError> {
        let key = cache_key(REGISTRANT_STATS_PREFIX, &())?;
        self.caches.registrant_stats.get_or_try_insert_with(&key, || {
            Ok(RegistrationStats::fold(&self.load_registrants()?).breakdown())
        })
    }

    /// Quick search over NIM, name and placement. Blank terms find nothing.
    pub fn search(&self, term: &str) -> Result<Vec<SearchHit>, MbkmError> {
        let Some(term) = normalize_search(Some(term))? else {
            return Ok(Vec::new());
        };
        Ok(self
            .load_registrants()?
            .iter()
            .filter(|r| matches_search(r, &term))
            .take(SEARCH_LIMIT)
            .map(SearchHit::build)
            .collect())
    }

    pub fn report(&self, id: RegistrationId) -> Result<ReportView, MbkmError> {
        Ok(ReportView::build(&self.load_registration(id)?))
    }

    /// Dropdowns of the registrant table. Cached for four times the
    /// regular lifetime.
    pub fn filter_options(&self) -> Result<FilterOptions, MbkmError> {
        let key = cache_key(FILTER_OPTIONS_PREFIX, &())?;
        let ttl = self
            .ttl
            .saturating_mul(u32::try_from(FILTER_OPTIONS_TTL_FACTOR).unwrap_or(u32::MAX));
        self.caches
            .filter_options
            .get_or_try_insert_for(&key, ttl, || {
                let registrants = self.load_registrants()?;
                let activity_codes: BTreeSet<&str> = registrants
                    .iter()
                    .filter_map(|r| r.registration.activity_type.as_deref())
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .collect();

                Ok(FilterOptions {
                    academic_years: academic_year_options(&registrants, "All Academic Years"),
                    semesters: std::iter::once(FilterOption::all("All Semesters"))
                        .chain(
                            Semester::ALL
                                .iter()
                                .map(|s| FilterOption::new(s.as_str(), s.label())),
                        )
                        .collect(),
                    statuses: std::iter::once(FilterOption::all("All Statuses"))
                        .chain(
                            RegistrationStatus::ALL
                                .iter()
                                .map(|s| FilterOption::new(s.slug(), s.label())),
                        )
                        .collect(),
                    activity_types: std::iter::once(FilterOption::all("All Activity Types"))
                        .chain(
                            activity_codes
                                .into_iter()
                                .map(|c| FilterOption::new(c, title_case(c))),
                        )
                        .collect(),
                    study_programs: std::iter::once(FilterOption::all("Semua Program Studi"))
                        .chain(
                            self.catalog
                                .study_programs()
                                .map(|(id, name)| FilterOption::new(id.to_string(), name)),
                        )
                        .collect(),
                    ..FilterOptions::default()
                })
            })
    }

    // -------------------------------------------------------------------------
    // Logbooks
    // -------------------------------------------------------------------------

    /// One card per matching registration with its logbook statistics and
    /// most recent entries.
    pub fn logbook_overview(&self, query: &LogbookQuery) -> Result<LogbookOverview, MbkmError> {
        let key = cache_key(LOGBOOK_OVERVIEW_PREFIX, query)?;
        self.caches.logbook_overview.get_or_try_insert_with(&key, || {
            let registrants = self.load_registrants()?;
            let all_entries = self.backend.store().logbooks()?;
            let statistics = GlobalLogbookStats::fold(&all_entries);

            let mut grouped: BTreeMap<RegistrationId, Vec<LogbookEntry>> = BTreeMap::new();
            for entry in all_entries {
                grouped.entry(entry.registration_id).or_default().push(entry);
            }

            let filters = self.logbook_filter_options(&registrants);
            let rows: Vec<LogbookOverviewRow> = registrants
                .iter()
                .filter(|r| query.matches(r))
                .map(|r| {
                    let mut entries = grouped.remove(&r.registration.id).unwrap_or_default();
                    sort_logbooks_desc(&mut entries);
                    LogbookOverviewRow {
                        student: StudentSummary::build(r, &self.catalog),
                        status: RegistrationStatus::classify(&r.registration),
                        logbook_stats: LogbookStats::fold(&entries),
                        recent_logbooks: entries
                            .iter()
                            .take(RECENT_LOGBOOKS)
                            .map(RecentLogbook::build)
                            .collect(),
                    }
                })
                .collect();

            Ok(LogbookOverview {
                students: query.page.paginate(rows),
                statistics,
                filters,
            })
        })
    }

    fn logbook_filter_options(&self, registrants: &[Registrant]) -> FilterOptions {
        let prodis: BTreeSet<u32> = registrants.iter().filter_map(Registrant::prodi_id).collect();
        FilterOptions {
            academic_years: academic_year_options(registrants, "Semua Tahun Akademik"),
            study_programs: std::iter::once(FilterOption::all("Semua Program Studi"))
                .chain(prodis.into_iter().map(|id| {
                    FilterOption::new(id.to_string(), self.catalog.study_program_name(Some(id)))
                }))
                .collect(),
            ..FilterOptions::default()
        }
    }

    pub fn student_logbooks(&self, id: RegistrationId) -> Result<StudentLogbooks, MbkmError> {
        let registrant = self.load_registrant(id)?;
        let entries = self.sorted_logbooks(id)?;
        Ok(StudentLogbooks {
            student: StudentSummary::build(&registrant, &self.catalog),
            statistics: LogbookStats::fold(&entries),
            logbooks: entries.iter().map(LogbookRow::build).collect(),
        })
    }

    pub fn logbook_detail(&self, id: LogbookId) -> Result<LogbookDetail, MbkmError> {
        let entry = self
            .backend
            .store()
            .logbook(id)?
            .ok_or(MbkmError::LogbookNotFound(id))?;
        let registrant = self.load_registrant(entry.registration_id)?;
        Ok(LogbookDetail {
            logbook: LogbookRow::build(&entry),
            student: StudentSummary::build(&registrant, &self.catalog),
        })
    }

    pub fn logbook_statistics(&self) -> Result<GlobalLogbookStats, MbkmError> {
        let key = cache_key(LOGBOOK_STATS_PREFIX, &())?;
        self.caches.logbook_stats.get_or_try_insert_with(&key, || {
            Ok(GlobalLogbookStats::fold(&self.backend.store().logbooks()?))
        })
    }

    // -------------------------------------------------------------------------
    // Exports
    // -------------------------------------------------------------------------

    /// Registrant export, newest first. `ids` restricts the export to a
    /// selection; unknown ids are skipped.
    pub fn export_registrants(
        &self,
        ids: Option<&[RegistrationId]>,
        now: NaiveDateTime,
    ) -> Result<CsvExport, MbkmError> {
        let selection: Option<BTreeSet<RegistrationId>> = match ids {
            Some(ids) => {
                validate_ids(ids)?;
                Some(ids.iter().copied().collect())
            }
            None => None,
        };
        let registrants: Vec<Registrant> = self
            .load_registrants()?
            .into_iter()
            .filter(|r| {
                selection
                    .as_ref()
                    .is_none_or(|s| s.contains(&r.registration.id))
            })
            .collect();
        Ok(registrants_csv(&registrants, &self.catalog, now))
    }

    /// Export of the dashboard table under `query`, every page, newest
    /// first. The export carries a description of each active filter.
    pub fn export_dashboard(
        &self,
        query: &DashboardQuery,
        now: NaiveDateTime,
    ) -> Result<CsvExport, MbkmError> {
        let registrants: Vec<Registrant> = self
            .load_registrants()?
            .into_iter()
            .filter(|r| query.matches(r))
            .collect();
        Ok(registrants_csv(&registrants, &self.catalog, now).with_filters(self.describe(query)))
    }

    fn describe(&self, query: &DashboardQuery) -> Vec<String> {
        let mut filters = Vec::new();
        if let Some(year) = &query.academic_year {
            filters.push(format!("Tahun Akademik: {}", year));
        }
        if let Some(semester) = query.semester {
            filters.push(format!("Semester: {}", semester.as_str()));
        }
        if let Some(prodi) = query.prodi {
            filters.push(format!(
                "Program Studi: {}",
                self.catalog.study_program_name(Some(prodi))
            ));
        }
        if let Some(placement) = &query.placement {
            filters.push(format!("Penempatan: {}", placement.trim()));
        }
        if let Some(term) = &query.search {
            filters.push(format!("Pencarian: \"{}\"", term));
        }
        filters
    }

    /// Logbook export of the registrations matching `query`. Pagination is
    /// ignored.
    pub fn export_logbooks(
        &self,
        query: &LogbookQuery,
        now: NaiveDateTime,
    ) -> Result<CsvExport, MbkmError> {
        let mut groups = Vec::new();
        for registrant in self.load_registrants()? {
            if !query.matches(&registrant) {
                continue;
            }
            let entries = self.sorted_logbooks(registrant.registration.id)?;
            if !entries.is_empty() {
                groups.push((registrant, entries));
            }
        }
        Ok(logbooks_csv(&groups, &self.catalog, now))
    }

    // -------------------------------------------------------------------------
    // Registrant mutations
    // -------------------------------------------------------------------------

    /// Run `write` against the store, then clear the caches whether or not
    /// it succeeded. A failed write may already have changed some records.
    fn write<T>(
        &mut self,
        write: impl FnOnce(&mut dyn Store) -> Result<T, MbkmError>,
    ) -> Result<T, MbkmError> {
        let result = write(self.backend.store_mut());
        self.caches.clear();
        result
    }

    fn save(&mut self, registration: Registration) -> Result<(), MbkmError> {
        self.write(|store| store.put_registration(registration))
    }

    fn detail(&self, registration: Registration) -> Result<RegistrantDetail, MbkmError> {
        let student = self.backend.store().student(&registration.nim)?;
        Ok(RegistrantDetail::build(
            &Registrant::new(registration, student),
            &self.catalog,
        ))
    }

    /// Insert or replace a student.
    pub fn put_student(&mut self, student: Student) -> Result<(), MbkmError> {
        if student.nim.trim().is_empty() {
            return Err(MbkmError::InvalidInput("NIM is required".to_string()));
        }
        self.write(|store| store.put_student(student))
    }

    pub fn create_registrant(
        &mut self,
        input: NewRegistration,
        now: NaiveDateTime,
    ) -> Result<RegistrantDetail, MbkmError> {
        let nim = input.nim.trim().to_string();
        if nim.is_empty() {
            return Err(MbkmError::InvalidInput("NIM is required".to_string()));
        }

        let id = self.backend.store_mut().allocate_registration_id()?;
        let mut registration = Registration::new(id, nim, now);
        registration.activity_type = clean(input.activity_type);
        registration.placement = clean(input.placement);
        registration.academic_year = clean(input.academic_year);
        registration.semester = input.semester;
        registration.phone = clean(input.phone);
        registration.payment_proof = clean(input.payment_proof);

        self.save(registration.clone())?;
        self.detail(registration)
    }

    /// Patch a registration. Unset fields keep their stored value.
    pub fn update_registrant(
        &mut self,
        id: RegistrationId,
        update: RegistrationUpdate,
        now: NaiveDateTime,
    ) -> Result<RegistrantDetail, MbkmError> {
        let mut registration = self.load_registration(id)?;
        update.apply(&mut registration);
        registration.updated_at = now;
        self.save(registration.clone())?;
        self.detail(registration)
    }

    /// Remove a registration and its logbook entries.
    pub fn delete_registrant(&mut self, id: RegistrationId) -> Result<DeletedRegistrant, MbkmError> {
        self.write(|store| {
            if store.registration(id)?.is_none() {
                return Err(MbkmError::RegistrationNotFound(id));
            }
            let logbooks_removed = store.remove_logbooks_for(id)?;
            let removed = store
                .remove_registration(id)?
                .ok_or(MbkmError::RegistrationNotFound(id))?;
            Ok(DeletedRegistrant {
                id,
                logbooks_removed,
                files: stored_files(&removed),
            })
        })
    }

    /// Assess a registration. The grade defaults to `A`.
    pub fn approve(
        &mut self,
        id: RegistrationId,
        grade: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<RegistrantDetail, MbkmError> {
        let grade = grade
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or(DEFAULT_GRADE);
        let mut registration = self.load_registration(id)?;
        mark_approved(&mut registration, grade, now);
        self.save(registration.clone())?;
        self.detail(registration)
    }

    /// Record a rejection. The lifecycle status is unaffected.
    pub fn reject(
        &mut self,
        id: RegistrationId,
        reason: &str,
        now: NaiveDateTime,
    ) -> Result<RegistrantDetail, MbkmError> {
        let reason = validate_reason(reason)?;
        let mut registration = self.load_registration(id)?;
        mark_rejected(&mut registration, reason, now);
        self.save(registration.clone())?;
        self.detail(registration)
    }

    /// Mark the payment proof as checked.
    pub fn verify_payment(
        &mut self,
        id: RegistrationId,
        now: NaiveDateTime,
    ) -> Result<RegistrantDetail, MbkmError> {
        let mut registration = self.load_registration(id)?;
        if !is_present(registration.payment_proof.as_deref()) {
            return Err(MbkmError::InvalidState(format!(
                "registration {} has no payment proof",
                id
            )));
        }
        registration.payment_verified = true;
        registration.payment_verified_at = Some(now);
        registration.payment_rejection_reason = None;
        registration.updated_at = now;
        self.save(registration.clone())?;
        self.detail(registration)
    }

    /// Reject the payment proof. The proof is cleared, which moves the
    /// registration back to awaiting payment unless it already has a report
    /// or a score.
    pub fn reject_payment(
        &mut self,
        id: RegistrationId,
        reason: &str,
        now: NaiveDateTime,
    ) -> Result<RegistrantDetail, MbkmError> {
        let reason = validate_reason(reason)?;
        let mut registration = self.load_registration(id)?;
        registration.payment_verified = false;
        registration.payment_verified_at = None;
        registration.payment_rejection_reason = Some(reason);
        registration.payment_proof = None;
        registration.updated_at = now;
        self.save(registration.clone())?;
        self.detail(registration)
    }

    /// Attach a final report and/or a video link.
    pub fn upload_report(
        &mut self,
        id: RegistrationId,
        upload: ReportUpload,
        now: NaiveDateTime,
    ) -> Result<ReportChange, MbkmError> {
        let report = clean(upload.report);
        let video_url = clean(upload.video_url);
        if report.is_none() && video_url.is_none() {
            return Err(MbkmError::InvalidInput(
                "a report or a video URL is required".to_string(),
            ));
        }

        let mut registration = self.load_registration(id)?;
        let mut replaced = None;
        if let Some(report) = report {
            replaced = registration
                .report
                .replace(report)
                .filter(|old| !old.is_empty());
        }
        if video_url.is_some() {
            registration.video_url = video_url;
        }
        registration.updated_at = now;
        let view = ReportView::build(&registration);
        self.save(registration)?;
        Ok(ReportChange {
            report: view,
            replaced,
        })
    }

    /// Remove the report and video link. Returns the removed document
    /// reference; a registration without a report is left unchanged.
    pub fn delete_report(
        &mut self,
        id: RegistrationId,
        now: NaiveDateTime,
    ) -> Result<Option<String>, MbkmError> {
        let mut registration = self.load_registration(id)?;
        let Some(removed) = registration.report.take().filter(|r| !r.is_empty()) else {
            return Ok(None);
        };
        registration.video_url = None;
        registration.updated_at = now;
        self.save(registration)?;
        Ok(Some(removed))
    }

    // -------------------------------------------------------------------------
    // Bulk actions
    // -------------------------------------------------------------------------

    /// Approve every selected registration that has no score yet. Returns
    /// the number approved.
    pub fn bulk_approve(
        &mut self,
        ids: &[RegistrationId],
        now: NaiveDateTime,
    ) -> Result<usize, MbkmError> {
        validate_ids(ids)?;
        let unique: BTreeSet<RegistrationId> = ids.iter().copied().collect();
        self.write(|store| {
            let mut approved = 0;
            for id in unique {
                let Some(mut registration) = store.registration(id)? else {
                    continue;
                };
                if is_present(registration.score.as_deref()) {
                    continue;
                }
                mark_approved(&mut registration, DEFAULT_GRADE, now);
                store.put_registration(registration)?;
                approved += 1;
            }
            Ok(approved)
        })
    }

    /// Record a rejection on every selected registration. Returns the number
    /// updated.
    pub fn bulk_reject(
        &mut self,
        ids: &[RegistrationId],
        reason: &str,
        now: NaiveDateTime,
    ) -> Result<usize, MbkmError> {
        validate_ids(ids)?;
        let reason = validate_reason(reason)?;
        let unique: BTreeSet<RegistrationId> = ids.iter().copied().collect();
        self.write(|store| {
            let mut rejected = 0;
            for id in unique {
                let Some(mut registration) = store.registration(id)? else {
                    continue;
                };
                mark_rejected(&mut registration, reason.clone(), now);
                store.put_registration(registration)?;
                rejected += 1;
            }
            Ok(rejected)
        })
    }

    /// Delete every selected registration with its logbook entries.
    pub fn bulk_delete(&mut self, ids: &[RegistrationId]) -> Result<BulkDeletion, MbkmError> {
        validate_ids(ids)?;
        let unique: BTreeSet<RegistrationId> = ids.iter().copied().collect();
        self.write(|store| {
            let mut outcome = BulkDeletion::default();
            for id in unique {
                if store.registration(id)?.is_none() {
                    continue;
                }
                outcome.logbooks_removed += store.remove_logbooks_for(id)?;
                if let Some(removed) = store.remove_registration(id)? {
                    outcome.files.extend(stored_files(&removed));
                    outcome.deleted += 1;
                }
            }
            Ok(outcome)
        })
    }

    // -------------------------------------------------------------------------
    // Logbook mutations
    // -------------------------------------------------------------------------

    /// Store a logbook entry for a registration.
    ///
    /// An unset week is derived from the registration date and the activity
    /// date. Activity name and objective are trimmed and capitalized.
    pub fn create_logbook(
        &mut self,
        registration_id: RegistrationId,
        input: NewLogbookEntry,
        now: NaiveDateTime,
    ) -> Result<LogbookRow, MbkmError> {
        let registration = self.load_registration(registration_id)?;
        if input.week == Some(0) {
            return Err(MbkmError::InvalidInput("week numbers start at 1".to_string()));
        }

        self.write(|store| {
            let id = store.allocate_logbook_id()?;
            let mut entry = LogbookEntry::new(id, registration_id);
            entry.week = input.week.or_else(|| {
                input
                    .activity_date
                    .map(|date| assign_week(registration.created_at, date))
            });
            entry.activity_date = input.activity_date;
            entry.activity_name = capitalized(input.activity_name);
            entry.objective = capitalized(input.objective);
            entry.notes = clean(input.notes);
            entry.conclusion = clean(input.conclusion);
            entry.created_at = Some(now);

            let row = LogbookRow::build(&entry);
            store.put_logbook(entry)?;
            Ok(row)
        })
    }

    // -------------------------------------------------------------------------
    // Import
    // -------------------------------------------------------------------------

    /// Load a batch of records, keeping their ids. Logbook entries whose
    /// registration is neither stored nor part of the batch are rejected
    /// before anything is written. Entries without a week get one derived
    /// from their activity date, as in [`Dashboard::create_logbook`].
    pub fn import(&mut self, seed: Seed) -> Result<ImportSummary, MbkmError> {
        self.write(|store| {
            let mut registered: BTreeMap<RegistrationId, NaiveDateTime> = seed
                .registrations
                .iter()
                .map(|r| (r.id, r.created_at))
                .collect();
            for entry in &seed.logbooks {
                if !registered.contains_key(&entry.registration_id) {
                    let owner = store
                        .registration(entry.registration_id)?
                        .ok_or(MbkmError::RegistrationNotFound(entry.registration_id))?;
                    registered.insert(owner.id, owner.created_at);
                }
            }

            let summary = ImportSummary {
                students: seed.students.len(),
                registrations: seed.registrations.len(),
                logbooks: seed.logbooks.len(),
            };
            for student in seed.students {
                store.put_student(student)?;
            }
            for registration in seed.registrations {
                store.put_registration(registration)?;
            }
            for mut entry in seed.logbooks {
                entry.week = entry.week.or_else(|| {
                    let registered_at = registered.get(&entry.registration_id)?;
                    Some(assign_week(*registered_at, entry.activity_date?))
                });
                store.put_logbook(entry)?;
            }
            Ok(summary)
        })
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn mark_approved(registration: &mut Registration, grade: &str, now: NaiveDateTime) {
    registration.score = Some(grade.to_string());
    registration.approved_at = Some(now);
    registration.updated_at = now;
}

fn mark_rejected(registration: &mut Registration, reason: String, now: NaiveDateTime) {
    registration.rejection_reason = Some(reason);
    registration.rejected_at = Some(now);
    registration.updated_at = now;
}

/// Report and payment-proof references of a registration.
fn stored_files(registration: &Registration) -> Vec<String> {
    [&registration.report, &registration.payment_proof]
        .into_iter()
        .filter_map(|f| f.clone())
        .filter(|f| !f.is_empty())
        .collect()
}

/// Distinct academic years, newest first, headed by an "all" option.
fn academic_year_options(registrants: &[Registrant], all_label: &str) -> Vec<FilterOption> {
    let years: BTreeSet<&str> = registrants
        .iter()
        .filter_map(|r| r.registration.academic_year.as_deref())
        .filter(|y| !y.trim().is_empty())
        .collect();
    std::iter::once(FilterOption::all(all_label))
        .chain(years.into_iter().rev().map(|y| FilterOption::new(y, y)))
        .collect()
}

/// `community_service` -> `Community Service`.
fn title_case(code: &str) -> String {
    code.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::filter::PageRequest;
    use crate::status::ReportStatus;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(9, 0, 0))
            .unwrap()
    }

    fn student(nim: &str, name: &str, gender: &str, prodi: u32) -> Student {
        let mut s = Student::new(nim);
        s.full_name = Some(name.to_string());
        s.gender_code = Some(gender.to_string());
        s.prodi_id = Some(prodi);
        s
    }

    fn registration(nim: &str, placement: &str, year: &str) -> NewRegistration {
        NewRegistration {
            nim: nim.to_string(),
            activity_type: Some("magang".to_string()),
            placement: Some(placement.to_string()),
            academic_year: Some(year.to_string()),
            semester: Some(Semester::Ganjil),
            ..NewRegistration::default()
        }
    }

    /// Three registrants: awaiting payment, active, completed.
    fn seeded() -> Dashboard {
        let mut d = Dashboard::new();
        d.put_student(student("E1E120001", "Siti Aminah", "P", 1)).unwrap();
        d.put_student(student("E1E120002", "Rahmat", "L", 2)).unwrap();
        d.put_student(student("E1E120003", "Dewi", "P", 1)).unwrap();

        d.create_registrant(registration("E1E120001", "Kendari", "2024/2025"), at(2024, 8, 1))
            .unwrap();
        let mut paid = registration("E1E120002", "Bank Sultra", "2024/2025");
        paid.payment_proof = Some("payments/2.png".to_string());
        d.create_registrant(paid, at(2024, 8, 2)).unwrap();
        d.create_registrant(registration("E1E120003", "Kendari", "2023/2024"), at(2024, 8, 3))
            .unwrap();
        d.approve(RegistrationId(3), None, at(2024, 9, 1)).unwrap();
        d
    }

    #[test]
    fn dashboard_statistics_cover_filtered_set() {
        let d = seeded();
        let query = DashboardQuery {
            page: PageRequest::new(Some(1), Some(1)),
            ..DashboardQuery::default()
        };
        let data = d.dashboard_data(&query).unwrap();
        assert_eq!(data.students.data.len(), 1);
        assert_eq!(data.students.pagination.total, 3);
        assert_eq!(data.statistics.total, 3);
        assert_eq!(data.statistics.partners, 2);
        // newest first
        assert_eq!(data.students.data[0].id, RegistrationId(3));

        let kendari = DashboardQuery {
            placement: Some("Kendari".to_string()),
            ..DashboardQuery::default()
        };
        let data = d.dashboard_data(&kendari).unwrap();
        assert_eq!(data.statistics.total, 2);
        assert_eq!(data.statistics.completed, 1);
        assert_eq!(data.filters.placements[0].label, "Semua Penempatan");
        assert_eq!(data.filters.academic_years[1].value, "2024/2025");
    }

    #[test]
    fn approval_is_visible_through_the_cache() {
        let mut d = seeded();
        let before = d.dashboard_summary().unwrap();
        assert_eq!(before.completed, 1);
        assert_eq!(before.active, 1);
        // second read is served from the cache
        let _ = d.dashboard_summary().unwrap();
        assert_eq!(d.cache_stats().hits, 1);

        d.approve(RegistrationId(2), Some("B"), at(2024, 9, 2)).unwrap();
        let after = d.dashboard_summary().unwrap();
        assert_eq!(after.completed, 2);
        assert_eq!(after.active, 0);
        assert_eq!(after.completion_rate.to_string(), "66.67");
    }

    #[test]
    fn status_filter_agrees_with_rows() {
        let d = seeded();
        let query = RegistrantQuery {
            status: Some(RegistrationStatus::Active),
            ..RegistrantQuery::default()
        };
        let page = d.registrants(&query).unwrap();
        assert_eq!(page.data.len(), 1);
        assert!(page.data.iter().all(|r| r.status == RegistrationStatus::Active));

        let active = d.students_by_status(RegistrationStatus::Active).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].nim, "E1E120002");
    }

    #[test]
    fn registrant_statistics_rates() {
        let d = seeded();
        let stats = d.registrant_statistics().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.awaiting_payment, 1);
        assert_eq!(stats.completion_rate.to_string(), "33.33");
        assert_eq!(stats.payment_rate.to_string(), "66.67");
    }

    #[test]
    fn search_limits_and_ignores_blank() {
        let d = seeded();
        assert!(d.search("   ").unwrap().is_empty());
        let hits = d.search("KENDARI").unwrap();
        assert_eq!(hits.len(), 2);
        assert!(d.search(&"x".repeat(200)).is_err());
    }

    #[test]
    fn reject_requires_reason() {
        let mut d = seeded();
        assert!(matches!(
            d.reject(RegistrationId(1), "  ", at(2024, 9, 1)),
            Err(MbkmError::InvalidInput(_))
        ));
        assert!(d.reject(RegistrationId(1), &"x".repeat(501), at(2024, 9, 1)).is_err());

        let detail = d
            .reject(RegistrationId(1), " Incomplete documents ", at(2024, 9, 1))
            .unwrap();
        assert_eq!(detail.rejection_reason.as_deref(), Some("Incomplete documents"));
        assert_eq!(detail.row.status, RegistrationStatus::AwaitingPayment);
    }

    #[test]
    fn payment_review() {
        let mut d = seeded();
        assert!(matches!(
            d.verify_payment(RegistrationId(1), at(2024, 9, 1)),
            Err(MbkmError::InvalidState(_))
        ));
        let verified = d.verify_payment(RegistrationId(2), at(2024, 9, 1)).unwrap();
        assert!(verified.payment_verified);

        let rejected = d
            .reject_payment(RegistrationId(2), "Blurry proof", at(2024, 9, 2))
            .unwrap();
        assert!(!rejected.payment_verified);
        assert_eq!(rejected.payment_proof, None);
        assert_eq!(rejected.row.status, RegistrationStatus::AwaitingPayment);
    }

    #[test]
    fn report_upload_and_delete() {
        let mut d = seeded();
        let first = d
            .upload_report(
                RegistrationId(2),
                ReportUpload {
                    report: Some("reports/v1.pdf".to_string()),
                    video_url: Some("https://video.example/1".to_string()),
                },
                at(2024, 10, 1),
            )
            .unwrap();
        assert_eq!(first.replaced, None);
        assert_eq!(first.report.status, ReportStatus::Submitted);
        assert_eq!(first.report.submission_date, NaiveDate::from_ymd_opt(2024, 10, 1));

        let second = d
            .upload_report(
                RegistrationId(2),
                ReportUpload {
                    report: Some("reports/v2.pdf".to_string()),
                    video_url: None,
                },
                at(2024, 10, 2),
            )
            .unwrap();
        assert_eq!(second.replaced.as_deref(), Some("reports/v1.pdf"));
        assert_eq!(
            d.report(RegistrationId(2)).unwrap().video_url.as_deref(),
            Some("https://video.example/1")
        );

        let removed = d.delete_report(RegistrationId(2), at(2024, 10, 3)).unwrap();
        assert_eq!(removed.as_deref(), Some("reports/v2.pdf"));
        assert_eq!(d.report(RegistrationId(2)).unwrap().video_url, None);
        assert_eq!(d.delete_report(RegistrationId(2), at(2024, 10, 3)).unwrap(), None);
    }

    #[test]
    fn delete_cascades_and_returns_files() {
        let mut d = seeded();
        d.create_logbook(RegistrationId(2), NewLogbookEntry::default(), at(2024, 8, 5))
            .unwrap();
        d.create_logbook(RegistrationId(1), NewLogbookEntry::default(), at(2024, 8, 5))
            .unwrap();

        let deleted = d.delete_registrant(RegistrationId(2)).unwrap();
        assert_eq!(deleted.logbooks_removed, 1);
        assert_eq!(deleted.files, vec!["payments/2.png".to_string()]);
        assert_eq!(d.logbook_count().unwrap(), 1);
        assert!(matches!(
            d.registrant_detail(RegistrationId(2)),
            Err(MbkmError::RegistrationNotFound(_))
        ));
    }

    #[test]
    fn bulk_approve_skips_scored() {
        let mut d = seeded();
        let ids = [RegistrationId(1), RegistrationId(2), RegistrationId(3), RegistrationId(99)];
        assert_eq!(d.bulk_approve(&ids, at(2024, 9, 5)).unwrap(), 2);
        assert_eq!(d.dashboard_summary().unwrap().completed, 3);
        assert!(d.bulk_approve(&[], at(2024, 9, 5)).is_err());
    }

    #[test]
    fn bulk_reject_and_delete() {
        let mut d = seeded();
        let ids = [RegistrationId(1), RegistrationId(1), RegistrationId(2)];
        assert_eq!(d.bulk_reject(&ids, "Late", at(2024, 9, 5)).unwrap(), 2);
        assert!(d.bulk_reject(&ids, "", at(2024, 9, 5)).is_err());

        let outcome = d.bulk_delete(&ids).unwrap();
        assert_eq!(outcome.deleted, 2);
        assert_eq!(outcome.files, vec!["payments/2.png".to_string()]);
        assert_eq!(d.registration_count().unwrap(), 1);
    }

    #[test]
    fn create_logbook_assigns_week_and_capitalizes() {
        let mut d = seeded();
        let row = d
            .create_logbook(
                RegistrationId(1),
                NewLogbookEntry {
                    activity_date: NaiveDate::from_ymd_opt(2024, 8, 16),
                    activity_name: Some("  observasi kelas".to_string()),
                    objective: Some("mengenal siswa".to_string()),
                    ..NewLogbookEntry::default()
                },
                at(2024, 8, 16),
            )
            .unwrap();
        // registered 2024-08-01: 15 days later is week 3
        assert_eq!(row.week, Some(3));
        assert_eq!(row.activity_name.as_deref(), Some("Observasi kelas"));
        assert_eq!(row.objective.as_deref(), Some("Mengenal siswa"));
        assert_eq!(row.completion_percentage, 50);

        let explicit = d
            .create_logbook(
                RegistrationId(1),
                NewLogbookEntry {
                    week: Some(7),
                    activity_date: NaiveDate::from_ymd_opt(2024, 8, 16),
                    ..NewLogbookEntry::default()
                },
                at(2024, 8, 16),
            )
            .unwrap();
        assert_eq!(explicit.week, Some(7));
        assert!(
            d.create_logbook(RegistrationId(42), NewLogbookEntry::default(), at(2024, 8, 16))
                .is_err()
        );
    }

    #[test]
    fn logbook_overview_and_statistics() {
        let mut d = seeded();
        for (week, filled) in [(1, 4), (2, 2), (3, 0), (4, 4)] {
            let mut input = NewLogbookEntry {
                week: Some(week),
                ..NewLogbookEntry::default()
            };
            let fields = [
                &mut input.activity_name,
                &mut input.objective,
                &mut input.notes,
                &mut input.conclusion,
            ];
            for field in fields.into_iter().take(filled) {
                *field = Some("<b>isi</b>".to_string());
            }
            d.create_logbook(RegistrationId(2), input, at(2024, 8, 20)).unwrap();
        }

        let overview = d.logbook_overview(&LogbookQuery::default()).unwrap();
        assert_eq!(overview.students.pagination.total, 3);
        let card = overview
            .students
            .data
            .iter()
            .find(|c| c.student.id == RegistrationId(2))
            .unwrap();
        assert_eq!(card.logbook_stats.total, 4);
        assert_eq!(card.recent_logbooks.len(), 3);
        assert_eq!(card.recent_logbooks[0].week, Some(4));
        assert_eq!(card.recent_logbooks[0].activity_name.as_deref(), Some("isi"));
        assert_eq!(overview.statistics.total_logbooks, 4);
        assert_eq!(overview.statistics.total_students, 1);
        assert_eq!(overview.filters.study_programs.len(), 3);

        let stats = d.logbook_statistics().unwrap();
        assert_eq!(stats.completed_logbooks, 2);
        assert_eq!(stats.completion_rate.to_string(), "50.0");

        let student = d.student_logbooks(RegistrationId(2)).unwrap();
        assert_eq!(student.logbooks[0].week, Some(4));
        assert_eq!(student.statistics.average_completion.to_string(), "62.5");

        let detail = d.logbook_detail(student.logbooks[0].id).unwrap();
        assert_eq!(detail.student.nim, "E1E120002");
        assert!(matches!(
            d.logbook_detail(LogbookId(999)),
            Err(MbkmError::LogbookNotFound(_))
        ));
    }

    #[test]
    fn filter_options_lists() {
        let d = seeded();
        let options = d.filter_options().unwrap();
        assert_eq!(options.academic_years[0].label, "All Academic Years");
        assert_eq!(options.academic_years[1].value, "2024/2025");
        assert_eq!(options.academic_years[2].value, "2023/2024");
        assert_eq!(options.semesters[1].label, "Odd Semester");
        assert_eq!(options.statuses.len(), 5);
        assert_eq!(options.statuses[1].value, "awaiting_payment");
        assert_eq!(options.activity_types[1].label, "Magang");
        assert_eq!(options.study_programs.len(), 11);
    }

    #[test]
    fn exports_follow_selection_and_filters() {
        let mut d = seeded();
        d.create_logbook(
            RegistrationId(1),
            NewLogbookEntry {
                week: Some(1),
                activity_name: Some("Observasi".to_string()),
                ..NewLogbookEntry::default()
            },
            at(2024, 8, 5),
        )
        .unwrap();

        let all = d.export_registrants(None, at(2024, 10, 1)).unwrap();
        assert_eq!(all.rows, 3);
        let some = d
            .export_registrants(Some(&[RegistrationId(2)]), at(2024, 10, 1))
            .unwrap();
        assert_eq!(some.rows, 1);
        assert!(some.content.contains("\"E1E120002\""));

        let logbooks = d.export_logbooks(&LogbookQuery::default(), at(2024, 10, 1)).unwrap();
        assert_eq!(logbooks.rows, 1);
        let none = d
            .export_logbooks(
                &LogbookQuery {
                    academic_year: Some("2023/2024".to_string()),
                    ..LogbookQuery::default()
                },
                at(2024, 10, 1),
            )
            .unwrap();
        assert_eq!(none.rows, 0);
        assert!(none.verify());
    }

    #[test]
    fn import_keeps_ids_and_checks_owners() {
        let mut d = Dashboard::new();
        let mut reg = Registration::new(RegistrationId(40), "E1E120040", at(2024, 8, 1));
        reg.payment_proof = Some("p.png".to_string());
        let seed = Seed {
            students: vec![student("E1E120040", "Budi", "L", 4)],
            registrations: vec![reg],
            logbooks: vec![LogbookEntry::new(LogbookId(7), RegistrationId(40))],
        };
        let summary = d.import(seed).unwrap();
        assert_eq!(summary.registrations, 1);
        assert_eq!(
            d.registrant_detail(RegistrationId(40)).unwrap().registrant.row.name,
            "Budi"
        );

        let orphan = Seed {
            logbooks: vec![LogbookEntry::new(LogbookId(8), RegistrationId(41))],
            ..Seed::default()
        };
        assert!(matches!(
            d.import(orphan),
            Err(MbkmError::RegistrationNotFound(RegistrationId(41)))
        ));

        let created = d
            .create_registrant(registration("E1E120041", "Kendari", "2024/2025"), at(2024, 8, 2))
            .unwrap();
        assert_eq!(created.row.id, RegistrationId(41));
    }

    #[test]
    fn dashboard_export_follows_filters() {
        let d = seeded();

        let all = d.export_dashboard(&DashboardQuery::default(), at(2024, 10, 1)).unwrap();
        assert_eq!(all.rows, 3);
        assert!(all.filters.is_empty());

        let query = DashboardQuery {
            academic_year: Some("2024/2025".to_string()),
            placement: Some("Kendari".to_string()),
            prodi: Some(1),
            // pagination never narrows an export
            page: PageRequest::new(Some(5), Some(1)),
            ..DashboardQuery::default()
        };
        let narrowed = d.export_dashboard(&query, at(2024, 10, 1)).unwrap();
        assert_eq!(narrowed.rows, 1);
        assert!(narrowed.content.contains("\"E1E120001\""));
        assert!(!narrowed.content.contains("\"E1E120003\""));
        assert_eq!(narrowed.filters.len(), 3);
        assert_eq!(narrowed.filters[0], "Tahun Akademik: 2024/2025");
        assert!(narrowed.filters[1].starts_with("Program Studi: "));
        assert_eq!(narrowed.filters[2], "Penempatan: Kendari");
        assert!(narrowed.verify());

        let searched = DashboardQuery {
            search: Some("rahmat".to_string()),
            semester: Some(Semester::Ganjil),
            ..DashboardQuery::default()
        };
        let export = d.export_dashboard(&searched, at(2024, 10, 1)).unwrap();
        assert_eq!(export.rows, 1);
        assert_eq!(
            export.filters,
            vec!["Semester: Ganjil".to_string(), "Pencarian: \"rahmat\"".to_string()]
        );
    }

    #[test]
    fn imported_placement_with_whitespace_is_selectable() {
        let mut d = Dashboard::new();
        let mut reg = Registration::new(RegistrationId(1), "E1E120001", at(2024, 8, 1));
        reg.placement = Some("PT Telkom ".to_string());
        d.import(Seed {
            registrations: vec![reg],
            ..Seed::default()
        })
        .unwrap();

        let options = d.dashboard_data(&DashboardQuery::default()).unwrap().filters;
        let offered = options
            .placements
            .iter()
            .find(|o| o.label == "PT Telkom")
            .unwrap()
            .value
            .clone();

        let selected = d
            .dashboard_data(&DashboardQuery {
                placement: Some(offered),
                ..DashboardQuery::default()
            })
            .unwrap();
        assert_eq!(selected.statistics.total, 1);
    }

    #[test]
    fn import_assigns_missing_weeks() {
        let mut d = Dashboard::new();
        let reg = Registration::new(RegistrationId(5), "E1E120005", at(2024, 8, 1));
        let mut dated = LogbookEntry::new(LogbookId(1), RegistrationId(5));
        dated.activity_date = NaiveDate::from_ymd_opt(2024, 8, 16);
        let mut numbered = LogbookEntry::new(LogbookId(2), RegistrationId(5));
        numbered.week = Some(9);
        numbered.activity_date = NaiveDate::from_ymd_opt(2024, 8, 16);
        let undated = LogbookEntry::new(LogbookId(3), RegistrationId(5));
        d.import(Seed {
            registrations: vec![reg],
            logbooks: vec![dated, numbered, undated],
            ..Seed::default()
        })
        .unwrap();

        // a second batch whose owner is already stored
        let mut later = LogbookEntry::new(LogbookId(4), RegistrationId(5));
        later.activity_date = NaiveDate::from_ymd_opt(2024, 8, 2);
        d.import(Seed {
            logbooks: vec![later],
            ..Seed::default()
        })
        .unwrap();

        let week = |id| d.logbook_detail(LogbookId(id)).unwrap().logbook.week;
        assert_eq!(week(1), Some(3));
        assert_eq!(week(2), Some(9));
        assert_eq!(week(3), None);
        assert_eq!(week(4), Some(1));
    }

    /// Memory store whose registration removals start failing once
    /// `removals_left` reaches zero.
    #[derive(Debug)]
    struct FailingStore {
        inner: MemoryStore,
        removals_left: usize,
    }

    impl Store for FailingStore {
        fn put_student(&mut self, student: Student) -> Result<(), MbkmError> {
            self.inner.put_student(student)
        }
        fn student(&self, nim: &str) -> Result<Option<Student>, MbkmError> {
            self.inner.student(nim)
        }
        fn students(&self) -> Result<Vec<Student>, MbkmError> {
            self.inner.students()
        }
        fn allocate_registration_id(&mut self) -> Result<RegistrationId, MbkmError> {
            self.inner.allocate_registration_id()
        }
        fn put_registration(&mut self, registration: Registration) -> Result<(), MbkmError> {
            self.inner.put_registration(registration)
        }
        fn registration(&self, id: RegistrationId) -> Result<Option<Registration>, MbkmError> {
            self.inner.registration(id)
        }
        fn registrations(&self) -> Result<Vec<Registration>, MbkmError> {
            self.inner.registrations()
        }
        fn remove_registration(
            &mut self,
            id: RegistrationId,
        ) -> Result<Option<Registration>, MbkmError> {
            if self.removals_left == 0 {
                return Err(MbkmError::IoError("disk full".to_string()));
            }
            self.removals_left -= 1;
            self.inner.remove_registration(id)
        }
        fn allocate_logbook_id(&mut self) -> Result<LogbookId, MbkmError> {
            self.inner.allocate_logbook_id()
        }
        fn put_logbook(&mut self, entry: LogbookEntry) -> Result<(), MbkmError> {
            self.inner.put_logbook(entry)
        }
        fn logbook(&self, id: LogbookId) -> Result<Option<LogbookEntry>, MbkmError> {
            self.inner.logbook(id)
        }
        fn logbooks(&self) -> Result<Vec<LogbookEntry>, MbkmError> {
            self.inner.logbooks()
        }
        fn logbooks_for(
            &self,
            registration: RegistrationId,
        ) -> Result<Vec<LogbookEntry>, MbkmError> {
            self.inner.logbooks_for(registration)
        }
        fn remove_logbooks_for(
            &mut self,
            registration: RegistrationId,
        ) -> Result<usize, MbkmError> {
            self.inner.remove_logbooks_for(registration)
        }
    }

    fn failing(removals_left: usize) -> Dashboard {
        let mut d = Dashboard::with_backend(StorageBackend::Custom(Box::new(FailingStore {
            inner: MemoryStore::new(),
            removals_left,
        })));
        for (day, nim) in [(1, "E1E120001"), (2, "E1E120002")] {
            d.create_registrant(registration(nim, "Kendari", "2024/2025"), at(2024, 8, day))
                .unwrap();
        }
        d
    }

    #[test]
    fn failed_bulk_delete_still_invalidates() {
        let mut d = failing(1);
        assert_eq!(d.dashboard_summary().unwrap().total, 2);
        assert_eq!(d.dashboard_summary().unwrap().total, 2);
        assert_eq!(d.cache_stats().hits, 1);

        let result = d.bulk_delete(&[RegistrationId(1), RegistrationId(2)]);
        assert!(matches!(result, Err(MbkmError::IoError(_))));
        // the first removal went through before the second failed
        assert_eq!(d.cache_stats().entries, 0);
        assert_eq!(d.dashboard_summary().unwrap().total, 1);
    }

    #[test]
    fn failed_delete_still_invalidates() {
        let mut d = failing(0);
        d.create_logbook(
            RegistrationId(1),
            NewLogbookEntry {
                week: Some(1),
                ..NewLogbookEntry::default()
            },
            at(2024, 8, 5),
        )
        .unwrap();
        assert_eq!(d.logbook_statistics().unwrap().total_logbooks, 1);

        assert!(d.delete_registrant(RegistrationId(1)).is_err());
        assert_eq!(d.logbook_statistics().unwrap().total_logbooks, 0);
        assert_eq!(d.registration_count().unwrap(), 2);
    }

    #[test]
    fn disabled_cache_still_answers() {
        let d = seeded().with_cache_ttl(Duration::ZERO);
        assert_eq!(d.dashboard_summary().unwrap().total, 3);
        assert_eq!(d.dashboard_summary().unwrap().total, 3);
        assert_eq!(d.cache_stats(), CacheStats::default());
    }

    #[test]
    fn title_case_codes() {
        assert_eq!(title_case("community_service"), "Community Service");
        assert_eq!(title_case("magang"), "Magang");
    }

    #[test]
    fn persistent_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.redb");
        {
            let mut d = Dashboard::with_redb(&path).unwrap();
            assert!(d.is_persistent());
            d.put_student(student("E1E120001", "Siti", "P", 1)).unwrap();
            d.create_registrant(registration("E1E120001", "Kendari", "2024/2025"), at(2024, 8, 1))
                .unwrap();
            d.approve(RegistrationId(1), None, at(2024, 9, 1)).unwrap();
        }
        let d = Dashboard::with_redb(&path).unwrap();
        let detail = d.registrant_detail(RegistrationId(1)).unwrap();
        assert_eq!(detail.registrant.row.score.as_deref(), Some("A"));
        assert_eq!(detail.registrant.row.status, RegistrationStatus::Completed);
    }
}
