//! # mbkm-core
//!
//! The rules engine of the MBKM dashboard.
//!
//! This crate tracks student registrations into MBKM (Merdeka Belajar Kampus
//! Merdeka) activities and the weekly logbook entries submitted during a
//! placement. Everything an administrator sees is derived from the stored
//! records by three rule sets:
//!
//! - [`status`]: a registration's lifecycle label from its payment proof,
//!   report and score.
//! - [`completion`]: a logbook entry's completion from its four text fields.
//! - [`stats`]: folds of the two over collections.
//!
//! ## Architectural Constraints
//!
//! - The rules are total: absent or empty data is a defined branch, never an
//!   error.
//! - One implementation per rule. Rows, filters, statistics and exports all
//!   call the same classifier and scorer.
//! - No floats: rates and averages are fixed-point integers.
//! - No async, no network dependencies.

// =============================================================================
// MODULES
// =============================================================================

pub mod cache;
pub mod catalog;
pub mod completion;
pub mod dashboard;
pub mod export;
pub mod filter;
pub mod primitives;
pub mod stats;
pub mod status;
pub mod storage;
pub mod types;
pub mod view;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Gender, LogbookEntry, LogbookId, MbkmError, NewLogbookEntry, NewRegistration, Registrant,
    Registration, RegistrationId, RegistrationUpdate, Semester, Student,
};

// =============================================================================
// RE-EXPORTS: Rules
// =============================================================================

pub use completion::{Completion, CompletionStatus, assign_week};
pub use stats::{
    ActivityTypeSummary, DashboardSummary, GlobalLogbookStats, Hundredths, LogbookStats,
    RegistrationStats, StatusBreakdown, Tenths,
};
pub use status::{PaymentStatus, RegistrationStatus, ReportStatus, Severity};

// =============================================================================
// RE-EXPORTS: Service
// =============================================================================

pub use cache::{CacheStats, ReadThroughCache};
pub use catalog::Catalog;
pub use dashboard::{
    BulkDeletion, Dashboard, DeletedRegistrant, ImportSummary, ReportChange, ReportUpload, Seed,
    StorageBackend,
};
pub use export::CsvExport;
pub use filter::{
    DashboardQuery, FilterOption, FilterOptions, LogbookQuery, Page, PageRequest, Pagination,
    RegistrantQuery,
};
pub use storage::{MemoryStore, RedbStore, Store};
