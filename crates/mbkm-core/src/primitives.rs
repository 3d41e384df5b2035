//! # Primitives
//!
//! Fixed constants of the MBKM rules.
//!
//! These are compiled in and never change at runtime. Display tables that an
//! operator may want to tune (activity names, study programs, locations) live
//! in [`crate::catalog`] instead.

/// Number of free-text fields a logbook entry is scored on.
///
/// Activity name, objective, notes and conclusion.
pub const COMPLETION_FIELD_COUNT: u32 = 4;

/// Default page size for paginated listings.
pub const DEFAULT_PER_PAGE: usize = 15;

/// Largest page size a caller may request.
pub const MAX_PER_PAGE: usize = 100;

/// Maximum number of hits returned by a quick search.
pub const SEARCH_LIMIT: usize = 10;

/// Number of recent logbook entries shown per registration in overviews.
pub const RECENT_LOGBOOKS: usize = 3;

/// Characters of the activity name kept in a logbook summary.
pub const SUMMARY_MAX_CHARS: usize = 100;

/// Default lifetime of a cached read model, in seconds.
pub const CACHE_TTL_SECS: u64 = 300;

/// Longest cache lifetime a configuration may ask for, in seconds (one day).
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// Filter options change rarely and are cached this many times longer.
pub const FILTER_OPTIONS_TTL_FACTOR: u64 = 4;

/// Grade recorded by an approval that does not name one.
pub const DEFAULT_GRADE: &str = "A";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a rejection reason, in characters.
pub const MAX_REASON_LENGTH: usize = 500;

/// Maximum number of ids accepted by one bulk action.
pub const MAX_BULK_IDS: usize = 1000;

/// Maximum length of a search term, in characters.
pub const MAX_SEARCH_LENGTH: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_consistent() {
        assert!(DEFAULT_PER_PAGE <= MAX_PER_PAGE);
        assert!(RECENT_LOGBOOKS < DEFAULT_PER_PAGE);
        assert!(CACHE_TTL_SECS <= MAX_CACHE_TTL_SECS);
        assert_eq!(COMPLETION_FIELD_COUNT, 4);
    }
}
