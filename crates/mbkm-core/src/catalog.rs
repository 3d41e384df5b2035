//! # Catalog
//!
//! The display tables shared by every view and export: activity-type names,
//! study-program names and the placement → location reference table.
//!
//! A `Catalog` is built once (defaults, optionally extended from the
//! configuration file) and then only read. Nothing else in the crate holds
//! its own copy of these tables.

use std::collections::BTreeMap;

/// Name shown for a study-program id missing from the table.
pub const UNKNOWN_STUDY_PROGRAM: &str = "Program Studi Tidak Dikenal";

/// Location shown for a placement missing from the table.
pub const UNKNOWN_LOCATION: &str = "Lainnya";

const DEFAULT_ACTIVITY_TYPES: [(&str, &str); 6] = [
    ("magang", "Internship/Work Practice"),
    ("penelitian", "Research"),
    ("pertukaran", "Student Exchange"),
    ("kewirausahaan", "Entrepreneurship"),
    ("mengajar", "Teaching in Schools"),
    ("kkn", "Thematic Community Service"),
];

const DEFAULT_STUDY_PROGRAMS: [(u32, &str); 10] = [
    (1, "Pendidikan Bahasa Indonesia"),
    (2, "Pendidikan Matematika"),
    (3, "Pendidikan Fisika"),
    (4, "Pendidikan Biologi"),
    (5, "Pendidikan Kimia"),
    (6, "Pendidikan Bahasa Inggris"),
    (7, "Pendidikan Sejarah"),
    (8, "Pendidikan Geografi"),
    (9, "Pendidikan Olahraga"),
    (10, "Pendidikan Seni"),
];

const DEFAULT_LOCATIONS: [&str; 7] = [
    "Kendari",
    "Makassar",
    "Baubau",
    "Jakarta",
    "Yogyakarta",
    "Wakatobi",
    "Bitung",
];

/// Normalized lookup key for the placement table.
fn placement_key(placement: &str) -> String {
    placement.trim().to_uppercase()
}

/// Immutable display tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    /// Lower-cased activity code → display name.
    activity_types: BTreeMap<String, String>,
    study_programs: BTreeMap<u32, String>,
    /// Upper-cased, trimmed placement → location.
    locations: BTreeMap<String, String>,
    unknown_study_program: String,
    unknown_location: String,
}

impl Default for Catalog {
    fn default() -> Self {
        let activity_types = DEFAULT_ACTIVITY_TYPES
            .iter()
            .map(|(code, name)| ((*code).to_string(), (*name).to_string()))
            .collect();
        let study_programs = DEFAULT_STUDY_PROGRAMS
            .iter()
            .map(|(id, name)| (*id, (*name).to_string()))
            .collect();
        let locations = DEFAULT_LOCATIONS
            .iter()
            .map(|city| (placement_key(city), (*city).to_string()))
            .collect();
        Self {
            activity_types,
            study_programs,
            locations,
            unknown_study_program: UNKNOWN_STUDY_PROGRAM.to_string(),
            unknown_location: UNKNOWN_LOCATION.to_string(),
        }
    }
}

impl Catalog {
    /// Built-in tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with every table empty.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            activity_types: BTreeMap::new(),
            study_programs: BTreeMap::new(),
            locations: BTreeMap::new(),
            unknown_study_program: UNKNOWN_STUDY_PROGRAM.to_string(),
            unknown_location: UNKNOWN_LOCATION.to_string(),
        }
    }

    // -------------------------------------------------------------------------
    // Builders
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn with_activity_type(mut self, code: &str, name: impl Into<String>) -> Self {
        self.activity_types
            .insert(code.trim().to_lowercase(), name.into());
        self
    }

    #[must_use]
    pub fn with_study_program(mut self, id: u32, name: impl Into<String>) -> Self {
        self.study_programs.insert(id, name.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, placement: &str, location: impl Into<String>) -> Self {
        self.locations.insert(placement_key(placement), location.into());
        self
    }

    #[must_use]
    pub fn with_unknown_study_program(mut self, name: impl Into<String>) -> Self {
        self.unknown_study_program = name.into();
        self
    }

    #[must_use]
    pub fn with_unknown_location(mut self, name: impl Into<String>) -> Self {
        self.unknown_location = name.into();
        self
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Display name of an activity code. Case-insensitive; unknown codes are
    /// shown verbatim and an absent code as an empty string.
    #[must_use]
    pub fn activity_type_name(&self, code: Option<&str>) -> String {
        let Some(code) = code else {
            return String::new();
        };
        self.activity_types
            .get(&code.trim().to_lowercase())
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    #[must_use]
    pub fn study_program_name(&self, id: Option<u32>) -> &str {
        id.and_then(|id| self.study_programs.get(&id))
            .map(String::as_str)
            .unwrap_or(self.unknown_study_program.as_str())
    }

    /// Location of a placement by exact (trimmed, case-insensitive) match.
    #[must_use]
    pub fn location(&self, placement: Option<&str>) -> &str {
        placement
            .and_then(|p| self.locations.get(&placement_key(p)))
            .map(String::as_str)
            .unwrap_or(self.unknown_location.as_str())
    }

    /// Activity codes with their names, ordered by code.
    pub fn activity_types(&self) -> impl Iterator<Item = (&str, &str)> {
        self.activity_types
            .iter()
            .map(|(code, name)| (code.as_str(), name.as_str()))
    }

    /// Study programs ordered by id.
    pub fn study_programs(&self) -> impl Iterator<Item = (u32, &str)> {
        self.study_programs
            .iter()
            .map(|(id, name)| (*id, name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_lookup_is_case_insensitive() {
        let catalog = Catalog::new();
        assert_eq!(catalog.activity_type_name(Some("MAGANG")), "Internship/Work Practice");
        assert_eq!(catalog.activity_type_name(Some("kkn")), "Thematic Community Service");
        assert_eq!(catalog.activity_type_name(Some("bootcamp")), "bootcamp");
        assert_eq!(catalog.activity_type_name(None), "");
    }

    #[test]
    fn study_program_fallback() {
        let catalog = Catalog::new();
        assert_eq!(catalog.study_program_name(Some(2)), "Pendidikan Matematika");
        assert_eq!(catalog.study_program_name(Some(99)), UNKNOWN_STUDY_PROGRAM);
        assert_eq!(catalog.study_program_name(None), UNKNOWN_STUDY_PROGRAM);
    }

    #[test]
    fn location_is_exact_match() {
        let catalog = Catalog::new().with_location("Dinas Pendidikan Kota Kendari", "Kendari");
        assert_eq!(catalog.location(Some("  dinas pendidikan kota kendari ")), "Kendari");
        assert_eq!(catalog.location(Some("jakarta")), "Jakarta");
        // No substring guessing.
        assert_eq!(catalog.location(Some("SMA Negeri 1 Makassar")), UNKNOWN_LOCATION);
        assert_eq!(catalog.location(None), UNKNOWN_LOCATION);
    }

    #[test]
    fn builders_override_defaults() {
        let catalog = Catalog::empty()
            .with_study_program(1, "Teknik Informatika")
            .with_unknown_study_program("-");
        assert_eq!(catalog.study_program_name(Some(1)), "Teknik Informatika");
        assert_eq!(catalog.study_program_name(Some(2)), "-");
        assert_eq!(catalog.activity_types().count(), 0);
    }
}
