//! # Storage
//!
//! Record stores for students, registrations and logbook entries.
//!
//! - [`MemoryStore`]: `BTreeMap`-backed, volatile.
//! - [`RedbStore`]: disk-backed via redb, records encoded with postcard.
//!
//! Both implement [`Store`], and listings always come back in ascending id
//! order so every read model is deterministic.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::types::{LogbookEntry, LogbookId, Registration, RegistrationId, Student};
use crate::MbkmError;

/// Access to the stored records.
pub trait Store: std::fmt::Debug {
    // -------------------------------------------------------------------------
    // Students
    // -------------------------------------------------------------------------

    /// Insert or replace a student, keyed by NIM.
    fn put_student(&mut self, student: Student) -> Result<(), MbkmError>;

    fn student(&self, nim: &str) -> Result<Option<Student>, MbkmError>;

    /// All students, ordered by NIM.
    fn students(&self) -> Result<Vec<Student>, MbkmError>;

    // -------------------------------------------------------------------------
    // Registrations
    // -------------------------------------------------------------------------

    /// Reserve the next registration id.
    fn allocate_registration_id(&mut self) -> Result<RegistrationId, MbkmError>;

    /// Insert or replace a registration under its own id. Ids at or past the
    /// allocation counter move the counter forward.
    fn put_registration(&mut self, registration: Registration) -> Result<(), MbkmError>;

    fn registration(&self, id: RegistrationId) -> Result<Option<Registration>, MbkmError>;

    /// All registrations, ordered by id.
    fn registrations(&self) -> Result<Vec<Registration>, MbkmError>;

    /// Remove a registration. Its logbook entries are left in place; use
    /// [`Store::remove_logbooks_for`] first.
    fn remove_registration(
        &mut self,
        id: RegistrationId,
    ) -> Result<Option<Registration>, MbkmError>;

    // -------------------------------------------------------------------------
    // Logbook entries
    // -------------------------------------------------------------------------

    fn allocate_logbook_id(&mut self) -> Result<LogbookId, MbkmError>;

    /// Insert or replace an entry under its own id.
    fn put_logbook(&mut self, entry: LogbookEntry) -> Result<(), MbkmError>;

    fn logbook(&self, id: LogbookId) -> Result<Option<LogbookEntry>, MbkmError>;

    /// All entries, ordered by id.
    fn logbooks(&self) -> Result<Vec<LogbookEntry>, MbkmError>;

    /// Entries of one registration, ordered by id.
    fn logbooks_for(&self, registration: RegistrationId) -> Result<Vec<LogbookEntry>, MbkmError>;

    /// Remove every entry of a registration. Returns the number removed.
    fn remove_logbooks_for(&mut self, registration: RegistrationId) -> Result<usize, MbkmError>;

    // -------------------------------------------------------------------------
    // Counts
    // -------------------------------------------------------------------------

    fn registration_count(&self) -> Result<usize, MbkmError> {
        Ok(self.registrations()?.len())
    }

    fn logbook_count(&self) -> Result<usize, MbkmError> {
        Ok(self.logbooks()?.len())
    }
}
