//! In-memory record store.

use super::Store;
use crate::types::{LogbookEntry, LogbookId, Registration, RegistrationId, Student};
use crate::MbkmError;
use std::collections::BTreeMap;

/// Volatile store over ordered maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    students: BTreeMap<String, Student>,
    registrations: BTreeMap<RegistrationId, Registration>,
    logbooks: BTreeMap<LogbookId, LogbookEntry>,
    next_registration_id: u64,
    next_logbook_id: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_registration_id: 1,
            next_logbook_id: 1,
            ..Self::default()
        }
    }
}

impl Store for MemoryStore {
    fn put_student(&mut self, student: Student) -> Result<(), MbkmError> {
        self.students.insert(student.nim.clone(), student);
        Ok(())
    }

    fn student(&self, nim: &str) -> Result<Option<Student>, MbkmError> {
        Ok(self.students.get(nim).cloned())
    }

    fn students(&self) -> Result<Vec<Student>, MbkmError> {
        Ok(self.students.values().cloned().collect())
    }

    fn allocate_registration_id(&mut self) -> Result<RegistrationId, MbkmError> {
        let id = self.next_registration_id.max(1);
        self.next_registration_id = id.saturating_add(1);
        Ok(RegistrationId(id))
    }

    fn put_registration(&mut self, registration: Registration) -> Result<(), MbkmError> {
        let id = registration.id.0;
        if id >= self.next_registration_id {
            self.next_registration_id = id.saturating_add(1);
        }
        self.registrations.insert(registration.id, registration);
        Ok(())
    }

    fn registration(&self, id: RegistrationId) -> Result<Option<Registration>, MbkmError> {
        Ok(self.registrations.get(&id).cloned())
    }

    fn registrations(&self) -> Result<Vec<Registration>, MbkmError> {
        Ok(self.registrations.values().cloned().collect())
    }

    fn remove_registration(
        &mut self,
        id: RegistrationId,
    ) -> Result<Option<Registration>, MbkmError> {
        Ok(self.registrations.remove(&id))
    }

    fn allocate_logbook_id(&mut self) -> Result<LogbookId, MbkmError> {
        let id = self.next_logbook_id.max(1);
        self.next_logbook_id = id.saturating_add(1);
        Ok(LogbookId(id))
    }

    fn put_logbook(&mut self, entry: LogbookEntry) -> Result<(), MbkmError> {
        let id = entry.id.0;
        if id >= self.next_logbook_id {
            self.next_logbook_id = id.saturating_add(1);
        }
        self.logbooks.insert(entry.id, entry);
        Ok(())
    }

    fn logbook(&self, id: LogbookId) -> Result<Option<LogbookEntry>, MbkmError> {
        Ok(self.logbooks.get(&id).cloned())
    }

    fn logbooks(&self) -> Result<Vec<LogbookEntry>, MbkmError> {
        Ok(self.logbooks.values().cloned().collect())
    }

    fn logbooks_for(&self, registration: RegistrationId) -> Result<Vec<LogbookEntry>, MbkmError> {
        Ok(self
            .logbooks
            .values()
            .filter(|e| e.registration_id == registration)
            .cloned()
            .collect())
    }

    fn remove_logbooks_for(&mut self, registration: RegistrationId) -> Result<usize, MbkmError> {
        let before = self.logbooks.len();
        self.logbooks.retain(|_, e| e.registration_id != registration);
        Ok(before - self.logbooks.len())
    }

    fn registration_count(&self) -> Result<usize, MbkmError> {
        Ok(self.registrations.len())
    }

    fn logbook_count(&self) -> Result<usize, MbkmError> {
        Ok(self.logbooks.len())
    }
}
