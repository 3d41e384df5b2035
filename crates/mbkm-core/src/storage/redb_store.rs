//! # redb-backed Record Store
//!
//! A disk-backed store using the redb embedded database.
//!
//! Records are encoded with postcard. Logbook entries are keyed by
//! `(registration_id, logbook_id)` so the entries of one registration are a
//! single range scan; a second table maps each logbook id back to its owner
//! for point lookups.

use super::Store;
use crate::types::{LogbookEntry, LogbookId, Registration, RegistrationId, Student};
use crate::MbkmError;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for students: NIM -> serialized Student
const STUDENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("students");

/// Table for registrations: RegistrationId(u64) -> serialized Registration
const REGISTRATIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("registrations");

/// Table for logbooks: (registration_id, logbook_id) -> serialized LogbookEntry
const LOGBOOKS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("logbooks");

/// Table for logbook ownership: logbook_id -> registration_id
const LOGBOOK_OWNER: TableDefinition<u64, u64> = TableDefinition::new("logbook_owner");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_REGISTRATION_ID: &str = "next_registration_id";
const NEXT_LOGBOOK_ID: &str = "next_logbook_id";

/// A disk-backed record store using redb.
pub struct RedbStore {
    db: Database,
    next_registration_id: u64,
    next_logbook_id: u64,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("next_registration_id", &self.next_registration_id)
            .field("next_logbook_id", &self.next_logbook_id)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MbkmError> {
        let db = Database::create(path.as_ref()).map_err(|e| MbkmError::IoError(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(STUDENTS)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(REGISTRATIONS)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(LOGBOOKS)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(LOGBOOK_OWNER)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(METADATA)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
        }

        let read_txn = db
            .begin_read()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let (next_registration_id, next_logbook_id) = {
            let table = read_txn
                .open_table(METADATA)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            let registration = table
                .get(NEXT_REGISTRATION_ID)
                .map_err(|e| MbkmError::IoError(e.to_string()))?
                .map(|v| v.value())
                .unwrap_or(1);
            let logbook = table
                .get(NEXT_LOGBOOK_ID)
                .map_err(|e| MbkmError::IoError(e.to_string()))?
                .map(|v| v.value())
                .unwrap_or(1);
            (registration, logbook)
        };

        Ok(Self {
            db,
            next_registration_id,
            next_logbook_id,
        })
    }

    fn store_counter(&self, key: &str, value: u64) -> Result<(), MbkmError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        {
            let mut meta = write_txn
                .open_table(METADATA)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            meta.insert(key, value)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| MbkmError::IoError(e.to_string()))
    }

    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, MbkmError> {
        postcard::from_bytes(bytes).map_err(|e| MbkmError::SerializationError(e.to_string()))
    }

    fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, MbkmError> {
        postcard::to_allocvec(value).map_err(|e| MbkmError::SerializationError(e.to_string()))
    }
}

impl Store for RedbStore {
    fn put_student(&mut self, student: Student) -> Result<(), MbkmError> {
        let bytes = Self::encode(&student)?;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(STUDENTS)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            table
                .insert(student.nim.as_str(), bytes.as_slice())
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| MbkmError::IoError(e.to_string()))
    }

    fn student(&self, nim: &str) -> Result<Option<Student>, MbkmError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(STUDENTS)
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        match table
            .get(nim)
            .map_err(|e| MbkmError::IoError(e.to_string()))?
        {
            Some(data) => Ok(Some(Self::decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn students(&self) -> Result<Vec<Student>, MbkmError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(STUDENTS)
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let mut students = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| MbkmError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| MbkmError::IoError(e.to_string()))?;
            students.push(Self::decode(value.value())?);
        }
        Ok(students)
    }

    fn allocate_registration_id(&mut self) -> Result<RegistrationId, MbkmError> {
        let id = self.next_registration_id.max(1);
        let next = id.saturating_add(1);
        self.store_counter(NEXT_REGISTRATION_ID, next)?;
        self.next_registration_id = next;
        Ok(RegistrationId(id))
    }

    fn put_registration(&mut self, registration: Registration) -> Result<(), MbkmError> {
        let bytes = Self::encode(&registration)?;
        let id = registration.id.0;
        let advance = id >= self.next_registration_id;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(REGISTRATIONS)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            table
                .insert(id, bytes.as_slice())
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            if advance {
                let mut meta = write_txn
                    .open_table(METADATA)
                    .map_err(|e| MbkmError::IoError(e.to_string()))?;
                meta.insert(NEXT_REGISTRATION_ID, id.saturating_add(1))
                    .map_err(|e| MbkmError::IoError(e.to_string()))?;
            }
        }
        write_txn
            .commit()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;

        if advance {
            self.next_registration_id = id.saturating_add(1);
        }
        Ok(())
    }

    fn registration(&self, id: RegistrationId) -> Result<Option<Registration>, MbkmError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(REGISTRATIONS)
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        match table
            .get(id.0)
            .map_err(|e| MbkmError::IoError(e.to_string()))?
        {
            Some(data) => Ok(Some(Self::decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn registrations(&self) -> Result<Vec<Registration>, MbkmError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(REGISTRATIONS)
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let mut registrations = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| MbkmError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| MbkmError::IoError(e.to_string()))?;
            registrations.push(Self::decode(value.value())?);
        }
        Ok(registrations)
    }

    fn remove_registration(
        &mut self,
        id: RegistrationId,
    ) -> Result<Option<Registration>, MbkmError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let removed = {
            let mut table = write_txn
                .open_table(REGISTRATIONS)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            let removed = table
                .remove(id.0)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            match removed {
                Some(data) => Some(Self::decode::<Registration>(data.value())?),
                None => None,
            }
        };
        write_txn
            .commit()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        Ok(removed)
    }

    fn allocate_logbook_id(&mut self) -> Result<LogbookId, MbkmError> {
        let id = self.next_logbook_id.max(1);
        let next = id.saturating_add(1);
        self.store_counter(NEXT_LOGBOOK_ID, next)?;
        self.next_logbook_id = next;
        Ok(LogbookId(id))
    }

    fn put_logbook(&mut self, entry: LogbookEntry) -> Result<(), MbkmError> {
        let bytes = Self::encode(&entry)?;
        let id = entry.id.0;
        let owner = entry.registration_id.0;
        let advance = id >= self.next_logbook_id;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        {
            let mut owners = write_txn
                .open_table(LOGBOOK_OWNER)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            let mut logbooks = write_txn
                .open_table(LOGBOOKS)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;

            // Re-homing an entry drops the row under its previous owner.
            let previous = owners
                .insert(id, owner)
                .map_err(|e| MbkmError::IoError(e.to_string()))?
                .map(|v| v.value());
            if let Some(previous) = previous.filter(|p| *p != owner) {
                logbooks
                    .remove((previous, id))
                    .map_err(|e| MbkmError::IoError(e.to_string()))?;
            }
            logbooks
                .insert((owner, id), bytes.as_slice())
                .map_err(|e| MbkmError::IoError(e.to_string()))?;

            if advance {
                let mut meta = write_txn
                    .open_table(METADATA)
                    .map_err(|e| MbkmError::IoError(e.to_string()))?;
                meta.insert(NEXT_LOGBOOK_ID, id.saturating_add(1))
                    .map_err(|e| MbkmError::IoError(e.to_string()))?;
            }
        }
        write_txn
            .commit()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;

        if advance {
            self.next_logbook_id = id.saturating_add(1);
        }
        Ok(())
    }

    fn logbook(&self, id: LogbookId) -> Result<Option<LogbookEntry>, MbkmError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let owners = read_txn
            .open_table(LOGBOOK_OWNER)
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let Some(owner) = owners
            .get(id.0)
            .map_err(|e| MbkmError::IoError(e.to_string()))?
            .map(|v| v.value())
        else {
            return Ok(None);
        };
        let logbooks = read_txn
            .open_table(LOGBOOKS)
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        match logbooks
            .get((owner, id.0))
            .map_err(|e| MbkmError::IoError(e.to_string()))?
        {
            Some(data) => Ok(Some(Self::decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn logbooks(&self) -> Result<Vec<LogbookEntry>, MbkmError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(LOGBOOKS)
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let mut entries: Vec<LogbookEntry> = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| MbkmError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| MbkmError::IoError(e.to_string()))?;
            entries.push(Self::decode(value.value())?);
        }
        entries.sort_by_key(|e| e.id);
        Ok(entries)
    }

    fn logbooks_for(&self, registration: RegistrationId) -> Result<Vec<LogbookEntry>, MbkmError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(LOGBOOKS)
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let mut entries = Vec::new();
        for entry in table
            .range((registration.0, 0u64)..=(registration.0, u64::MAX))
            .map_err(|e| MbkmError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| MbkmError::IoError(e.to_string()))?;
            entries.push(Self::decode(value.value())?);
        }
        Ok(entries)
    }

    fn remove_logbooks_for(&mut self, registration: RegistrationId) -> Result<usize, MbkmError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let removed = {
            let mut logbooks = write_txn
                .open_table(LOGBOOKS)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;
            let mut owners = write_txn
                .open_table(LOGBOOK_OWNER)
                .map_err(|e| MbkmError::IoError(e.to_string()))?;

            let mut keys = Vec::new();
            for entry in logbooks
                .range((registration.0, 0u64)..=(registration.0, u64::MAX))
                .map_err(|e| MbkmError::IoError(e.to_string()))?
            {
                let (key, _) = entry.map_err(|e| MbkmError::IoError(e.to_string()))?;
                keys.push(key.value());
            }
            for (owner, id) in &keys {
                logbooks
                    .remove((*owner, *id))
                    .map_err(|e| MbkmError::IoError(e.to_string()))?;
                owners
                    .remove(*id)
                    .map_err(|e| MbkmError::IoError(e.to_string()))?;
            }
            keys.len()
        };
        write_txn
            .commit()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        Ok(removed)
    }

    fn registration_count(&self) -> Result<usize, MbkmError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(REGISTRATIONS)
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        Ok(table
            .len()
            .map_err(|e| MbkmError::IoError(e.to_string()))? as usize)
    }

    fn logbook_count(&self) -> Result<usize, MbkmError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(LOGBOOK_OWNER)
            .map_err(|e| MbkmError::IoError(e.to_string()))?;
        Ok(table
            .len()
            .map_err(|e| MbkmError::IoError(e.to_string()))? as usize)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::Semester;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn registration(id: u64) -> Registration {
        let created = NaiveDate::from_ymd_opt(2024, 8, 1)
            .and_then(|d| d.and_hms_opt(7, 15, 0))
            .unwrap();
        let mut reg = Registration::new(RegistrationId(id), format!("E1E12{id:04}"), created);
        reg.semester = Some(Semester::Genap);
        reg.payment_proof = Some("payments/proof.png".to_string());
        reg
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mbkm.redb");

        {
            let mut store = RedbStore::open(&path).unwrap();
            let mut student = Student::new("E1E120001");
            student.full_name = Some("Siti".to_string());
            store.put_student(student).unwrap();
            let id = store.allocate_registration_id().unwrap();
            store.put_registration(registration(id.0)).unwrap();

            let mut entry = LogbookEntry::new(store.allocate_logbook_id().unwrap(), id);
            entry.activity_date = NaiveDate::from_ymd_opt(2024, 8, 5);
            store.put_logbook(entry).unwrap();
        }

        let mut store = RedbStore::open(&path).unwrap();
        assert_eq!(store.registration_count().unwrap(), 1);
        let reg = store.registration(RegistrationId(1)).unwrap().unwrap();
        assert_eq!(reg.semester, Some(Semester::Genap));
        assert_eq!(
            store.student("E1E120001").unwrap().unwrap().full_name.as_deref(),
            Some("Siti")
        );
        let logbook = store.logbook(LogbookId(1)).unwrap().unwrap();
        assert_eq!(logbook.activity_date, NaiveDate::from_ymd_opt(2024, 8, 5));

        // Counters resume after reopen.
        assert_eq!(store.allocate_registration_id().unwrap(), RegistrationId(2));
        assert_eq!(store.allocate_logbook_id().unwrap(), LogbookId(2));
    }

    #[test]
    fn logbooks_are_grouped_by_registration() {
        let dir = tempdir().unwrap();
        let mut store = RedbStore::open(dir.path().join("mbkm.redb")).unwrap();
        store.put_registration(registration(1)).unwrap();
        store.put_registration(registration(2)).unwrap();
        for (id, owner) in [(1, 2), (2, 1), (3, 2), (4, 1)] {
            store
                .put_logbook(LogbookEntry::new(LogbookId(id), RegistrationId(owner)))
                .unwrap();
        }

        let ids: Vec<u64> = store
            .logbooks_for(RegistrationId(1))
            .unwrap()
            .iter()
            .map(|e| e.id.0)
            .collect();
        assert_eq!(ids, vec![2, 4]);

        let all: Vec<u64> = store.logbooks().unwrap().iter().map(|e| e.id.0).collect();
        assert_eq!(all, vec![1, 2, 3, 4]);

        assert_eq!(store.remove_logbooks_for(RegistrationId(2)).unwrap(), 2);
        assert_eq!(store.logbook_count().unwrap(), 2);
        assert!(store.logbook(LogbookId(1)).unwrap().is_none());
    }

    #[test]
    fn remove_registration_returns_record() {
        let dir = tempdir().unwrap();
        let mut store = RedbStore::open(dir.path().join("mbkm.redb")).unwrap();
        store.put_registration(registration(5)).unwrap();

        let removed = store.remove_registration(RegistrationId(5)).unwrap();
        assert_eq!(removed.map(|r| r.id), Some(RegistrationId(5)));
        assert!(store.registration(RegistrationId(5)).unwrap().is_none());
        assert!(store.remove_registration(RegistrationId(5)).unwrap().is_none());
    }
}
