use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::super::domain::{Application, NationalId, NewApplication, PhoneNumber};
use super::{poisoned, ApplicationStore, Ledger, StoreError};

/// Process-local store; contents are lost on restart.
#[derive(Debug, Default, Clone)]
pub struct InMemoryApplicationStore {
    ledger: Arc<Mutex<Ledger>>,
}

impl InMemoryApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored application in insertion order.
    pub fn applications(&self) -> Result<Vec<Application>, StoreError> {
        let guard = self.ledger.lock().map_err(poisoned)?;
        Ok(guard.applications().to_vec())
    }
}

impl ApplicationStore for InMemoryApplicationStore {
    fn create(&self, application: NewApplication) -> Result<Application, StoreError> {
        let mut guard = self.ledger.lock().map_err(poisoned)?;
        let record = guard.prepare(application, Utc::now())?;
        guard.commit(record.clone());
        Ok(record)
    }

    fn exists_by_phone(&self, phone: &PhoneNumber) -> Result<bool, StoreError> {
        let guard = self.ledger.lock().map_err(poisoned)?;
        Ok(guard.has_phone(phone))
    }

    fn exists_by_national_id(&self, national_id: &NationalId) -> Result<bool, StoreError> {
        let guard = self.ledger.lock().map_err(poisoned)?;
        Ok(guard.has_national_id(national_id))
    }

    fn count(&self) -> Result<usize, StoreError> {
        let guard = self.ledger.lock().map_err(poisoned)?;
        Ok(guard.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::intake::domain::{ApplicationId, FormField};
    use chrono::NaiveDate;

    fn new_application(phone: &str, national_id: &str) -> NewApplication {
        NewApplication {
            full_name: "Mehmet Demir".to_string(),
            phone: PhoneNumber::parse(phone).expect("valid phone"),
            birth_date: NaiveDate::from_ymd_opt(1980, 6, 1).expect("valid date"),
            is_existing_customer: false,
            national_id: NationalId::parse(national_id).expect("valid national id"),
        }
    }

    #[test]
    fn create_assigns_sequential_ids_and_timestamps() {
        let store = InMemoryApplicationStore::new();
        let first = store
            .create(new_application("5321234567", "10000000146"))
            .expect("first insert");
        let second = store
            .create(new_application("5339876543", "12345678950"))
            .expect("second insert");

        assert_eq!(first.id, ApplicationId(1));
        assert_eq!(second.id, ApplicationId(2));
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(store.count().expect("count"), 2);
    }

    #[test]
    fn create_reports_every_conflicting_field() {
        let store = InMemoryApplicationStore::new();
        store
            .create(new_application("5321234567", "10000000146"))
            .expect("first insert");

        match store.create(new_application("5321234567", "10000000146")) {
            Err(StoreError::Conflict { fields }) => {
                assert_eq!(fields, vec![FormField::Phone, FormField::NationalId]);
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        match store.create(new_application("5000000000", "10000000146")) {
            Err(StoreError::Conflict { fields }) => {
                assert_eq!(fields, vec![FormField::NationalId]);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(store.count().expect("count"), 1);
    }

    #[test]
    fn exists_lookups_use_normalized_values() {
        let store = InMemoryApplicationStore::new();
        store
            .create(new_application("532 123 45 67", "10000000146"))
            .expect("insert");

        let phone = PhoneNumber::parse("(532) 123-4567").expect("valid phone");
        let national_id = NationalId::parse("10000000146").expect("valid id");
        assert!(store.exists_by_phone(&phone).expect("lookup"));
        assert!(store.exists_by_national_id(&national_id).expect("lookup"));

        let other = PhoneNumber::parse("5551112233").expect("valid phone");
        assert!(!store.exists_by_phone(&other).expect("lookup"));
    }
}
