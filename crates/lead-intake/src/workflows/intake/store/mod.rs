mod csv_file;
mod memory;

pub use csv_file::CsvApplicationStore;
pub use memory::InMemoryApplicationStore;

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationId, FormField, NationalId, NewApplication, PhoneNumber,
};

/// Storage abstraction so the service can be exercised in isolation. `create` must reject a
/// record whose phone or national identity number already exists, atomically with the insert.
pub trait ApplicationStore: Send + Sync {
    fn create(&self, application: NewApplication) -> Result<Application, StoreError>;
    fn exists_by_phone(&self, phone: &PhoneNumber) -> Result<bool, StoreError>;
    fn exists_by_national_id(&self, national_id: &NationalId) -> Result<bool, StoreError>;
    fn count(&self) -> Result<usize, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated on {fields:?}")]
    Conflict { fields: Vec<FormField> },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding error: {0}")]
    Csv(#[from] csv::Error),
}

/// Unique indexes plus the records they cover. Shared by the store implementations.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    applications: Vec<Application>,
    phones: HashSet<PhoneNumber>,
    national_ids: HashSet<NationalId>,
    last_id: u64,
}

impl Ledger {
    pub(crate) fn conflicts(
        &self,
        phone: &PhoneNumber,
        national_id: &NationalId,
    ) -> Vec<FormField> {
        let mut fields = Vec::new();
        if self.phones.contains(phone) {
            fields.push(FormField::Phone);
        }
        if self.national_ids.contains(national_id) {
            fields.push(FormField::NationalId);
        }
        fields
    }

    /// Builds the record that would be inserted next, without committing it.
    pub(crate) fn prepare(
        &self,
        application: NewApplication,
        now: DateTime<Utc>,
    ) -> Result<Application, StoreError> {
        let fields = self.conflicts(&application.phone, &application.national_id);
        if !fields.is_empty() {
            return Err(StoreError::Conflict { fields });
        }
        Ok(Application::from_new(
            ApplicationId(self.last_id + 1),
            application,
            now,
        ))
    }

    pub(crate) fn commit(&mut self, application: Application) {
        self.last_id = self.last_id.max(application.id.0);
        self.phones.insert(application.phone.clone());
        self.national_ids.insert(application.national_id.clone());
        self.applications.push(application);
    }

    pub(crate) fn has_phone(&self, phone: &PhoneNumber) -> bool {
        self.phones.contains(phone)
    }

    pub(crate) fn has_national_id(&self, national_id: &NationalId) -> bool {
        self.national_ids.contains(national_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.applications.len()
    }

    pub(crate) fn applications(&self) -> &[Application] {
        &self.applications
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("store lock poisoned".to_string())
}
