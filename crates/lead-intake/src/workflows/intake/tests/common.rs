use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::intake::domain::{
    Application, CustomerFlag, FormField, FormValues, NationalId, NewApplication, PhoneNumber,
};
use crate::workflows::intake::notify::{
    ConversionError, ConversionTracker, LeadEvent, LeadNotification, NotificationError,
    NotificationSink,
};
use crate::workflows::intake::store::{ApplicationStore, InMemoryApplicationStore, StoreError};
use crate::workflows::intake::{application_router, LeadIntakeService, ValidationConfig};

pub(super) type TestService =
    LeadIntakeService<InMemoryApplicationStore, RecordingNotifier, RecordingTracker>;

pub(super) fn valid_form() -> FormValues {
    FormValues {
        full_name: Some("Ayşe Yılmaz".to_string()),
        phone: Some("5321234567".to_string()),
        birth_date: Some("1985-04-12".to_string()),
        is_existing_customer: Some(CustomerFlag::Bool(true)),
        national_id: Some("10000000146".to_string()),
    }
}

pub(super) fn other_form() -> FormValues {
    FormValues {
        full_name: Some("Mehmet Demir".to_string()),
        phone: Some("5339876543".to_string()),
        birth_date: Some("1979-09-30".to_string()),
        is_existing_customer: Some(CustomerFlag::Number(0)),
        national_id: Some("12345678950".to_string()),
    }
}

pub(super) fn new_application(phone: &str, national_id: &str) -> NewApplication {
    NewApplication {
        full_name: "Kayıtlı Başvuru".to_string(),
        phone: PhoneNumber::parse(phone).expect("valid phone"),
        birth_date: chrono::NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid date"),
        is_existing_customer: false,
        national_id: NationalId::parse(national_id).expect("valid national id"),
    }
}

pub(super) fn build_service() -> (
    TestService,
    Arc<InMemoryApplicationStore>,
    Arc<RecordingNotifier>,
    Arc<RecordingTracker>,
) {
    build_service_with(RecordingNotifier::default(), RecordingTracker::default())
}

pub(super) fn build_service_with(
    notifier: RecordingNotifier,
    tracker: RecordingTracker,
) -> (
    TestService,
    Arc<InMemoryApplicationStore>,
    Arc<RecordingNotifier>,
    Arc<RecordingTracker>,
) {
    let store = Arc::new(InMemoryApplicationStore::new());
    let notifier = Arc::new(notifier);
    let tracker = Arc::new(tracker);
    let service = LeadIntakeService::new(
        store.clone(),
        notifier.clone(),
        tracker.clone(),
        ValidationConfig::default(),
    );
    (service, store, notifier, tracker)
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    delivered: Mutex<Vec<LeadNotification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub(super) fn failing() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(super) fn attempts(&self) -> Vec<LeadNotification> {
        self.delivered.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationSink for RecordingNotifier {
    async fn deliver(&self, notification: &LeadNotification) -> Result<(), NotificationError> {
        self.delivered
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification.clone());
        if self.fail {
            Err(NotificationError::Request("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
pub(super) struct RecordingTracker {
    events: Mutex<Vec<LeadEvent>>,
    fail: bool,
}

impl RecordingTracker {
    pub(super) fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(super) fn events(&self) -> Vec<LeadEvent> {
        self.events.lock().expect("tracker mutex poisoned").clone()
    }
}

impl ConversionTracker for RecordingTracker {
    async fn track(&self, event: &LeadEvent) -> Result<(), ConversionError> {
        self.events
            .lock()
            .expect("tracker mutex poisoned")
            .push(event.clone());
        if self.fail {
            Err(ConversionError::Rejected {
                status: 500,
                body: "upstream error".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// Passes the existence pre-check but loses the insert to a concurrent submission.
pub(super) struct RacingStore {
    pub(super) conflicting: Vec<FormField>,
}

impl ApplicationStore for RacingStore {
    fn create(&self, _application: NewApplication) -> Result<Application, StoreError> {
        Err(StoreError::Conflict {
            fields: self.conflicting.clone(),
        })
    }

    fn exists_by_phone(&self, _phone: &PhoneNumber) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn exists_by_national_id(&self, _national_id: &NationalId) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}

pub(super) struct UnavailableStore;

impl ApplicationStore for UnavailableStore {
    fn create(&self, _application: NewApplication) -> Result<Application, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn exists_by_phone(&self, _phone: &PhoneNumber) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn exists_by_national_id(&self, _national_id: &NationalId) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn count(&self) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn application_router_with_service(service: TestService) -> axum::Router {
    application_router(Arc::new(service))
}
