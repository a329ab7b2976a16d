//! Loan application lead intake.
//!
//! A visitor fills in five fields; [`LeadIntakeService::submit`] validates them, rejects
//! duplicates by phone or national identity number, stores the application and then notifies the
//! sales chat and the ad platform on a best-effort basis.

pub mod domain;
pub mod national_id;
pub mod notify;
pub mod router;
pub mod service;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    normalize_digits, Application, ApplicationId, CustomerFlag, FormField, FormValues, NationalId,
    NewApplication, PhoneNumber, UnknownField,
};
pub use notify::{
    ConversionError, ConversionTracker, LeadEvent, LeadNotification, MetaConversionClient,
    MetaCredentials, NotificationError, NotificationSink, SubmissionContext, TelegramCredentials,
    TelegramNotifier,
};
pub use router::application_router;
pub use service::{ApplicationServiceError, DeliveryStatus, LeadIntakeService, SubmissionOutcome};
pub use store::{
    ApplicationStore, CsvApplicationStore, InMemoryApplicationStore, StoreError,
};
pub use validation::{FieldErrors, FormValidator, ValidatedForm, ValidationConfig};
