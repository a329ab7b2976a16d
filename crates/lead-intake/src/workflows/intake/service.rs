use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::domain::{Application, FormField, FormValues, NationalId, NewApplication, PhoneNumber};
use super::notify::{
    ConversionTracker, LeadEvent, LeadNotification, NotificationSink, SubmissionContext,
};
use super::store::{ApplicationStore, StoreError};
use super::validation::{messages, FieldErrors, FormValidator, ValidationConfig};

/// Service composing the form rules, the record store and the outbound notifications.
pub struct LeadIntakeService<S, N, C> {
    validator: Arc<FormValidator>,
    store: Arc<S>,
    notifier: Arc<N>,
    tracker: Arc<C>,
}

/// Whether the chat notification for an accepted application went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed,
}

impl DeliveryStatus {
    /// One-line message shown to the visitor.
    pub const fn message(self) -> &'static str {
        match self {
            DeliveryStatus::Delivered => messages::SUBMISSION_ACCEPTED,
            DeliveryStatus::Failed => messages::SUBMISSION_FAILED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Nothing was stored; errors are keyed by the offending field.
    Rejected(FieldErrors),
    /// The application was stored. The form should be cleared.
    Accepted {
        application: Application,
        delivery: DeliveryStatus,
    },
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted { .. })
    }

    pub fn errors(&self) -> Option<&FieldErrors> {
        match self {
            SubmissionOutcome::Rejected(errors) => Some(errors),
            SubmissionOutcome::Accepted { .. } => None,
        }
    }

    /// Flash message for accepted submissions.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            SubmissionOutcome::Accepted { delivery, .. } => Some(delivery.message()),
            SubmissionOutcome::Rejected(_) => None,
        }
    }
}

impl<S, N, C> LeadIntakeService<S, N, C>
where
    S: ApplicationStore + 'static,
    N: NotificationSink + 'static,
    C: ConversionTracker + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>, tracker: Arc<C>, config: ValidationConfig) -> Self {
        Self {
            validator: Arc::new(FormValidator::new(config)),
            store,
            notifier,
            tracker,
        }
    }

    pub fn validator(&self) -> &FormValidator {
        &self.validator
    }

    /// Re-run the rule for one field against the current form state.
    pub fn validate_field(&self, field: FormField, values: &FormValues) -> Vec<String> {
        self.validator.validate_field(field, values)
    }

    /// Validate, de-duplicate, store and announce a submitted form.
    ///
    /// Validation and duplicate failures come back as [`SubmissionOutcome::Rejected`]; only store
    /// outages surface as errors. Notification failures never undo the stored application.
    pub async fn submit(
        &self,
        values: &FormValues,
        context: &SubmissionContext,
    ) -> Result<SubmissionOutcome, ApplicationServiceError> {
        let form = match self.validator.validate(values) {
            Ok(form) => form,
            Err(errors) => {
                let fields: Vec<FormField> = errors.fields().collect();
                debug!(fields = ?fields, "submission failed validation");
                return Ok(SubmissionOutcome::Rejected(errors));
            }
        };

        let Some(national_id) = NationalId::parse(&form.national_id_digits) else {
            debug!("submission failed national id checksum");
            return Ok(SubmissionOutcome::Rejected(FieldErrors::single(
                FormField::NationalId,
                messages::NATIONAL_ID_INVALID,
            )));
        };

        let duplicates = self.duplicate_fields(&form.phone, &national_id)?;
        if !duplicates.is_empty() {
            info!(fields = ?duplicates, "duplicate application rejected");
            return Ok(SubmissionOutcome::Rejected(duplicate_errors(&duplicates)));
        }

        let new_application = NewApplication {
            full_name: form.full_name,
            phone: form.phone,
            birth_date: form.birth_date,
            is_existing_customer: form.is_existing_customer,
            national_id,
        };

        let application = match self.store.create(new_application) {
            Ok(application) => application,
            Err(StoreError::Conflict { fields }) => {
                info!(fields = ?fields, "duplicate application rejected by store");
                return Ok(SubmissionOutcome::Rejected(duplicate_errors(&fields)));
            }
            Err(err) => {
                error!(error = %err, "failed to store application");
                return Err(err.into());
            }
        };

        info!(application_id = %application.id, "application stored");

        let delivery = match self
            .notifier
            .deliver(&LeadNotification::from(&application))
            .await
        {
            Ok(()) => DeliveryStatus::Delivered,
            Err(err) => {
                warn!(application_id = %application.id, error = %err, "lead notification failed");
                DeliveryStatus::Failed
            }
        };

        let event = LeadEvent::new(&application, context, Utc::now());
        if let Err(err) = self.tracker.track(&event).await {
            warn!(application_id = %application.id, error = %err, "conversion event failed");
        }

        Ok(SubmissionOutcome::Accepted {
            application,
            delivery,
        })
    }

    /// Both lookups always run so the visitor sees every colliding field at once.
    fn duplicate_fields(
        &self,
        phone: &PhoneNumber,
        national_id: &NationalId,
    ) -> Result<Vec<FormField>, ApplicationServiceError> {
        let phone_taken = self.store.exists_by_phone(phone)?;
        let national_id_taken = self.store.exists_by_national_id(national_id)?;

        let mut fields = Vec::new();
        if phone_taken {
            fields.push(FormField::Phone);
        }
        if national_id_taken {
            fields.push(FormField::NationalId);
        }
        Ok(fields)
    }
}

fn duplicate_errors(fields: &[FormField]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for field in fields {
        match field {
            FormField::Phone => errors.add(*field, messages::PHONE_DUPLICATE),
            FormField::NationalId => errors.add(*field, messages::NATIONAL_ID_DUPLICATE),
            _ => {}
        }
    }
    errors
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
