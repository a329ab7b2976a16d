//! Outbound side effects fired after an application is stored.
//!
//! Both channels are best effort: the service never rolls back a stored application because a
//! notification failed, it only changes what the visitor is told.

mod meta;
mod telegram;

pub use meta::{MetaConversionClient, MetaCredentials};
pub use telegram::{TelegramCredentials, TelegramNotifier};

use std::future::Future;
use std::net::IpAddr;

use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{Application, ApplicationId, FormField, NationalId, PhoneNumber};

/// Summary of a new application posted to the chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadNotification {
    pub application_id: ApplicationId,
    pub full_name: String,
    pub phone: PhoneNumber,
    pub birth_date: NaiveDate,
    pub is_existing_customer: bool,
    pub national_id: NationalId,
}

impl LeadNotification {
    /// Telegram flavoured Markdown with emoji section headers.
    pub fn render(&self) -> String {
        let customer = if self.is_existing_customer {
            "Evet"
        } else {
            "Hayır"
        };

        format!(
            "📋 *Yeni Başvuru Formu* 📋\n\n\
             👤 *{}:* {}\n\
             📞 *{}:* {}\n\
             📅 *{}:* {}\n\
             🏦 *{}:* {}\n\
             🆔 *{}:* {}\n",
            FormField::FullName.label(),
            escape_markdown(&self.full_name),
            FormField::Phone.label(),
            self.phone,
            FormField::BirthDate.label(),
            self.birth_date.format("%Y-%m-%d"),
            FormField::IsExistingCustomer.label(),
            customer,
            FormField::NationalId.label(),
            self.national_id,
        )
    }
}

impl From<&Application> for LeadNotification {
    fn from(application: &Application) -> Self {
        Self {
            application_id: application.id,
            full_name: application.full_name.clone(),
            phone: application.phone.clone(),
            birth_date: application.birth_date,
            is_existing_customer: application.is_existing_customer,
            national_id: application.national_id.clone(),
        }
    }
}

/// Legacy Markdown only reserves these four characters.
fn escape_markdown(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Chat channel that receives a message per stored application.
pub trait NotificationSink: Send + Sync {
    fn deliver(
        &self,
        notification: &LeadNotification,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification channel is not configured")]
    NotConfigured,
    #[error("notification request failed: {0}")]
    Request(String),
    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Visitor metadata captured from the HTTP request for ad attribution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionContext {
    pub client_ip: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub source_url: Option<String>,
}

/// "Lead" conversion reported to the ad platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadEvent {
    pub application_id: ApplicationId,
    pub phone: PhoneNumber,
    pub birth_date: NaiveDate,
    pub client_ip: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub source_url: Option<String>,
    pub event_time: DateTime<Utc>,
}

impl LeadEvent {
    pub fn new(
        application: &Application,
        context: &SubmissionContext,
        event_time: DateTime<Utc>,
    ) -> Self {
        Self {
            application_id: application.id,
            phone: application.phone.clone(),
            birth_date: application.birth_date,
            client_ip: context.client_ip,
            user_agent: context.user_agent.clone(),
            source_url: context.source_url.clone(),
            event_time,
        }
    }

    /// Birth date in the `YYYYMMDD` layout the ad platform expects.
    pub fn formatted_birth_date(&self) -> String {
        self.birth_date.format("%Y%m%d").to_string()
    }
}

/// Ad-platform conversion endpoint. Failures are logged by the caller and never shown.
pub trait ConversionTracker: Send + Sync {
    fn track(&self, event: &LeadEvent) -> impl Future<Output = Result<(), ConversionError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("conversion request failed: {0}")]
    Request(String),
    #[error("conversion rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
