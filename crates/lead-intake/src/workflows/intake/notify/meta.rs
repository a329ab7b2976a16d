//! Meta Conversions API client reporting a `Lead` event per stored application.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use super::{ConversionError, ConversionTracker, LeadEvent};

const GRAPH_API_BASE: &str = "https://graph.facebook.com";
const GRAPH_API_VERSION: &str = "v21.0";
const PHONE_COUNTRY_CODE: &str = "90";
const COUNTRY: &str = "tr";

/// Access token and pixel the events are attributed to.
#[derive(Clone)]
pub struct MetaCredentials {
    pub access_token: SecretString,
    pub pixel_id: String,
    pub test_event_code: Option<String>,
}

/// Server-side conversion reporting. Without credentials the client is disabled and every event
/// is dropped silently.
#[derive(Clone)]
pub struct MetaConversionClient {
    client: Client,
    credentials: Option<MetaCredentials>,
    api_base: String,
    api_version: String,
}

impl std::fmt::Debug for MetaConversionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaConversionClient")
            .field("access_token", &"[REDACTED]")
            .field(
                "pixel_id",
                &self.credentials.as_ref().map(|c| c.pixel_id.as_str()),
            )
            .field("api_base", &self.api_base)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct EventRequest<'a> {
    data: [ServerEvent<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    test_event_code: Option<&'a str>,
}

#[derive(Serialize)]
struct ServerEvent<'a> {
    event_name: &'static str,
    event_time: i64,
    event_id: String,
    action_source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_source_url: Option<&'a str>,
    user_data: UserData<'a>,
}

#[derive(Serialize)]
struct UserData<'a> {
    ph: [String; 1],
    db: [String; 1],
    country: [String; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    client_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_user_agent: Option<&'a str>,
}

/// Lowercase hex SHA-256, the normalization Meta requires for matching keys.
fn hash_identifier(value: &str) -> String {
    hex::encode(Sha256::digest(value.trim().to_lowercase().as_bytes()))
}

impl MetaConversionClient {
    pub fn new(credentials: Option<MetaCredentials>) -> Self {
        Self {
            client: Client::new(),
            credentials,
            api_base: GRAPH_API_BASE.to_string(),
            api_version: GRAPH_API_VERSION.to_string(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    fn request_body<'a>(
        event: &'a LeadEvent,
        test_event_code: Option<&'a str>,
    ) -> EventRequest<'a> {
        let phone = format!("{PHONE_COUNTRY_CODE}{}", event.phone);
        EventRequest {
            data: [ServerEvent {
                event_name: "Lead",
                event_time: event.event_time.timestamp(),
                event_id: format!("lead-{}", event.application_id),
                action_source: "website",
                event_source_url: event.source_url.as_deref(),
                user_data: UserData {
                    ph: [hash_identifier(&phone)],
                    db: [hash_identifier(&event.formatted_birth_date())],
                    country: [hash_identifier(COUNTRY)],
                    client_ip_address: event.client_ip.map(|ip| ip.to_string()),
                    client_user_agent: event.user_agent.as_deref(),
                },
            }],
            test_event_code,
        }
    }

    /// Report a single `Lead` event.
    #[instrument(skip_all, fields(application_id = %event.application_id))]
    pub async fn send_event(&self, event: &LeadEvent) -> Result<(), ConversionError> {
        let Some(credentials) = self.credentials.as_ref() else {
            debug!("conversion tracking disabled, dropping lead event");
            return Ok(());
        };

        let url = format!(
            "{}/{}/{}/events",
            self.api_base, self.api_version, credentials.pixel_id
        );
        let body = Self::request_body(event, credentials.test_event_code.as_deref());

        let response = self
            .client
            .post(url)
            .query(&[("access_token", credentials.access_token.expose_secret())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ConversionError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConversionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(pixel_id = %credentials.pixel_id, "Lead event sent to Meta");
        Ok(())
    }
}

impl ConversionTracker for MetaConversionClient {
    async fn track(&self, event: &LeadEvent) -> Result<(), ConversionError> {
        self.send_event(event).await
    }
}
