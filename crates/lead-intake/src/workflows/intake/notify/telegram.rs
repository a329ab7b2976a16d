//! Telegram Bot API sink.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{LeadNotification, NotificationError, NotificationSink};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Bot token and destination chat.
#[derive(Clone)]
pub struct TelegramCredentials {
    pub bot_token: SecretString,
    pub chat_id: String,
}

/// Posts lead summaries to a Telegram chat through `sendMessage`. Without credentials every
/// delivery fails with [`NotificationError::NotConfigured`].
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    credentials: Option<TelegramCredentials>,
    api_base: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("bot_token", &"[REDACTED]")
            .field(
                "chat_id",
                &self.credentials.as_ref().map(|c| c.chat_id.as_str()),
            )
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(credentials: Option<TelegramCredentials>) -> Self {
        Self {
            client: Client::new(),
            credentials,
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Send a Markdown message to the configured chat.
    #[instrument(skip_all)]
    pub async fn send_message(&self, text: &str) -> Result<(), NotificationError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(NotificationError::NotConfigured)?;

        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            credentials.bot_token.expose_secret()
        );

        // reqwest errors embed the URL, which carries the bot token.
        let response = self
            .client
            .post(url)
            .json(&SendMessage {
                chat_id: &credentials.chat_id,
                text,
                parse_mode: "Markdown",
            })
            .send()
            .await
            .map_err(|e| NotificationError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let description = serde_json::from_str::<SendMessageResponse>(&body)
                .ok()
                .and_then(|reply| reply.description)
                .unwrap_or_else(|| format!("status {status}"));
            return Err(NotificationError::Rejected(description));
        }

        let result: SendMessageResponse = response
            .json()
            .await
            .map_err(|e| NotificationError::Request(e.without_url().to_string()))?;

        if !result.ok {
            return Err(NotificationError::Rejected(
                result
                    .description
                    .unwrap_or_else(|| "ok=false without description".to_string()),
            ));
        }

        debug!(chat_id = %credentials.chat_id, "Message posted to Telegram");
        Ok(())
    }
}

impl NotificationSink for TelegramNotifier {
    async fn deliver(&self, notification: &LeadNotification) -> Result<(), NotificationError> {
        self.send_message(&notification.render()).await
    }
}
