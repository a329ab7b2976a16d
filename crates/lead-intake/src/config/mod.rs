use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::NaiveDate;
use secrecy::SecretString;

use crate::workflows::intake::{MetaCredentials, TelegramCredentials, ValidationConfig};

const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_META_API_BASE: &str = "https://graph.facebook.com";
const DEFAULT_META_API_VERSION: &str = "v21.0";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub intake: IntakeConfig,
    pub telegram: TelegramConfig,
    pub meta: MetaConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let birth_date_cutoff = match optional_var("APP_BIRTH_DATE_CUTOFF") {
            Some(value) => NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                .map_err(|source| ConfigError::InvalidCutoff { value, source })?,
            None => ValidationConfig::default().birth_date_cutoff,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            intake: IntakeConfig {
                birth_date_cutoff,
                store_path: optional_var("APP_STORE_PATH").map(PathBuf::from),
            },
            telegram: TelegramConfig {
                bot_token: optional_var("TG_BOT_APIKEY").map(SecretString::from),
                chat_id: optional_var("TG_CHAT_ID"),
                api_base: optional_var("TG_API_BASE")
                    .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string()),
            },
            meta: MetaConfig {
                access_token: optional_var("META_ACCESS_TOKEN").map(SecretString::from),
                pixel_id: optional_var("META_PIXEL_ID"),
                api_version: optional_var("META_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_META_API_VERSION.to_string()),
                api_base: optional_var("META_API_BASE")
                    .unwrap_or_else(|| DEFAULT_META_API_BASE.to_string()),
                test_event_code: optional_var("META_TEST_EVENT_CODE"),
            },
        })
    }
}

/// Blank values count as unset so an empty `.env` entry does not half-configure a client.
fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Form rules and application storage.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub birth_date_cutoff: NaiveDate,
    /// CSV file backing the store; applications stay in memory when unset.
    pub store_path: Option<PathBuf>,
}

impl IntakeConfig {
    pub fn validation(&self) -> ValidationConfig {
        ValidationConfig::with_cutoff(self.birth_date_cutoff)
    }
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: Option<SecretString>,
    pub chat_id: Option<String>,
    pub api_base: String,
}

impl TelegramConfig {
    /// Both the token and the chat are needed to deliver anything.
    pub fn credentials(&self) -> Option<TelegramCredentials> {
        match (&self.bot_token, &self.chat_id) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramCredentials {
                bot_token: bot_token.clone(),
                chat_id: chat_id.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetaConfig {
    pub access_token: Option<SecretString>,
    pub pixel_id: Option<String>,
    pub api_version: String,
    pub api_base: String,
    pub test_event_code: Option<String>,
}

impl MetaConfig {
    pub fn credentials(&self) -> Option<MetaCredentials> {
        match (&self.access_token, &self.pixel_id) {
            (Some(access_token), Some(pixel_id)) => Some(MetaCredentials {
                access_token: access_token.clone(),
                pixel_id: pixel_id.clone(),
                test_event_code: self.test_event_code.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidCutoff {
        value: String,
        source: chrono::ParseError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCutoff { value, .. } => write!(
                f,
                "APP_BIRTH_DATE_CUTOFF must be a YYYY-MM-DD date, got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidCutoff { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_BIRTH_DATE_CUTOFF",
            "APP_STORE_PATH",
            "TG_BOT_APIKEY",
            "TG_CHAT_ID",
            "TG_API_BASE",
            "META_ACCESS_TOKEN",
            "META_PIXEL_ID",
            "META_API_VERSION",
            "META_API_BASE",
            "META_TEST_EVENT_CODE",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(
            config.intake.birth_date_cutoff,
            NaiveDate::from_ymd_opt(2000, 1, 1).expect("valid date")
        );
        assert!(config.intake.store_path.is_none());
        assert!(config.telegram.credentials().is_none());
        assert_eq!(config.telegram.api_base, DEFAULT_TELEGRAM_API_BASE);
        assert!(config.meta.credentials().is_none());
        assert_eq!(config.meta.api_version, "v21.0");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn reads_cutoff_and_store_path() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_BIRTH_DATE_CUTOFF", "2001-06-30");
        env::set_var("APP_STORE_PATH", "/var/lib/leads/applications.csv");
        let config = AppConfig::load().expect("config loads");
        let validation = config.intake.validation();
        assert_eq!(
            validation.birth_date_cutoff,
            NaiveDate::from_ymd_opt(2001, 6, 30).expect("valid date")
        );
        assert_eq!(
            config.intake.store_path,
            Some(PathBuf::from("/var/lib/leads/applications.csv"))
        );
        reset_env();
    }

    #[test]
    fn rejects_malformed_cutoff() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_BIRTH_DATE_CUTOFF", "01.01.2000");
        match AppConfig::load() {
            Err(ConfigError::InvalidCutoff { value, .. }) => assert_eq!(value, "01.01.2000"),
            other => panic!("expected invalid cutoff, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn partial_credentials_leave_clients_unconfigured() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TG_BOT_APIKEY", "123:abc");
        env::set_var("TG_CHAT_ID", "   ");
        env::set_var("META_PIXEL_ID", "998877");
        let config = AppConfig::load().expect("config loads");
        assert!(config.telegram.credentials().is_none());
        assert!(config.meta.credentials().is_none());
        reset_env();
    }

    #[test]
    fn full_credentials_build_clients_and_stay_redacted() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("TG_BOT_APIKEY", "123:abc");
        env::set_var("TG_CHAT_ID", "-100200300");
        env::set_var("META_ACCESS_TOKEN", "meta-secret");
        env::set_var("META_PIXEL_ID", "998877");
        env::set_var("META_TEST_EVENT_CODE", "TEST123");
        let config = AppConfig::load().expect("config loads");

        let telegram = config.telegram.credentials().expect("telegram configured");
        assert_eq!(telegram.bot_token.expose_secret(), "123:abc");
        assert_eq!(telegram.chat_id, "-100200300");

        let meta = config.meta.credentials().expect("meta configured");
        assert_eq!(meta.pixel_id, "998877");
        assert_eq!(meta.test_event_code.as_deref(), Some("TEST123"));

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("123:abc"));
        assert!(!rendered.contains("meta-secret"));
        reset_env();
    }
}
