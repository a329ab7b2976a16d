use lead_intake::config::{AppConfig, IntakeConfig, MetaConfig, TelegramConfig};
use lead_intake::workflows::intake::{
    Application, ApplicationStore, CsvApplicationStore, InMemoryApplicationStore,
    LeadIntakeService, MetaConversionClient, NationalId, NewApplication, PhoneNumber, StoreError,
    TelegramNotifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type IntakeService =
    LeadIntakeService<ConfiguredStore, TelegramNotifier, MetaConversionClient>;

/// Store selected at startup from `APP_STORE_PATH`.
#[derive(Debug)]
pub(crate) enum ConfiguredStore {
    Memory(InMemoryApplicationStore),
    Csv(CsvApplicationStore),
}

impl ConfiguredStore {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ConfiguredStore::Memory(_) => "memory",
            ConfiguredStore::Csv(_) => "csv",
        }
    }
}

impl ApplicationStore for ConfiguredStore {
    fn create(&self, application: NewApplication) -> Result<Application, StoreError> {
        match self {
            ConfiguredStore::Memory(store) => store.create(application),
            ConfiguredStore::Csv(store) => store.create(application),
        }
    }

    fn exists_by_phone(&self, phone: &PhoneNumber) -> Result<bool, StoreError> {
        match self {
            ConfiguredStore::Memory(store) => store.exists_by_phone(phone),
            ConfiguredStore::Csv(store) => store.exists_by_phone(phone),
        }
    }

    fn exists_by_national_id(&self, national_id: &NationalId) -> Result<bool, StoreError> {
        match self {
            ConfiguredStore::Memory(store) => store.exists_by_national_id(national_id),
            ConfiguredStore::Csv(store) => store.exists_by_national_id(national_id),
        }
    }

    fn count(&self) -> Result<usize, StoreError> {
        match self {
            ConfiguredStore::Memory(store) => store.count(),
            ConfiguredStore::Csv(store) => store.count(),
        }
    }
}

pub(crate) fn build_store(config: &IntakeConfig) -> Result<ConfiguredStore, StoreError> {
    match &config.store_path {
        Some(path) => Ok(ConfiguredStore::Csv(CsvApplicationStore::open(path)?)),
        None => {
            warn!("APP_STORE_PATH unset, applications are kept in memory only");
            Ok(ConfiguredStore::Memory(InMemoryApplicationStore::new()))
        }
    }
}

pub(crate) fn build_notifier(config: &TelegramConfig) -> TelegramNotifier {
    let credentials = config.credentials();
    if credentials.is_none() {
        warn!("Telegram credentials missing, lead notifications will fail");
    }
    TelegramNotifier::new(credentials).with_api_base(config.api_base.as_str())
}

pub(crate) fn build_tracker(config: &MetaConfig) -> MetaConversionClient {
    let credentials = config.credentials();
    if credentials.is_none() {
        info!("Meta conversion tracking disabled");
    }
    MetaConversionClient::new(credentials)
        .with_api_base(config.api_base.as_str())
        .with_api_version(config.api_version.as_str())
}

pub(crate) fn build_service(config: &AppConfig) -> Result<Arc<IntakeService>, StoreError> {
    let store = build_store(&config.intake)?;
    info!(store = store.kind(), "application store ready");

    Ok(Arc::new(LeadIntakeService::new(
        Arc::new(store),
        Arc::new(build_notifier(&config.telegram)),
        Arc::new(build_tracker(&config.meta)),
        config.intake.validation(),
    )))
}
