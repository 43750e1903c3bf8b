use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use transit_licensing::config::LicensingConfig;
use transit_licensing::workflows::licensing::applications::{
    InMemoryApplicationRepository, IssuanceConfig, LicenseApplicationService,
    RandomLicenseNumbers,
};

pub(crate) type LicensingService =
    LicenseApplicationService<InMemoryApplicationRepository, RandomLicenseNumbers>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Service wired to the process-local store and random license numbers.
pub(crate) fn licensing_service(
    config: &LicensingConfig,
) -> (Arc<LicensingService>, Arc<InMemoryApplicationRepository>) {
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let service = LicenseApplicationService::new(
        repository.clone(),
        Arc::new(RandomLicenseNumbers),
        IssuanceConfig::from(config),
    );
    (Arc::new(service), repository)
}
