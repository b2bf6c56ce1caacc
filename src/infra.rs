use chrono::{DateTime, FixedOffset, Local};
use ed_saturation::config::ProtocolSettings;
use ed_saturation::error::AppError;
use ed_saturation::protocol::{EditWindowPolicy, InMemoryEvaluationRepository, ProtocolService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type ApiService = ProtocolService<InMemoryEvaluationRepository, EditWindowPolicy>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Service wired to process-local storage and the configured edit window.
pub(crate) fn build_service(
    settings: &ProtocolSettings,
) -> Result<(Arc<ApiService>, Arc<InMemoryEvaluationRepository>), AppError> {
    let engine = settings.engine()?;
    let repository = Arc::new(InMemoryEvaluationRepository::default());
    let policy = Arc::new(EditWindowPolicy::new(settings.edit_window));
    let service = Arc::new(ProtocolService::new(repository.clone(), policy, engine));
    Ok((service, repository))
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(value.trim())
        .map_err(|err| format!("invalid RFC 3339 timestamp '{value}': {err}"))
}

pub(crate) fn now_in(offset: FixedOffset) -> DateTime<FixedOffset> {
    Local::now().with_timezone(&offset)
}
