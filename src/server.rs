use crate::cli::ServeArgs;
use crate::infra::{build_service, AppState};
use crate::routes::with_protocol_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use ed_saturation::config::AppConfig;
use ed_saturation::error::AppError;
use ed_saturation::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(config.environment, &config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (service, _repository) = build_service(&config.protocol)?;

    let app = with_protocol_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        clinical_offset = %config.protocol.clinical_offset,
        edit_window = config.protocol.edit_window,
        "saturation protocol service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
