use crate::cli::ServeArgs;
use crate::infra::{in_memory_service, seed_titleholders, AppState};
use crate::routes::with_licensing_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use muni_licensing::config::AppConfig;
use muni_licensing::error::AppError;
use muni_licensing::licensing::TitleholderSeed;
use muni_licensing::telemetry;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(in_memory_service(config.licensing.policy()));
    if let Some(path) = config.licensing.seed_csv.as_deref() {
        let drafts = TitleholderSeed::from_path(path)?;
        info!(path = %path.display(), rows = drafts.len(), "loading titleholder seed");
        seed_titleholders(service.as_ref(), drafts, Local::now().date_naive());
    }

    let app = with_licensing_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        copy_fee = config.licensing.copy_fee,
        "licensing office ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
