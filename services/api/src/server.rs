use crate::cli::ServeArgs;
use crate::infra::{open_store, seed_if_empty, AppState};
use crate::routes::with_platform_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use talentflow::config::AppConfig;
use talentflow::error::AppError;
use talentflow::mock_api::MockApi;
use talentflow::telemetry;
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

    let store = open_store(&config.storage, &args.store)?;
    if let Some(summary) = seed_if_empty(&store, &config.storage)? {
        info!(
            jobs = summary.jobs,
            candidates = summary.candidates,
            "seeded empty store"
        );
    }

    let api = Arc::new(MockApi::new(store, config.chaos.clone()));
    let app = with_platform_routes(api)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        latency_min_ms = config.chaos.latency_min_ms,
        latency_max_ms = config.chaos.latency_max_ms,
        "talentflow api ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
