use crate::cli::ServeArgs;
use crate::infra::{listing_source, AppState, DiscoveryState};
use crate::routes::with_discovery_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use roomscout::config::AppConfig;
use roomscout::error::AppError;
use roomscout::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let source = listing_source(&config.discovery);
    let discovery = DiscoveryState::new(&config.discovery, source);
    match discovery.refresh().await {
        Ok(outcome) => info!(?outcome, "initial listings loaded"),
        Err(err) => warn!(error = %err, "initial listing fetch failed; starting with no listings"),
    }

    let app = with_discovery_routes(discovery)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "roomscout discovery service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
