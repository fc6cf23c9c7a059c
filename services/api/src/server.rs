use crate::cli::ServeArgs;
use crate::infra::{load_dump, AppState, InMemoryRecordStore, RecordDump};
use crate::routes::with_casting_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use casting_call::casting::CastingService;
use casting_call::config::AppConfig;
use casting_call::error::AppError;
use casting_call::telemetry::{self, LogSink};
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

    telemetry::init(&config.telemetry, LogSink::Stdout)?;

    let dump = match args.seed.take() {
        Some(path) => {
            let dump = load_dump(&path)?;
            info!(
                path = %path.display(),
                users = dump.users.len(),
                events = dump.events.len(),
                "record store seeded"
            );
            dump
        }
        None => RecordDump::default(),
    };

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryRecordStore::from_dump(dump));
    let casting_service = Arc::new(CastingService::new(store, config.export));

    let app = with_casting_routes(casting_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "casting call roster service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
