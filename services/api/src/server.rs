use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryAuditRepository};
use crate::routes::{cors_layer, with_audit_routes};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use workpaper_audit::config::AppConfig;
use workpaper_audit::error::AppError;
use workpaper_audit::telemetry;
use workpaper_audit::workflows::audit::{AuditService, LocalDocumentStorage};

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

    std::fs::create_dir_all(&config.uploads.directory)?;
    let documents = Arc::new(LocalDocumentStorage::new(
        config.uploads.directory.clone(),
        config.uploads.policy.clone(),
    ));
    let repository = Arc::new(InMemoryAuditRepository::default());
    let audit_service = Arc::new(AuditService::new(
        repository.clone(),
        repository.clone(),
        repository,
        documents,
        config.identity.clone(),
    ));

    let app = with_audit_routes(audit_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer)
        .layer(cors_layer(&config.cors));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        identity = %config.identity,
        upload_dir = %config.uploads.directory.display(),
        cors_origins = ?config.cors.allowed_origins,
        "work paper audit service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
